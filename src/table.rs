use crate::dom::{HtmlDomElement, HtmlDomParser};

/// Largest `colspan` honoured, as in the HTML table model.
pub const MAX_COLSPAN: usize = 1000;
/// Largest `rowspan` honoured, as in the HTML table model.
pub const MAX_ROWSPAN: usize = 65534;
/// Upper bound on the slots of one section's grid.
pub const MAX_GRID_SLOTS: usize = 1 << 20;

/// One logical row; `None` marks a column no cell reaches.
pub type GridRow<E> = Vec<Option<E>>;

/// Logical grid of a table section after `colspan`/`rowspan` expansion.
///
/// A spanning cell appears once per covered slot, always as a handle to the
/// same element.
#[derive(Debug, Clone)]
pub struct TableGrid<E> {
    rows: Vec<GridRow<E>>,
}

impl<E: HtmlDomElement> TableGrid<E> {
    /// Builds the grid of a `thead`, `tbody` or `tfoot` from its direct `tr`
    /// children and their direct `td`/`th` children.
    pub fn build<P>(parser: &P, section: &E) -> Self
    where
        P: HtmlDomParser<Element = E>,
    {
        let rows = parser
            .find_children(section, "tr")
            .iter()
            .map(|row| parser.find_children(row, "td,th"))
            .collect();
        Self::from_source_rows(rows)
    }

    pub fn from_source_rows(rows: Vec<Vec<E>>) -> Self {
        let mut remaining = MAX_GRID_SLOTS;
        let expanded = rows
            .into_iter()
            .map(|row| {
                let row = expand_colspan(row, remaining);
                remaining = remaining.saturating_sub(row.len());
                row
            })
            .collect();
        Self {
            rows: expand_rowspan(expanded),
        }
    }

    pub fn rows(&self) -> &[GridRow<E>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&E> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// Appends the rows of another section below this one.
    pub fn append(&mut self, other: TableGrid<E>) {
        self.rows.extend(other.rows);
    }

    /// A header grid is usable for column lookups only when it has at least
    /// one row and every row has the same non-zero width.
    pub fn is_valid_header(&self) -> bool {
        let Some(first) = self.rows.first() else {
            return false;
        };
        let width = first.len();
        width > 0 && self.rows.iter().all(|row| row.len() == width)
    }

    /// Width shared by all rows, if the grid is a valid header.
    pub fn header_width(&self) -> Option<usize> {
        if self.is_valid_header() {
            self.rows.first().map(|row| row.len())
        } else {
            None
        }
    }

    /// Ids of the `scope="col"` cells stacked above `column`, top row first.
    pub fn column_header_ids(&self, column: usize) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for row in &self.rows {
            let Some(Some(cell)) = row.get(column) else {
                continue;
            };
            if cell.get_attribute("scope").as_deref() != Some("col") {
                continue;
            }
            if let Some(id) = cell.get_attribute("id").filter(|id| !id.is_empty()) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Parses a `colspan`/`rowspan` value; anything non-numeric or below 2 is 1,
/// anything above `limit` is `limit`.
pub fn span_value<E: HtmlDomElement>(cell: &E, attribute: &str, limit: usize) -> usize {
    cell.get_attribute(attribute)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value > 1)
        .map(|value| usize::try_from(value).unwrap_or(usize::MAX).min(limit))
        .unwrap_or(1)
        .max(1)
}

/// Repeats every cell of a source row once per spanned column. Once the row
/// holds `budget` entries the remaining cells are kept but no longer repeated.
pub fn expand_colspan<E: HtmlDomElement>(row: Vec<E>, budget: usize) -> Vec<E> {
    let mut expanded = Vec::with_capacity(row.len());
    for cell in row {
        let span = span_value(&cell, "colspan", MAX_COLSPAN);
        let repeats = span.min(budget.saturating_sub(expanded.len())).max(1);
        for _ in 1..repeats {
            expanded.push(cell.clone());
        }
        expanded.push(cell);
    }
    expanded
}

/// Places colspan-expanded rows into the grid, carrying `rowspan` cells down
/// into the rows below. Cells never overwrite an occupied slot; they move
/// right to the next free column instead.
///
/// The grid never grows past [`MAX_GRID_SLOTS`]: a cell that no longer fits
/// is left out, and a rowspan stops at the first row it cannot reach.
pub fn expand_rowspan<E: HtmlDomElement>(rows: Vec<Vec<E>>) -> Vec<GridRow<E>> {
    let mut grid = GridBuilder::default();
    for (i, cells) in rows.into_iter().enumerate() {
        if grid.rows.len() <= i {
            grid.rows.resize_with(i + 1, Vec::new);
        }
        let mut column = 0usize;
        for cell in cells {
            while matches!(grid.rows[i].get(column), Some(Some(_))) {
                column += 1;
            }
            let rowspan = span_value(&cell, "rowspan", MAX_ROWSPAN);
            if grid.place(i, column, cell.clone()) {
                for k in 1..rowspan {
                    if !grid.place(i + k, column, cell.clone()) {
                        break;
                    }
                }
            }
            column += 1;
        }
    }
    grid.rows
}

struct GridBuilder<E> {
    rows: Vec<GridRow<E>>,
    slots: usize,
}

impl<E> Default for GridBuilder<E> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            slots: 0,
        }
    }
}

impl<E> GridBuilder<E> {
    fn place(&mut self, row: usize, column: usize, cell: E) -> bool {
        let len = self.rows.get(row).map(|r| r.len()).unwrap_or(0);
        let grow = (column + 1).saturating_sub(len);
        if self.slots + grow > MAX_GRID_SLOTS {
            return false;
        }
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        self.slots += grow;
        let target = &mut self.rows[row];
        if target.len() <= column {
            target.resize_with(column + 1, || None);
        }
        if target[column].is_none() {
            target[column] = Some(cell);
        }
        true
    }
}
