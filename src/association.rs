use crate::debug::DebugLogger;
use crate::dom::{HtmlDomElement, HtmlDomParser};
use crate::id_generator::IdGenerator;
use crate::metrics::FixMetrics;
use crate::table::TableGrid;
use crate::token_list::{contains_token, increase_in_list};
use serde_json::json;

pub const DEFAULT_IGNORE_ATTRIBUTE: &str = "data-ignoreaccessibilityfix";

/// Binds table data cells to their header cells and form controls to their
/// labels, writing the result into `headers`, `scope`, `for`, `aria-label`
/// and `aria-labelledby`.
///
/// Elements are processed strictly one after another: the id generator and the
/// read-modify-write on token lists assume exclusive access to the document.
pub struct AccessibleAssociation<'a, P: HtmlDomParser> {
    parser: &'a P,
    id_generator: &'a mut IdGenerator,
    ignore_attribute: &'a str,
    debug: Option<&'a DebugLogger>,
    metrics: FixMetrics,
}

impl<'a, P: HtmlDomParser> AccessibleAssociation<'a, P> {
    pub fn new(parser: &'a P, id_generator: &'a mut IdGenerator) -> Self {
        Self {
            parser,
            id_generator,
            ignore_attribute: DEFAULT_IGNORE_ATTRIBUTE,
            debug: None,
            metrics: FixMetrics::default(),
        }
    }

    pub fn with_ignore_attribute(mut self, attribute: &'a str) -> Self {
        self.ignore_attribute = attribute;
        self
    }

    pub(crate) fn with_debug(mut self, debug: Option<&'a DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    pub fn metrics(&self) -> &FixMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> FixMetrics {
        self.metrics
    }

    /// A real element that neither carries the ignore attribute nor sits
    /// inside an element that does.
    pub fn is_valid_element(&self, element: &P::Element) -> bool {
        if !element.is_real_element() || element.has_attribute(self.ignore_attribute) {
            return false;
        }
        let mut current = element.parent();
        while let Some(node) = current {
            if node.has_attribute(self.ignore_attribute) {
                return false;
            }
            current = node.parent();
        }
        true
    }

    pub fn associate_all_data_cells_with_header_cells(&mut self) {
        for table in self.parser.find("table") {
            if self.is_valid_element(&table) {
                self.associate_data_cells_with_header_cells(&table);
            }
        }
    }

    pub fn associate_data_cells_with_header_cells(&mut self, table: &P::Element) {
        let header = self.parser.find_children(table, "thead").into_iter().next();
        let body = self.parser.find_children(table, "tbody").into_iter().next();
        let footer = self.parser.find_children(table, "tfoot").into_iter().next();
        self.metrics.tables += 1;

        let mut header_width: Option<usize> = None;
        let mut aligned_rows = 0usize;
        let mut skipped_rows = 0usize;
        if let Some(header) = header.as_ref() {
            self.fix_header(header);
            let header_grid = TableGrid::build(self.parser, header);
            header_width = header_grid.header_width();
            if let (Some(width), Some(body)) = (header_width, body.as_ref()) {
                self.metrics.tables_with_valid_header += 1;
                let mut combined = TableGrid::build(self.parser, body);
                if let Some(footer) = footer.as_ref() {
                    combined.append(TableGrid::build(self.parser, footer));
                }
                for row in combined.rows() {
                    if row.len() != width {
                        skipped_rows += 1;
                        continue;
                    }
                    aligned_rows += 1;
                    for (column, cell) in row.iter().enumerate() {
                        let Some(cell) = cell else {
                            continue;
                        };
                        if cell.tag_name() != "TD" || !self.is_valid_element(cell) {
                            continue;
                        }
                        append_tokens(cell, "headers", &header_grid.column_header_ids(column));
                    }
                }
            }
        }
        self.metrics.rows_skipped += skipped_rows;

        if let Some(body) = body.as_ref() {
            self.fix_body_or_footer(body);
        }
        if let Some(footer) = footer.as_ref() {
            self.fix_body_or_footer(footer);
        }

        if let Some(logger) = self.debug {
            logger.increment("tables", 1);
            logger.increment("tables.rows_skipped", skipped_rows as u64);
            logger.log_json(&json!({
                "type": "table.associate",
                "table_id": table.get_attribute("id"),
                "thead": header.is_some(),
                "tbody": body.is_some(),
                "tfoot": footer.is_some(),
                "header_width": header_width,
                "rows_aligned": aligned_rows,
                "rows_skipped": skipped_rows,
            }));
        }
    }

    fn fix_header(&mut self, header: &P::Element) {
        for row in self.parser.find_children(header, "tr") {
            for cell in self.parser.find_children(&row, "th") {
                if !self.is_valid_element(&cell) {
                    continue;
                }
                self.id_generator.generate_id(&cell);
                cell.set_attribute("scope", "col");
            }
        }
    }

    fn fix_body_or_footer(&mut self, section: &P::Element) {
        let grid = TableGrid::build(self.parser, section);
        for row in grid.rows() {
            let mut header_ids: Vec<String> = Vec::new();
            for cell in row.iter().flatten() {
                if cell.tag_name() != "TH" || !self.is_valid_element(cell) {
                    continue;
                }
                self.id_generator.generate_id(cell);
                cell.set_attribute("scope", "row");
                if let Some(id) = cell.get_attribute("id") {
                    if !header_ids.contains(&id) {
                        header_ids.push(id);
                    }
                }
            }
            if header_ids.is_empty() {
                continue;
            }
            for cell in row.iter().flatten() {
                if cell.tag_name() != "TD" || !self.is_valid_element(cell) {
                    continue;
                }
                append_tokens(cell, "headers", &header_ids);
            }
        }
    }

    pub fn associate_all_labels_with_fields(&mut self) {
        for label in self.parser.find("label") {
            if self.is_valid_element(&label) {
                self.associate_label_with_field(&label);
            }
        }
    }

    pub fn associate_label_with_field(&mut self, label: &P::Element) {
        if label.tag_name() != "LABEL" {
            return;
        }
        self.metrics.labels += 1;

        let field = match label.get_attribute("for") {
            Some(target) => self.parser.find_by_id(&target),
            None => {
                let field = self
                    .parser
                    .find_descendants(label, "input,select,textarea")
                    .into_iter()
                    .next();
                if let Some(field) = field.as_ref().filter(|f| self.is_valid_element(f)) {
                    self.id_generator.generate_id(field);
                    if let Some(id) = field.get_attribute("id") {
                        label.set_attribute("for", &id);
                    }
                }
                field
            }
        };

        let field = field.filter(|f| self.is_valid_element(f));
        if let Some(field) = field.as_ref() {
            if !field.has_attribute("aria-label") {
                field.set_attribute("aria-label", &normalize_label_text(&label.text_content()));
            }
            self.id_generator.generate_id(label);
            if let Some(label_id) = label.get_attribute("id") {
                append_tokens(field, "aria-labelledby", &[label_id]);
            }
            self.metrics.labels_associated += 1;
        }

        if let Some(logger) = self.debug {
            logger.increment("labels", 1);
            logger.log_json(&json!({
                "type": "label.associate",
                "label_id": label.get_attribute("id"),
                "field_id": field.as_ref().and_then(|f| f.get_attribute("id")),
            }));
        }
    }
}

fn append_tokens<E: HtmlDomElement>(element: &E, attribute: &str, tokens: &[String]) {
    let current = element.get_attribute(attribute);
    if tokens
        .iter()
        .all(|token| contains_token(current.as_deref(), token))
    {
        return;
    }
    let mut value = current.unwrap_or_default();
    for token in tokens {
        value = increase_in_list(Some(value.as_str()), token);
    }
    element.set_attribute(attribute, &value);
}

/// Collapses runs of space, tab, CR and LF to one space and trims the ends.
pub fn normalize_label_text(text: &str) -> String {
    text.split([' ', '\t', '\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
