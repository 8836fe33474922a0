/// Work done by one fixing pass over a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixMetrics {
    pub tables: usize,
    pub tables_with_valid_header: usize,
    pub rows_skipped: usize,
    pub labels: usize,
    pub labels_associated: usize,
    pub ids_generated: u64,
    pub elapsed_ms: f64,
}

