mod association;
mod debug;
mod dom;
mod error;
mod id_generator;
mod metrics;
#[cfg(feature = "python")]
mod python;
mod table;
mod token_list;

pub use association::{AccessibleAssociation, DEFAULT_IGNORE_ATTRIBUTE, normalize_label_text};
use debug::DebugLogger;
pub use dom::{HtmlDomElement, HtmlDomParser, KuchikiElement, KuchikiParser};
pub use error::AccessFixError;
pub use id_generator::IdGenerator;
pub use metrics::FixMetrics;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
pub use table::{GridRow, TableGrid, expand_colspan, expand_rowspan, span_value};
pub use token_list::{contains_token, increase_in_list};

pub const DEFAULT_ID_PREFIX: &str = "association";

/// Accessibility repair pass: binds table cells to their headers and form
/// controls to their labels.
pub struct AccessFix {
    id_prefix: String,
    ignore_attribute: String,
    associate_tables: bool,
    associate_labels: bool,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct AccessFixBuilder {
    id_prefix: String,
    ignore_attribute: String,
    associate_tables: bool,
    associate_labels: bool,
    debug_path: Option<PathBuf>,
}

impl AccessFix {
    pub fn builder() -> AccessFixBuilder {
        AccessFixBuilder::new()
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    /// Runs the enabled fixers over an already-parsed document. Every call uses
    /// a fresh id generator seeded with the ids already present in `parser`.
    pub fn fix_parser<P: HtmlDomParser>(&self, parser: &P) -> FixMetrics {
        self.fix_parser_at(0, parser)
    }

    fn fix_parser_at<P: HtmlDomParser>(&self, doc_id: usize, parser: &P) -> FixMetrics {
        let t_pass = std::time::Instant::now();
        let mut ids = IdGenerator::new(self.id_prefix.as_str());
        ids.reserve_existing(parser);

        let mut association = AccessibleAssociation::new(parser, &mut ids)
            .with_ignore_attribute(&self.ignore_attribute)
            .with_debug(self.debug.as_deref());
        if self.associate_tables {
            association.associate_all_data_cells_with_header_cells();
        }
        if self.associate_labels {
            association.associate_all_labels_with_fields();
        }
        let mut metrics = association.into_metrics();
        metrics.ids_generated = ids.generated();
        metrics.elapsed_ms = t_pass.elapsed().as_secs_f64() * 1000.0;

        if let Some(logger) = self.debug.as_deref() {
            logger.increment("ids_generated", metrics.ids_generated);
            logger.log_json(&json!({
                "type": "pass.summary",
                "doc_id": doc_id,
                "tables": metrics.tables,
                "tables_with_valid_header": metrics.tables_with_valid_header,
                "rows_skipped": metrics.rows_skipped,
                "labels": metrics.labels,
                "labels_associated": metrics.labels_associated,
                "ids_generated": metrics.ids_generated,
                "ms": metrics.elapsed_ms,
            }));
        }
        metrics
    }

    fn fix_html_at(&self, doc_id: usize, html: &str) -> Result<(String, FixMetrics), AccessFixError> {
        if html.trim().is_empty() {
            return Err(AccessFixError::EmptyDocument);
        }
        let parser = KuchikiParser::parse(html);
        let metrics = self.fix_parser_at(doc_id, &parser);
        Ok((parser.html(), metrics))
    }

    pub fn fix_html(&self, html: &str) -> Result<String, AccessFixError> {
        let (out, _metrics) = self.fix_html_with_metrics(html)?;
        Ok(out)
    }

    pub fn fix_html_with_metrics(&self, html: &str) -> Result<(String, FixMetrics), AccessFixError> {
        let result = self.fix_html_at(0, html);
        self.emit_debug_summary("fix_html");
        result
    }

    pub fn fix_many(&self, html_list: &[String]) -> Result<Vec<String>, AccessFixError> {
        let result = html_list
            .iter()
            .enumerate()
            .map(|(idx, html)| self.fix_html_at(idx, html).map(|(out, _)| out))
            .collect();
        self.emit_debug_summary("fix_many");
        result
    }

    // Documents never share a tree, so each worker parses and fixes its own
    // document with its own id generator; results come back in input order.
    pub fn fix_many_parallel(&self, html_list: &[String]) -> Result<Vec<String>, AccessFixError> {
        use rayon::prelude::*;

        let mut results: Vec<(usize, Result<String, AccessFixError>)> = html_list
            .par_iter()
            .enumerate()
            .map(|(idx, html)| (idx, self.fix_html_at(idx, html).map(|(out, _)| out)))
            .collect();
        results.sort_by_key(|(idx, _)| *idx);

        self.emit_debug_summary("fix_many_parallel");
        results.into_iter().map(|(_, res)| res).collect()
    }

    pub fn fix_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<FixMetrics, AccessFixError> {
        let html = std::fs::read_to_string(input)?;
        let (fixed, metrics) = self.fix_html_with_metrics(&html)?;
        std::fs::write(output, fixed)?;
        Ok(metrics)
    }
}

impl Default for AccessFixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessFixBuilder {
    pub fn new() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            ignore_attribute: DEFAULT_IGNORE_ATTRIBUTE.to_string(),
            associate_tables: true,
            associate_labels: true,
            debug_path: None,
        }
    }

    // Generated ids take the form `<prefix>-<n>`.
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn ignore_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.ignore_attribute = attribute.into();
        self
    }

    pub fn associate_tables(mut self, enabled: bool) -> Self {
        self.associate_tables = enabled;
        self
    }

    pub fn associate_labels(mut self, enabled: bool) -> Self {
        self.associate_labels = enabled;
        self
    }

    // Enable JSONL debug logging of every table/label decision.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<AccessFix, AccessFixError> {
        if self.id_prefix.is_empty() {
            return Err(AccessFixError::InvalidConfiguration(
                "id_prefix cannot be empty".to_string(),
            ));
        }
        if self.id_prefix.chars().any(|ch| ch.is_ascii_whitespace()) {
            return Err(AccessFixError::InvalidConfiguration(format!(
                "id_prefix must not contain whitespace (got {:?})",
                self.id_prefix
            )));
        }
        if self.ignore_attribute.trim().is_empty() {
            return Err(AccessFixError::InvalidConfiguration(
                "ignore_attribute cannot be empty".to_string(),
            ));
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(AccessFix {
            id_prefix: self.id_prefix,
            ignore_attribute: self.ignore_attribute,
            associate_tables: self.associate_tables,
            associate_labels: self.associate_labels,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("accessfix_{tag}_{nanos}.{ext}"))
    }

    const FORM_AND_TABLE: &str = r#"
        <html>
          <body>
            <form><label>Name:<input></label></form>
            <table>
              <thead><tr><th id="h1" scope="col">A</th><th id="h2" scope="col">B</th></tr></thead>
              <tbody><tr><td id="c1">1</td><td id="c2">2</td></tr></tbody>
            </table>
          </body>
        </html>
    "#;

    #[test]
    fn fix_html_runs_both_fixers() {
        let engine = AccessFix::builder().build().expect("engine");
        let (out, metrics) = engine.fix_html_with_metrics(FORM_AND_TABLE).expect("fix");
        let parser = KuchikiParser::parse(&out);
        assert_eq!(
            parser.find_by_id("c1").and_then(|c| c.get_attribute("headers")).as_deref(),
            Some("h1")
        );
        assert_eq!(
            parser.find_by_id("c2").and_then(|c| c.get_attribute("headers")).as_deref(),
            Some("h2")
        );
        let input = parser.find("input").pop().expect("input");
        assert_eq!(input.get_attribute("aria-label").as_deref(), Some("Name:"));
        assert_eq!(metrics.tables, 1);
        assert_eq!(metrics.labels_associated, 1);
        assert_eq!(metrics.ids_generated, 2);
    }

    #[test]
    fn fixers_can_be_disabled() {
        let engine = AccessFix::builder()
            .associate_tables(false)
            .build()
            .expect("engine");
        let out = engine.fix_html(FORM_AND_TABLE).expect("fix");
        let parser = KuchikiParser::parse(&out);
        assert_eq!(
            parser.find_by_id("c1").and_then(|c| c.get_attribute("headers")),
            None
        );
        assert!(parser.find("label[for]").len() == 1);

        let engine = AccessFix::builder()
            .associate_labels(false)
            .build()
            .expect("engine");
        let out = engine.fix_html(FORM_AND_TABLE).expect("fix");
        let parser = KuchikiParser::parse(&out);
        assert!(parser.find("label[for]").is_empty());
    }

    #[test]
    fn generated_ids_use_prefix_and_avoid_collisions() {
        let engine = AccessFix::builder().id_prefix("a11y").build().expect("engine");
        let out = engine
            .fix_html(r#"<span id="a11y-1"></span><label>Age <input></label>"#)
            .expect("fix");
        let parser = KuchikiParser::parse(&out);
        let input = parser.find("input").pop().expect("input");
        let label = parser.find("label").pop().expect("label");
        assert_eq!(input.get_attribute("id").as_deref(), Some("a11y-2"));
        assert_eq!(label.get_attribute("id").as_deref(), Some("a11y-3"));
    }

    #[test]
    fn rerunning_the_engine_is_stable() {
        let engine = AccessFix::builder().build().expect("engine");
        let once = engine.fix_html(FORM_AND_TABLE).expect("first pass");
        let twice = engine.fix_html(&once).expect("second pass");
        assert_eq!(once, twice);
    }

    #[test]
    fn builder_rejects_bad_configuration() {
        for prefix in ["", "two words", "tab\tbed"] {
            let err = AccessFix::builder().id_prefix(prefix).build();
            assert!(
                matches!(err, Err(AccessFixError::InvalidConfiguration(_))),
                "prefix {prefix:?} must be rejected"
            );
        }
        let err = AccessFix::builder().ignore_attribute(" ").build();
        assert!(matches!(err, Err(AccessFixError::InvalidConfiguration(_))));
    }

    #[test]
    fn parallel_batch_matches_sequential_batch() {
        let engine = AccessFix::builder().build().expect("engine");
        let docs: Vec<String> = (0..8)
            .map(|i| {
                format!(
                    "<table><tbody><tr><th>Row {i}</th><td id=\"c{i}\">{i}</td></tr></tbody></table>"
                )
            })
            .collect();
        let sequential = engine.fix_many(&docs).expect("sequential");
        let parallel = engine.fix_many_parallel(&docs).expect("parallel");
        assert_eq!(sequential, parallel);
        for (i, out) in parallel.iter().enumerate() {
            assert!(
                out.contains(&format!("id=\"c{i}\"")),
                "output {i} must stay in input order"
            );
            assert!(out.contains("headers=\"association-1\""));
        }
    }

    #[test]
    fn debug_log_records_every_decision() {
        let path = temp_path("engine_debug", "jsonl");
        let engine = AccessFix::builder()
            .debug_log(&path)
            .build()
            .expect("engine");
        engine.fix_html(FORM_AND_TABLE).expect("fix");

        let text = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        let records: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("jsonl"))
            .collect();
        let kinds: Vec<&str> = records
            .iter()
            .filter_map(|r| r["type"].as_str())
            .collect();
        assert_eq!(
            kinds,
            vec!["table.associate", "label.associate", "pass.summary", "debug.summary"]
        );
        assert_eq!(records[0]["header_width"], 2);
        assert_eq!(records[3]["context"], "fix_html");
        assert_eq!(records[3]["counts"]["tables"], 1);
        assert_eq!(records[3]["counts"]["ids_generated"], 2);
    }

    #[test]
    fn blank_input_is_an_empty_document() {
        let engine = AccessFix::builder().build().expect("engine");
        assert!(matches!(engine.fix_html(""), Err(AccessFixError::EmptyDocument)));
        assert!(matches!(engine.fix_html(" \n\t "), Err(AccessFixError::EmptyDocument)));
        let fixed = engine.fix_html("plain text").expect("text still parses");
        assert!(fixed.contains("plain text"));
    }

    #[test]
    fn failed_batches_still_flush_the_debug_summary() {
        let path = temp_path("batch_debug", "jsonl");
        let engine = AccessFix::builder()
            .debug_log(&path)
            .build()
            .expect("engine");
        let batch = vec![FORM_AND_TABLE.to_string(), "   ".to_string()];
        assert!(matches!(engine.fix_many(&batch), Err(AccessFixError::EmptyDocument)));
        assert!(matches!(
            engine.fix_many_parallel(&batch),
            Err(AccessFixError::EmptyDocument)
        ));
        engine.fix_html(FORM_AND_TABLE).expect("fix");

        let text = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        let summaries: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("jsonl"))
            .filter(|record| record["type"] == "debug.summary")
            .collect();
        let contexts: Vec<&str> = summaries
            .iter()
            .filter_map(|r| r["context"].as_str())
            .collect();
        assert_eq!(contexts, vec!["fix_many", "fix_many_parallel", "fix_html"]);
        for summary in &summaries {
            assert_eq!(summary["counts"]["tables"], 1, "{}", summary);
        }
    }

    #[test]
    fn fix_file_round_trip() {
        let input = temp_path("fix_in", "html");
        let output = temp_path("fix_out", "html");
        std::fs::write(&input, FORM_AND_TABLE).expect("write input");
        let engine = AccessFix::builder().build().expect("engine");
        let metrics = engine.fix_file(&input, &output).expect("fix file");
        let written = std::fs::read_to_string(&output).expect("read output");
        let _ = std::fs::remove_file(&input);
        let _ = std::fs::remove_file(&output);
        assert_eq!(metrics.tables, 1);
        assert!(written.contains("headers=\"h1\""));

        let missing = engine.fix_file(temp_path("absent", "html"), &output);
        assert!(matches!(missing, Err(AccessFixError::Io(_))));
    }
}
