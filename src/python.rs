use crate::{AccessFix, AccessFixError, FixMetrics};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};

#[pyclass(name = "AccessFix")]
struct PyAccessFix {
    engine: AccessFix,
}

#[pymethods]
impl PyAccessFix {
    #[new]
    #[pyo3(
        signature = (
            id_prefix=None,
            ignore_attribute=None,
            associate_tables=true,
            associate_labels=true,
            debug_out=None
        )
    )]
    fn new(
        id_prefix: Option<String>,
        ignore_attribute: Option<String>,
        associate_tables: bool,
        associate_labels: bool,
        debug_out: Option<String>,
    ) -> PyResult<Self> {
        let mut builder = AccessFix::builder()
            .associate_tables(associate_tables)
            .associate_labels(associate_labels);
        if let Some(prefix) = id_prefix {
            builder = builder.id_prefix(prefix);
        }
        if let Some(attribute) = ignore_attribute {
            builder = builder.ignore_attribute(attribute);
        }
        if let Some(path) = debug_out {
            builder = builder.debug_log(path);
        }
        let engine = builder.build().map_err(to_py_err)?;
        Ok(Self { engine })
    }

    #[getter]
    fn id_prefix(&self) -> String {
        self.engine.id_prefix().to_string()
    }

    fn fix_html(&self, py: Python<'_>, html: &str) -> PyResult<String> {
        py.allow_threads(|| self.engine.fix_html(html))
            .map_err(to_py_err)
    }

    fn fix_html_with_metrics(&self, py: Python<'_>, html: &str) -> PyResult<(String, PyObject)> {
        let (out, metrics) = py
            .allow_threads(|| self.engine.fix_html_with_metrics(html))
            .map_err(to_py_err)?;
        Ok((out, metrics_to_dict(py, &metrics)?))
    }

    #[pyo3(signature = (html_list, parallel=false))]
    fn fix_many(&self, py: Python<'_>, html_list: Vec<String>, parallel: bool) -> PyResult<Vec<String>> {
        py.allow_threads(|| {
            if parallel {
                self.engine.fix_many_parallel(&html_list)
            } else {
                self.engine.fix_many(&html_list)
            }
        })
        .map_err(to_py_err)
    }
}

fn metrics_to_dict(py: Python<'_>, metrics: &FixMetrics) -> PyResult<PyObject> {
    let dict = PyDict::new_bound(py);
    dict.set_item("tables", metrics.tables)?;
    dict.set_item("tables_with_valid_header", metrics.tables_with_valid_header)?;
    dict.set_item("rows_skipped", metrics.rows_skipped)?;
    dict.set_item("labels", metrics.labels)?;
    dict.set_item("labels_associated", metrics.labels_associated)?;
    dict.set_item("ids_generated", metrics.ids_generated)?;
    dict.set_item("elapsed_ms", metrics.elapsed_ms)?;
    Ok(dict.to_object(py))
}

#[pymodule]
fn _accessfix(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyAccessFix>()?;
    Ok(())
}

fn to_py_err(err: AccessFixError) -> PyErr {
    match err {
        AccessFixError::Io(err) => PyIOError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}
