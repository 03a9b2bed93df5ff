use pyo3::prelude::*;

use crate::parser::Parser;
use crate::text::{ExtractOptions, extract_text_with_options};
use crate::tokenizer::Lexer;

fn extract(bytes: &[u8], divider: Option<String>) -> String {
    let objects = Parser::new(Lexer::new(bytes)).parse();
    let options = ExtractOptions {
        divider: divider.unwrap_or_else(|| "\n".to_string()),
        ..ExtractOptions::default()
    };
    extract_text_with_options(objects, &options)
}

#[pyfunction]
#[pyo3(signature = (path, divider=None))]
fn extract_text(path: &str, divider: Option<String>) -> PyResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(extract(&bytes, divider))
}

#[pyfunction]
#[pyo3(signature = (data, divider=None))]
fn extract_text_bytes(data: &[u8], divider: Option<String>) -> String {
    extract(data, divider)
}

#[pymodule]
fn pluck(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(extract_text, m)?)?;
    m.add_function(wrap_pyfunction!(extract_text_bytes, m)?)?;
    Ok(())
}
