//! Sample file reading.
//!
//! Files hold one record per line with columns separated by commas,
//! semicolons or whitespace. Blank lines and lines starting with `#` are
//! skipped, and a leading non-numeric line is taken as a header.

use anyhow::{Context, Result};
use std::path::Path;

/// Column-major contents of a sample file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Columns {
    pub header: Option<Vec<String>>,
    pub columns: Vec<Vec<f64>>,
}

impl Columns {
    /// Column `index`, or an error naming what it should have held.
    pub fn column(&self, index: usize, what: &str) -> Result<&[f64]> {
        self.columns
            .get(index)
            .map(Vec::as_slice)
            .with_context(|| format!("Missing column {} ({})", index + 1, what))
    }

    pub fn optional(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }
}

fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|f| !f.is_empty())
}

/// Parse sample text.
pub fn parse_columns(content: &str) -> Result<Columns> {
    let mut out = Columns::default();
    let mut width = None;

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Result<Vec<f64>, _> = fields(line).map(str::parse::<f64>).collect();
        let values = match values {
            Ok(values) => values,
            Err(_) if width.is_none() && out.header.is_none() => {
                out.header = Some(fields(line).map(str::to_owned).collect());
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Line {}: not a numeric record", lineno + 1));
            }
        };

        match width {
            None => {
                width = Some(values.len());
                out.columns = vec![Vec::new(); values.len()];
            }
            Some(w) if w != values.len() => {
                anyhow::bail!("Line {}: expected {} columns, got {}", lineno + 1, w, values.len());
            }
            Some(_) => {}
        }
        for (column, v) in out.columns.iter_mut().zip(values) {
            column.push(v);
        }
    }

    Ok(out)
}

/// Read and parse a sample file.
pub fn read_columns(path: &Path) -> Result<Columns> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sample file: {:?}", path))?;
    let columns = parse_columns(&content).with_context(|| format!("In {:?}", path))?;
    tracing::info!(
        "Read {} columns x {} rows from {:?}",
        columns.columns.len(),
        columns.columns.first().map_or(0, Vec::len),
        path
    );
    Ok(columns)
}
