//! Delimited numeric input → columns.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Parsed numeric table stored column-wise.
#[derive(Debug, Default)]
pub struct Table {
    pub columns: Vec<Vec<f64>>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column `i`. An input with no header and no rows has no known width, so every
    /// column of it is empty.
    pub fn column(&self, i: usize) -> Result<&[f64]> {
        if self.columns.is_empty() {
            return Ok(&[]);
        }
        self.columns.get(i).map(Vec::as_slice).with_context(|| {
            format!("column {i} requested, input has {} columns", self.n_columns())
        })
    }
}

/// Open `path` (or stdin for `-`) and parse it.
pub fn read_table_path(path: &Path, delimiter: Option<char>, skip_header: bool) -> Result<Table> {
    if path.as_os_str() == "-" {
        return read_table(std::io::stdin().lock(), delimiter, skip_header)
            .context("failed to read stdin");
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open input {}", path.display()))?;
    read_table(file, delimiter, skip_header)
        .with_context(|| format!("failed to read input {}", path.display()))
}

/// Parse rows of numbers. Blank lines and lines starting with `#` are skipped.
///
/// Fields are tab-separated unless a delimiter is given. Every row must have the same
/// number of fields; with `skip_header` the header fixes that number.
pub fn read_table(reader: impl Read, delimiter: Option<char>, skip_header: bool) -> Result<Table> {
    let delimiter = match delimiter {
        None => b'\t',
        Some(d) => u8::try_from(d)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("delimiter '{d}' is not a single ASCII character"))?,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(skip_header)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let mut table = Table::default();
    if skip_header {
        let width = rdr.headers().context("failed to read header")?.len();
        table.columns = vec![Vec::new(); width];
    }

    for result in rdr.records() {
        let record = result.map_err(|e| {
            let msg = match e.position() {
                Some(pos) => format!("line {}: malformed row", pos.line()),
                None => "malformed row".to_string(),
            };
            anyhow::Error::new(e).context(msg)
        })?;
        if table.columns.is_empty() {
            table.columns = vec![Vec::new(); record.len()];
        }
        let line = record.position().map_or(0, csv::Position::line);
        for (col, field) in table.columns.iter_mut().zip(record.iter()) {
            let v: f64 =
                field.parse().with_context(|| format!("line {line}: bad number '{field}'"))?;
            col.push(v);
        }
    }
    Ok(table)
}
