//! Fixed-layout instrument tables.
//!
//! Instrument exports start with a metadata block of known length, followed by a
//! header row and comma-separated data rows.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bioaerosol_core::{Error, Result};
use csv::StringRecord;

/// A parsed fixed-layout file.
#[derive(Debug, Clone)]
pub struct FixedLayoutTable {
    /// Source path, for error context.
    pub path: PathBuf,
    /// Raw metadata lines, line terminators stripped.
    pub metadata: Vec<String>,
    /// Column names, trimmed.
    pub headers: StringRecord,
    /// Data rows.
    pub rows: Vec<StringRecord>,
    /// Number of lines before the first data row.
    header_offset: u64,
}

impl FixedLayoutTable {
    /// Open and parse a file.
    pub fn open<P: AsRef<Path>>(path: P, metadata_rows: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), metadata_rows, path)
    }

    /// Parse from a reader. `path` is used only for error messages.
    pub fn from_reader<R: BufRead>(
        mut reader: R,
        metadata_rows: usize,
        path: &Path,
    ) -> Result<Self> {
        let mut metadata = Vec::with_capacity(metadata_rows);
        let mut line = String::new();
        for i in 0..metadata_rows {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(Error::schema(
                    path,
                    format!("expected {metadata_rows} metadata lines, found {i}"),
                ));
            }
            metadata.push(line.trim_end_matches(['\r', '\n']).to_string());
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(Error::schema(path, "missing header row"));
        }

        let rows = csv_reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            headers,
            rows,
            header_offset: metadata_rows as u64,
        })
    }

    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indices of all the named columns, or a schema error listing every missing one.
    pub fn require_columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut indices = [0usize; N];
        let mut missing = Vec::new();
        for (slot, name) in indices.iter_mut().zip(names) {
            match self.column_index(name) {
                Some(i) => *slot = i,
                None => missing.push(name),
            }
        }
        if !missing.is_empty() {
            let found: Vec<&str> = self.headers.iter().collect();
            return Err(Error::schema(
                &self.path,
                format!(
                    "missing column(s) {}; found {}",
                    missing.join(", "),
                    found.join(", ")
                ),
            ));
        }
        Ok(indices)
    }

    /// File line number (1-based) of a data row, for error messages.
    pub fn line_of(&self, row: &StringRecord) -> u64 {
        row.position()
            .map(|p| p.line() + self.header_offset)
            .unwrap_or(0)
    }

    /// Parse a cell that may be null. Empty, `NA` and `NaN` cells are null.
    pub fn optional_f64(&self, row: &StringRecord, col: usize) -> Result<Option<f64>> {
        let cell = row.get(col).unwrap_or("");
        if is_null(cell) {
            return Ok(None);
        }
        cell.parse::<f64>().map(Some).map_err(|_| {
            Error::data(
                &self.path,
                format!(
                    "line {}: column '{}' is not numeric: '{cell}'",
                    self.line_of(row),
                    self.headers.get(col).unwrap_or("?")
                ),
            )
        })
    }

    /// Parse a cell that must hold a number.
    pub fn required_f64(&self, row: &StringRecord, col: usize) -> Result<f64> {
        self.optional_f64(row, col)?.ok_or_else(|| {
            Error::data(
                &self.path,
                format!(
                    "line {}: column '{}' is empty",
                    self.line_of(row),
                    self.headers.get(col).unwrap_or("?")
                ),
            )
        })
    }
}

fn is_null(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan")
}
