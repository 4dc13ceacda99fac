//! Delimited table loading and merging of repeated-trial files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures specific to reading and combining tables
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{column}' not found (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("columns of {path} do not match the first file: expected [{expected}], found [{found}]")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("separator must be a single ASCII character, got {0:?}")]
    InvalidSeparator(char),

    #[error("malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// An in-memory table: header plus raw string cells.
///
/// Cells stay as text until a column is requested numerically, so a stray
/// string in one column never prevents loading the others.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse a delimited file whose first row names the columns
    pub fn from_path<P: AsRef<Path>>(path: P, sep: char) -> Result<Self> {
        let path = path.as_ref();
        let delimiter = separator_byte(sep)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("Failed to open table: {}", path.display()))?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|source| TableError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| TableError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.to_string(),
                available: self.columns.join(", "),
            })
    }

    /// Append the rows of `other`, matching columns by name.
    ///
    /// `other` may list the same columns in a different order; its rows are
    /// reordered to this table's header. Any other difference is fatal.
    pub fn concat(&mut self, other: Table, other_path: &Path) -> Result<(), TableError> {
        let mut sorted_self = self.columns.clone();
        let mut sorted_other = other.columns.clone();
        sorted_self.sort();
        sorted_other.sort();
        if sorted_self != sorted_other {
            return Err(TableError::SchemaMismatch {
                path: other_path.to_path_buf(),
                expected: self.columns.join(", "),
                found: other.columns.join(", "),
            });
        }

        if self.columns == other.columns {
            self.rows.extend(other.rows);
            return Ok(());
        }

        let mapping: Vec<usize> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect::<Result<_, _>>()?;
        for row in other.rows {
            self.rows.push(
                mapping
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        Ok(())
    }

    /// Numeric view of a column; cells that are empty, unparsable or NaN
    /// become `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).and_then(|cell| parse_number(cell)))
            .collect())
    }
}

/// Coerce a cell to a number, treating anything unparsable as missing
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn separator_byte(sep: char) -> Result<u8, TableError> {
    if sep.is_ascii() {
        Ok(sep as u8)
    } else {
        Err(TableError::InvalidSeparator(sep))
    }
}

/// Load every path and concatenate them into one table.
///
/// Returns `None` when `paths` is empty.
pub fn load_merged(paths: &[PathBuf], sep: char) -> Result<Option<Table>> {
    let mut merged: Option<Table> = None;

    for path in paths {
        let table = Table::from_path(path, sep)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "loaded table");
        match merged.as_mut() {
            None => merged = Some(table),
            Some(acc) => acc.concat(table, path)?,
        }
    }

    Ok(merged)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    /// Fresh scratch directory for one test
    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trialplot-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_from_path_reads_header_and_rows() {
        let dir = scratch_dir("from-path");
        let path = dir.join("run.csv");
        fs::write(&path, "step,system_total_waiting_time\n0,10\n5,12.5\n").unwrap();

        let t = Table::from_path(&path, ',').unwrap();
        assert_eq!(t.columns, vec!["step", "system_total_waiting_time"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[1], vec!["5", "12.5"]);
    }

    #[test]
    fn test_custom_separator() {
        let dir = scratch_dir("separator");
        let path = dir.join("run.tsv");
        fs::write(&path, "step;value\n1;2\n").unwrap();

        let t = Table::from_path(&path, ';').unwrap();
        assert_eq!(t.columns, vec!["step", "value"]);
        assert_eq!(t.numeric_column("value").unwrap(), vec![Some(2.0)]);
    }

    #[test]
    fn test_non_ascii_separator_rejected() {
        let err = separator_byte('§').unwrap_err();
        assert!(matches!(err, TableError::InvalidSeparator('§')));
    }

    #[test]
    fn test_numeric_column_coerces_bad_cells() {
        let t = table(&["step", "v"], &[&["0", "1.5"], &["1", "NaN"], &["2", "oops"], &["3", ""]]);
        assert_eq!(
            t.numeric_column("v").unwrap(),
            vec![Some(1.5), None, None, None]
        );
    }

    #[test]
    fn test_missing_column() {
        let t = table(&["step"], &[&["0"]]);
        let err = t.numeric_column("v").unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { .. }));
    }

    #[test]
    fn test_concat_reorders_by_name() {
        let mut a = table(&["step", "v"], &[&["0", "10"]]);
        let b = table(&["v", "step"], &[&["20", "0"]]);
        a.concat(b, Path::new("b.csv")).unwrap();
        assert_eq!(a.rows, vec![vec!["0", "10"], vec!["0", "20"]]);
    }

    #[test]
    fn test_concat_schema_mismatch_is_fatal() {
        let mut a = table(&["step", "v"], &[&["0", "10"]]);
        let b = table(&["step", "w"], &[&["0", "20"]]);
        let err = a.concat(b, Path::new("b.csv")).unwrap_err();
        assert!(matches!(err, TableError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_load_merged_empty_paths() {
        assert!(load_merged(&[], ',').unwrap().is_none());
    }

    #[test]
    fn test_load_merged_concatenates_files() {
        let dir = scratch_dir("merge");
        let a = dir.join("run_a_1.csv");
        let b = dir.join("run_a_2.csv");
        fs::write(&a, "step,v\n0,10\n").unwrap();
        fs::write(&b, "step,v\n0,20\n1,30\n").unwrap();

        let merged = load_merged(&[a, b], ',').unwrap().unwrap();
        assert_eq!(merged.len(), 3);
    }
}
