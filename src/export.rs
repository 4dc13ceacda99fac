//! Export of the aggregated series to flat files.

use crate::aggregate::Series;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One exported row: a series point tagged with its legend label
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    series: &'a str,
    x: f64,
    mean: f64,
    std: f64,
}

fn rows(series: &[Series]) -> impl Iterator<Item = SummaryRow<'_>> {
    series.iter().flat_map(|s| {
        s.points.iter().map(move |p| SummaryRow {
            series: &s.label,
            x: p.x,
            mean: p.mean,
            std: p.std,
        })
    })
}

/// Write every point of every series to `path`.
///
/// `.jsonl` and `.json` produce JSON Lines; anything else is CSV with a
/// `series,x,mean,std` header. Returns the number of rows written.
pub fn write_summary<P: AsRef<Path>>(series: &[Series], path: P) -> Result<usize> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "jsonl" | "json" => write_json_lines(series, path),
        _ => write_csv(series, path),
    }
}

fn write_csv(series: &[Series], path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create summary file: {}", path.display()))?;

    let mut written = 0;
    for row in rows(series) {
        writer.serialize(row)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

fn write_json_lines(series: &[Series], path: &Path) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    for row in rows(series) {
        // NaN is not valid JSON; serde_json writes it as null
        let json = serde_json::to_string(&row)?;
        writeln!(writer, "{}", json)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SeriesPoint;
    use crate::table::tests::scratch_dir;
    use std::fs;

    fn sample() -> Vec<Series> {
        vec![
            Series {
                label: "fixed".to_string(),
                points: vec![
                    SeriesPoint { x: 0.0, mean: 15.0, std: 7.5 },
                    SeriesPoint { x: 5.0, mean: 12.0, std: f64::NAN },
                ],
            },
            Series {
                label: "ppo".to_string(),
                points: vec![SeriesPoint { x: 0.0, mean: 9.0, std: 1.0 }],
            },
        ]
    }

    #[test]
    fn test_csv_summary() {
        let dir = scratch_dir("export-csv");
        let path = dir.join("summary.csv");

        assert_eq!(write_summary(&sample(), &path).unwrap(), 3);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "series,x,mean,std");
        assert_eq!(lines[1], "fixed,0.0,15.0,7.5");
        assert_eq!(lines[3], "ppo,0.0,9.0,1.0");
    }

    #[test]
    fn test_json_lines_summary() {
        let dir = scratch_dir("export-jsonl");
        let path = dir.join("summary.jsonl");

        assert_eq!(write_summary(&sample(), &path).unwrap(), 3);

        let text = fs::read_to_string(&path).unwrap();
        let second: serde_json::Value = serde_json::from_str(text.lines().nth(1).unwrap()).unwrap();
        assert_eq!(second["series"], "fixed");
        assert_eq!(second["x"], 5.0);
        assert!(second["std"].is_null());
    }
}
