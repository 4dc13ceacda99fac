//! Per-episode reduction: one observation per trial file.
//!
//! Training runs often write one file per episode (`..._conn0_ep12.csv`).
//! In this mode each file collapses to the mean of the metric column and is
//! keyed by the episode number found in its name, so grouping then averages
//! across runs per episode.

use crate::aggregate::{group_stats, smooth, SeriesPoint};
use crate::table::Table;
use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static EPISODE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"ep(\d+)").ok());

/// Episode number from the first `ep<digits>` in the file name.
///
/// Directory names are not searched. Digit runs too long for an integer
/// still yield their (rounded) value.
pub fn episode_number(path: &Path) -> Option<f64> {
    let name = path.file_name()?.to_str()?;
    EPISODE
        .as_ref()?
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Mean of the present values of a column; NaN when all are missing
fn column_mean(values: &[Option<f64>]) -> f64 {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn file_mean(path: &Path, sep: char, yaxis: &str) -> Result<f64> {
    let table = Table::from_path(path, sep)?;
    Ok(column_mean(&table.numeric_column(yaxis)?))
}

/// Reduce each file to `(episode, mean(yaxis))` and aggregate across files.
///
/// Files without an episode number in their name, and files that cannot be
/// read or lack the y column, are skipped with a warning.
pub fn aggregate_episodes(paths: &[PathBuf], sep: char, yaxis: &str, window: usize) -> Result<Vec<SeriesPoint>> {
    let mut xs = Vec::with_capacity(paths.len());
    let mut ys = Vec::with_capacity(paths.len());

    for path in paths {
        let Some(episode) = episode_number(path).filter(|e| e.is_finite()) else {
            warn!("Could not find episode number in file name: {}", path.display());
            continue;
        };
        let mean = match file_mean(path, sep, yaxis) {
            Ok(mean) => mean,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        debug!(path = %path.display(), episode, mean, "reduced episode file");

        xs.push(Some(episode));
        ys.push(Some(mean).filter(|m| !m.is_nan()));
    }

    Ok(smooth(group_stats(&xs, &ys), window))
}
