//! Expansion of path prefixes into the files of one experimental condition.

use anyhow::{Context, Result};
use glob::glob;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Find every regular file whose path starts with `prefix`.
///
/// The prefix itself may contain glob wildcards (`runs/*/ppo_`).
///
/// Paths are sorted so repeated runs merge rows in the same order. A prefix
/// with no matches yields an empty list, which callers treat as "no data".
pub fn collect_prefix(prefix: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}*", prefix);
    let mut files = Vec::new();

    for entry in glob(&pattern).with_context(|| format!("Invalid file prefix: {}", prefix))? {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => warn!("Skipping unreadable path while expanding '{}': {}", prefix, e),
        }
    }

    files.sort();
    debug!(prefix, matched = files.len(), "expanded prefix");
    Ok(files)
}
