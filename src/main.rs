//! trialplot - compare repeated experiment runs from CSV logs.
//!
//! Each file prefix collects the CSV files of one experimental condition,
//! rows are grouped on an x column, and the figure shows the mean of a metric
//! column with a ±1 standard deviation band per condition.

mod aggregate;
mod collect;
mod display;
mod episode;
mod export;
mod plot;
mod style;
mod table;

use aggregate::Series;
use anyhow::{bail, Result};
use clap::Parser;
use plot::{FigureText, OutputFormat};
use std::io;
use std::path::PathBuf;
use style::Theme;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Plot mean and standard deviation of metrics across repeated runs
#[derive(Parser, Debug)]
#[command(name = "trialplot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File prefixes; all files starting with a prefix form one series
    #[arg(short = 'f', long = "files", num_args = 1.., required = true)]
    files: Vec<String>,

    /// Legend labels, one per prefix (default: 0, 1, ...)
    #[arg(short = 'l', long = "labels", num_args = 1..)]
    labels: Option<Vec<String>>,

    /// Plot title
    #[arg(short = 't', long = "title", default_value = "")]
    title: String,

    /// Column to plot
    #[arg(long, default_value = "system_total_waiting_time")]
    yaxis: String,

    /// Column used as the x axis
    #[arg(long, default_value = "step")]
    xaxis: String,

    /// Moving average window
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    ma: u32,

    /// Value separator in the files
    #[arg(long, default_value_t = ',')]
    sep: char,

    /// X axis label
    #[arg(long, default_value = "Time step (seconds)")]
    xlabel: String,

    /// Y axis label
    #[arg(long, default_value = "Total waiting time (s)")]
    ylabel: String,

    /// Output file name without extension
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Output file format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pdf)]
    format: OutputFormat,

    /// Reduce each file to the mean of the y column, keyed by the episode
    /// number in its file name (`..._ep12.csv`)
    #[arg(long)]
    by_episode: bool,

    /// Write the aggregated series to this file (.csv or .jsonl)
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Do not open the interactive view
    #[arg(long)]
    no_show: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Legend label of the `index`-th prefix; explicit labels are reused
    /// cyclically when fewer than the prefixes
    fn label(&self, index: usize) -> String {
        match &self.labels {
            Some(labels) if !labels.is_empty() => labels[index % labels.len()].clone(),
            _ => index.to_string(),
        }
    }

    fn figure_text(&self) -> FigureText {
        FigureText {
            title: self.title.clone(),
            xlabel: self.xlabel.clone(),
            ylabel: self.ylabel.clone(),
        }
    }
}

/// Load and aggregate the series of one prefix.
///
/// `None` when the prefix has no data, so the caller can skip it.
fn load_series(args: &Args, prefix: &str, label: String) -> Result<Option<Series>> {
    let paths = collect::collect_prefix(prefix)?;
    if paths.is_empty() {
        warn!("No files match prefix '{}', skipping series '{}'", prefix, label);
        return Ok(None);
    }
    info!("Series '{}': {} file(s) for prefix '{}'", label, paths.len(), prefix);

    let window = args.ma as usize;
    let points = if args.by_episode {
        episode::aggregate_episodes(&paths, args.sep, &args.yaxis, window)?
    } else {
        match table::load_merged(&paths, args.sep)? {
            Some(merged) if !merged.is_empty() => {
                aggregate::aggregate(&merged, &args.xaxis, &args.yaxis, window)?
            }
            _ => Vec::new(),
        }
    };

    if points.is_empty() {
        warn!("No data rows for prefix '{}', skipping series '{}'", prefix, label);
        return Ok(None);
    }
    debug!(label = %label, points = points.len(), "aggregated series");
    Ok(Some(Series { label, points }))
}

fn run(args: Args) -> Result<()> {
    if let Some(labels) = &args.labels {
        if labels.len() != args.files.len() {
            warn!(
                "{} label(s) given for {} prefix(es); labels will be reused in order",
                labels.len(),
                args.files.len()
            );
        }
    }

    let mut series = Vec::new();
    for (i, prefix) in args.files.iter().enumerate() {
        if let Some(s) = load_series(&args, prefix, args.label(i))? {
            series.push(s);
        }
    }

    if series.is_empty() {
        bail!("No data to plot: none of the {} prefix(es) matched readable rows", args.files.len());
    }

    let theme = Theme::default();
    let text = args.figure_text();

    if let Some(ref base) = args.output {
        let svg = plot::render_svg(&series, &text, &theme)?;
        let path = plot::save_figure(&svg, base, args.format)?;
        info!("Figure saved to: {}", path.display());
    }

    if let Some(ref summary) = args.summary {
        let rows = export::write_summary(&series, summary)?;
        info!("Wrote {} summary row(s) to: {}", rows, summary.display());
    }

    if !args.no_show {
        display::show(&series, &text, &theme)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["trialplot"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let a = args(&["-f", "run_a"]);
        assert_eq!(a.yaxis, "system_total_waiting_time");
        assert_eq!(a.xaxis, "step");
        assert_eq!(a.ma, 1);
        assert_eq!(a.sep, ',');
        assert_eq!(a.xlabel, "Time step (seconds)");
        assert_eq!(a.ylabel, "Total waiting time (s)");
        assert_eq!(a.format, OutputFormat::Pdf);
        assert!(a.output.is_none());
    }

    #[test]
    fn test_files_required_and_window_positive() {
        assert!(Args::try_parse_from(["trialplot"]).is_err());
        assert!(Args::try_parse_from(["trialplot", "-f", "a", "--ma", "0"]).is_err());
    }

    #[test]
    fn test_labels_default_and_cycle() {
        let a = args(&["-f", "a", "b", "c"]);
        assert_eq!(a.label(0), "0");
        assert_eq!(a.label(2), "2");

        let a = args(&["-f", "a", "b", "c", "-l", "fixed", "ppo"]);
        assert_eq!(a.label(1), "ppo");
        assert_eq!(a.label(2), "fixed");
    }

    #[test]
    fn test_run_skips_missing_prefix_and_writes_outputs() {
        let dir = table::tests::scratch_dir("main-run");
        fs::write(dir.join("run_a_1.csv"), "step,system_total_waiting_time\n0,10\n").unwrap();
        fs::write(dir.join("run_a_2.csv"), "step,system_total_waiting_time\n0,20\n").unwrap();
        fs::write(dir.join("run_b_1.csv"), "step,system_total_waiting_time\n0,NaN\n0,4\n1,6\n").unwrap();

        let prefix_a = dir.join("run_a").display().to_string();
        let prefix_b = dir.join("run_b").display().to_string();
        let missing = dir.join("run_z").display().to_string();
        let output = dir.join("result").display().to_string();
        let summary = dir.join("summary.csv").display().to_string();

        let a = args(&[
            "-f", prefix_a.as_str(), missing.as_str(), prefix_b.as_str(),
            "-l", "a", "z", "b",
            "-o", output.as_str(),
            "--format", "svg",
            "--summary", summary.as_str(),
            "--no-show",
        ]);
        run(a).unwrap();

        assert!(dir.join("result.svg").exists());
        let text = fs::read_to_string(dir.join("summary.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("a,0.0,15.0,7.07106781"));
        assert!(lines[2].starts_with("b,0.0,4.0,"));
        assert!(lines[3].starts_with("b,1.0,6.0,"));
    }

    #[test]
    fn test_run_fails_without_any_data() {
        let dir = table::tests::scratch_dir("main-empty");
        let missing = dir.join("nothing").display().to_string();
        let err = run(args(&["-f", missing.as_str(), "--no-show"])).unwrap_err();
        assert!(err.to_string().contains("No data to plot"));
    }

    #[test]
    fn test_run_writes_pdf() {
        let dir = table::tests::scratch_dir("main-pdf");
        fs::write(dir.join("trial_1.csv"), "step,system_total_waiting_time\n0,1\n1,2\n").unwrap();
        let prefix = dir.join("trial").display().to_string();
        let output = dir.join("result").display().to_string();

        run(args(&["-f", prefix.as_str(), "-o", output.as_str(), "--no-show"])).unwrap();
        assert!(dir.join("result.pdf").exists());
    }
}
