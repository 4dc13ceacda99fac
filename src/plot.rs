//! Figure rendering: mean lines with ±1 std bands, saved as PDF or SVG.

use crate::aggregate::{Series, SeriesPoint};
use crate::style::{dash_segments, LineStyle, Theme};
use anyhow::{anyhow, Context, Result};
use plotters::coord::Shift;
use plotters::element::{Drawable, PointCollection};
use plotters::prelude::*;
use plotters_backend::{BackendCoord, DrawingErrorKind};
use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use tracing::debug;

/// Text placed around the chart
#[derive(Debug, Clone, Default)]
pub struct FigureText {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
}

/// File format of the saved figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Vector PDF
    Pdf,
    /// Plain SVG
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Svg => "svg",
        }
    }
}

/// X range covering every series; a single x gets a unit-wide range
pub fn x_range(series: &[Series]) -> Range<f64> {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.xs())
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));

    if !lo.is_finite() {
        0.0..1.0
    } else if lo == hi {
        lo - 0.5..hi + 0.5
    } else {
        lo..hi
    }
}

/// Y range, always starting at 0
pub fn y_range(series: &[Series]) -> Range<f64> {
    let top = series
        .iter()
        .filter_map(Series::upper_extent)
        .fold(f64::NEG_INFINITY, f64::max);

    if top.is_finite() && top > 0.0 {
        0.0..top * 1.05
    } else {
        0.0..1.0
    }
}

/// Maximal runs of consecutive points satisfying `keep`
fn runs<'a>(points: &'a [SeriesPoint], keep: impl Fn(&SeriesPoint) -> bool) -> Vec<&'a [SeriesPoint]> {
    points
        .split(|p| !keep(p))
        .filter(|run| !run.is_empty())
        .collect()
}

/// Closed outline of the std band over one run, clipped to `y`
fn band_outline(run: &[SeriesPoint], y: &Range<f64>) -> Vec<(f64, f64)> {
    let clip = |v: f64| v.clamp(y.start, y.end);
    run.iter()
        .map(|p| (p.x, clip(p.mean + p.std)))
        .chain(run.iter().rev().map(|p| (p.x, clip(p.mean - p.std))))
        .collect()
}

const SWATCH_WIDTH: f64 = 24.0;

/// Legend sample of a line style: horizontal dashes stored as start/end pairs
struct Swatch {
    points: Vec<BackendCoord>,
    style: ShapeStyle,
}

impl Swatch {
    fn new(origin: BackendCoord, line: LineStyle, unit: f64, style: ShapeStyle) -> Self {
        let (x, y) = origin;
        let points = swatch_dashes(line, unit)
            .into_iter()
            .flat_map(|(a, b)| [(x + a, y), (x + b, y)])
            .collect();
        Self { points, style }
    }
}

/// Dash extents along a swatch, as pixel offsets from its left end
fn swatch_dashes(line: LineStyle, unit: f64) -> Vec<(i32, i32)> {
    let span = [(0.0, 0.0), (SWATCH_WIDTH, 0.0)];
    dash_segments(&span, &span, line.dash_pattern(), unit)
        .iter()
        .filter_map(|d| Some((d.first()?.0.round() as i32, d.last()?.0.round() as i32)))
        .collect()
}

impl<'a> PointCollection<'a, BackendCoord> for &'a Swatch {
    type Point = &'a BackendCoord;
    type IntoIter = &'a [BackendCoord];

    fn point_iter(self) -> Self::IntoIter {
        &self.points
    }
}

impl<DB: DrawingBackend> Drawable<DB> for Swatch {
    fn draw<I: Iterator<Item = BackendCoord>>(
        &self,
        pos: I,
        backend: &mut DB,
        _: (u32, u32),
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        let pos: Vec<BackendCoord> = pos.collect();
        for dash in pos.chunks_exact(2) {
            backend.draw_path(dash.iter().copied(), &self.style)?;
        }
        Ok(())
    }
}

/// Render all series into an SVG document
pub fn render_svg(series: &[Series], text: &FigureText, theme: &Theme) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, theme.size_px()).into_drawing_area();
        draw_figure(&root, series, text, theme)?;
        root.present()?;
    }
    Ok(svg)
}

fn draw_figure(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    series: &[Series],
    text: &FigureText,
    theme: &Theme,
) -> Result<()> {
    root.fill(&theme.background)?;

    let font = |points: f64| (theme.font_family, theme.px(points)).into_font().color(&theme.text);
    let xr = x_range(series);
    let yr = y_range(series);

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(10)
        .x_label_area_size(theme.px(theme.tick_size + theme.label_size) as u32 + 10)
        .y_label_area_size(theme.px(theme.tick_size * 2.0 + theme.label_size) as u32 + 10);
    if !text.title.is_empty() {
        builder.caption(&text.title, font(theme.title_size));
    }
    let mut chart = builder.build_cartesian_2d(xr, yr.clone())?;

    chart.plotting_area().fill(&theme.plot_background)?;
    chart
        .configure_mesh()
        .bold_line_style(theme.grid.stroke_width(1))
        .light_line_style(theme.plot_background)
        .axis_style(theme.plot_background)
        .x_labels(6)
        .y_labels(6)
        .x_desc(text.xlabel.as_str())
        .y_desc(text.ylabel.as_str())
        .label_style(font(theme.tick_size))
        .axis_desc_style(font(theme.label_size))
        .draw()?;

    let line_px = theme.px(theme.line_width);
    for (i, s) in series.iter().enumerate() {
        let color = theme.color(i);
        let style = LineStyle::cycle(i);
        let stroke = color.stroke_width(line_px.round() as u32);
        debug!(series = %s.label, style = style.name(), "drawing series");

        let band_fill = color.mix(theme.band_alpha).filled();
        for run in runs(&s.points, |p| p.mean.is_finite() && p.std.is_finite()) {
            chart.draw_series(std::iter::once(Polygon::new(band_outline(run, &yr), band_fill)))?;
        }

        for run in runs(&s.points, |p| p.mean.is_finite()) {
            let points: Vec<(f64, f64)> = run.iter().map(|p| (p.x, p.mean)).collect();
            let pixels: Vec<(f64, f64)> = points
                .iter()
                .map(|pt| {
                    let (x, y) = chart.backend_coord(pt);
                    (x as f64, y as f64)
                })
                .collect();
            let dashes = dash_segments(&points, &pixels, style.dash_pattern(), line_px);
            chart.draw_series(dashes.into_iter().map(|d| PathElement::new(d, stroke)))?;
        }

        chart
            .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())?
            .label(s.label.as_str())
            .legend(move |origin| Swatch::new(origin, style, line_px, stroke));
    }

    if !series.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(theme.plot_background)
            .label_font(font(theme.legend_size))
            .draw()?;
    }

    Ok(())
}

/// Write the figure as `<base>.<ext>` and return the written path
pub fn save_figure(svg: &str, base: &str, format: OutputFormat) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}.{}", base, format.extension()));

    match format {
        OutputFormat::Svg => fs::write(&path, svg),
        OutputFormat::Pdf => fs::write(&path, svg_to_pdf(svg)?),
    }
    .with_context(|| format!("Failed to write figure: {}", path.display()))?;

    Ok(path)
}

/// Convert an SVG document to a single-page vector PDF of the same extent
fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options).context("Failed to parse rendered SVG")?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| anyhow!("PDF conversion failed: {}", e))
}
