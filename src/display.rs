//! Interactive terminal view of the aggregated series using ratatui.

use crate::aggregate::Series;
use crate::plot::{x_range, y_range, FigureText};
use crate::style::Theme;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph},
    Frame, Terminal,
};
use std::io::{self, IsTerminal};
use std::ops::Range;
use std::time::Duration;
use tracing::warn;

/// Terminal-ready lines of one series
pub struct SeriesLines {
    pub label: String,
    pub color: Color,
    pub mean: Vec<(f64, f64)>,
    pub upper: Vec<(f64, f64)>,
    pub lower: Vec<(f64, f64)>,
}

impl SeriesLines {
    /// Finite points of `series`, with the band edges as separate lines
    pub fn from_series(series: &Series, color: Color) -> Self {
        let finite = series.points.iter().filter(|p| p.mean.is_finite());
        let banded = finite.clone().filter(|p| p.std.is_finite());
        Self {
            label: series.label.clone(),
            color,
            mean: finite.map(|p| (p.x, p.mean)).collect(),
            upper: banded.clone().map(|p| (p.x, p.mean + p.std)).collect(),
            lower: banded.map(|p| (p.x, (p.mean - p.std).max(0.0))).collect(),
        }
    }
}

/// Compact axis tick text
pub fn format_tick(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else if value.abs() >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn tick_labels(range: &Range<f64>) -> Vec<String> {
    let mid = (range.start + range.end) / 2.0;
    vec![format_tick(range.start), format_tick(mid), format_tick(range.end)]
}

/// Render the chart widget
pub fn render_chart(
    f: &mut Frame,
    area: Rect,
    lines: &[SeriesLines],
    text: &FigureText,
    xr: &Range<f64>,
    yr: &Range<f64>,
) {
    let mut datasets = Vec::new();
    for s in lines {
        let band_style = Style::default().fg(s.color).add_modifier(Modifier::DIM);
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(band_style)
                .data(&s.upper),
        );
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(band_style)
                .data(&s.lower),
        );
    }
    // mean lines last so they sit on top of the band edges
    for s in lines {
        datasets.push(
            Dataset::default()
                .name(s.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(s.color))
                .data(&s.mean),
        );
    }

    let title = if text.title.is_empty() {
        " trialplot ".to_string()
    } else {
        format!(" {} ", text.title)
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .x_axis(
            Axis::default()
                .title(Span::styled(text.xlabel.clone(), Style::default().fg(Color::Gray)))
                .style(Style::default().fg(Color::Gray))
                .bounds([xr.start, xr.end])
                .labels(tick_labels(xr)),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(text.ylabel.clone(), Style::default().fg(Color::Gray)))
                .style(Style::default().fg(Color::Gray))
                .bounds([yr.start, yr.end])
                .labels(tick_labels(yr)),
        )
        .legend_position(Some(LegendPosition::TopRight))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, area);
}

/// Render help bar at the bottom
pub fn render_help_bar(f: &mut Frame, area: Rect, series_count: usize) {
    let text = format!(" q/Esc: Quit | {} series ", series_count);
    let paragraph = Paragraph::new(text).style(Style::default().fg(Color::Black).bg(Color::Gray));
    f.render_widget(paragraph, area);
}

fn draw<B: Backend>(terminal: &mut Terminal<B>, lines: &[SeriesLines], text: &FigureText, xr: &Range<f64>, yr: &Range<f64>) -> Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(1)])
            .split(f.area());
        render_chart(f, chunks[0], lines, text, xr, yr);
        render_help_bar(f, chunks[1], lines.len());
    })?;
    Ok(())
}

/// Show the figure full-screen until the user quits.
///
/// Skipped with a warning when stdout is not a terminal.
pub fn show(series: &[Series], text: &FigureText, theme: &Theme) -> Result<()> {
    if !io::stdout().is_terminal() {
        warn!("stdout is not a terminal, skipping interactive display");
        return Ok(());
    }

    let lines: Vec<SeriesLines> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let c = theme.color(i);
            SeriesLines::from_series(s, Color::Rgb(c.0, c.1, c.2))
        })
        .collect();
    let xr = x_range(series);
    let yr = y_range(series);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &lines, text, &xr, &yr);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    lines: &[SeriesLines],
    text: &FigureText,
    xr: &Range<f64>,
    yr: &Range<f64>,
) -> Result<()> {
    loop {
        draw(terminal, lines, text, xr, yr)?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(())
}
