//! Figure theme, series colors and line styles.
//!
//! Everything here is plain configuration handed to the renderer; nothing is
//! process-global, so two figures built in one process cannot interfere.

use plotters::style::RGBColor;

/// Colorblind-safe palette; series `i` gets `COLORBLIND[i % 4]`
pub const COLORBLIND: [RGBColor; 4] = [
    RGBColor(0x01, 0x73, 0xB2),
    RGBColor(0xDE, 0x8F, 0x05),
    RGBColor(0x02, 0x9E, 0x73),
    RGBColor(0xD5, 0x5E, 0x00),
];

/// Stroke pattern of a mean line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    DashDot,
    Dashed,
    Dotted,
}

impl LineStyle {
    const CYCLE: [LineStyle; 4] = [
        LineStyle::Solid,
        LineStyle::DashDot,
        LineStyle::Dashed,
        LineStyle::Dotted,
    ];

    /// Style of the `index`-th plotted series
    pub fn cycle(index: usize) -> Self {
        Self::CYCLE[index % Self::CYCLE.len()]
    }

    /// On/off lengths in multiples of the line width; empty for solid
    pub fn dash_pattern(self) -> &'static [f64] {
        match self {
            LineStyle::Solid => &[],
            LineStyle::DashDot => &[6.4, 1.6, 1.0, 1.6],
            LineStyle::Dashed => &[3.7, 1.6],
            LineStyle::Dotted => &[1.0, 1.65],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LineStyle::Solid => "solid",
            LineStyle::DashDot => "dash-dot",
            LineStyle::Dashed => "dashed",
            LineStyle::Dotted => "dotted",
        }
    }
}

/// Visual configuration of a figure
#[derive(Debug, Clone)]
pub struct Theme {
    /// Figure size in inches
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: f64,

    pub background: RGBColor,
    pub plot_background: RGBColor,
    pub grid: RGBColor,
    pub text: RGBColor,
    pub font_family: &'static str,

    /// Font sizes in points
    pub title_size: f64,
    pub label_size: f64,
    pub tick_size: f64,
    pub legend_size: f64,

    /// Line width in points
    pub line_width: f64,
    pub band_alpha: f64,

    pub palette: [RGBColor; 4],
}

impl Default for Theme {
    /// Dark-grid theme
    fn default() -> Self {
        Self {
            width_in: 7.2,
            height_in: 4.45,
            dpi: 100.0,
            background: RGBColor(255, 255, 255),
            plot_background: RGBColor(234, 234, 242),
            grid: RGBColor(255, 255, 255),
            text: RGBColor(38, 38, 38),
            font_family: "sans-serif",
            title_size: 16.0,
            label_size: 17.0,
            tick_size: 16.0,
            legend_size: 15.0,
            line_width: 2.0,
            band_alpha: 0.25,
            palette: COLORBLIND,
        }
    }
}

impl Theme {
    /// Points to pixels at the theme's resolution
    pub fn px(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }

    /// Figure size in pixels
    pub fn size_px(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    /// Color of the `index`-th plotted series
    pub fn color(&self, index: usize) -> RGBColor {
        self.palette[index % self.palette.len()]
    }
}

/// Split a polyline into the visible dashes of a repeating pattern.
///
/// `points` are in data space and `pixels` are the same points in backend
/// space; dash lengths are measured in pixels and the cut points are
/// interpolated back in data space. An empty pattern returns the whole line.
pub fn dash_segments(
    points: &[(f64, f64)],
    pixels: &[(f64, f64)],
    pattern: &[f64],
    unit: f64,
) -> Vec<Vec<(f64, f64)>> {
    if points.len() < 2 || pattern.is_empty() {
        return if points.is_empty() { Vec::new() } else { vec![points.to_vec()] };
    }

    let lengths: Vec<f64> = pattern.iter().map(|p| (p * unit).max(f64::EPSILON)).collect();
    let mut segments = Vec::new();
    let mut current: Vec<(f64, f64)> = vec![points[0]];
    let mut slot = 0;
    let mut remaining = lengths[0];

    for i in 1..points.len() {
        let (a, b) = (points[i - 1], points[i]);
        let (pa, pb) = (pixels[i - 1], pixels[i]);
        let seg_len = ((pb.0 - pa.0).powi(2) + (pb.1 - pa.1).powi(2)).sqrt();
        let mut travelled = 0.0;

        while seg_len - travelled > remaining {
            travelled += remaining;
            let t = travelled / seg_len;
            let cut = (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);

            // even slots draw, odd slots skip
            if slot % 2 == 0 {
                current.push(cut);
                segments.push(std::mem::take(&mut current));
            } else {
                current = vec![cut];
            }
            slot = (slot + 1) % lengths.len();
            remaining = lengths[slot];
        }

        remaining -= seg_len - travelled;
        if slot % 2 == 0 {
            current.push(b);
        }
    }

    if slot % 2 == 0 && current.len() >= 2 {
        segments.push(current);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_have_period_four() {
        let theme = Theme::default();
        for i in 0..12 {
            assert_eq!(theme.color(i), theme.color(i + 4));
            assert_eq!(LineStyle::cycle(i), LineStyle::cycle(i + 4));
        }
        assert_eq!(LineStyle::cycle(0), LineStyle::Solid);
        assert_eq!(LineStyle::cycle(1), LineStyle::DashDot);
        assert_eq!(LineStyle::cycle(2), LineStyle::Dashed);
        assert_eq!(LineStyle::cycle(3), LineStyle::Dotted);
        assert_eq!(theme.color(4), COLORBLIND[0]);
    }

    #[test]
    fn test_figure_size() {
        assert_eq!(Theme::default().size_px(), (720, 445));
    }

    #[test]
    fn test_solid_is_single_segment() {
        let pts = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)];
        let segs = dash_segments(&pts, &pts, LineStyle::Solid.dash_pattern(), 2.0);
        assert_eq!(segs, vec![pts]);
    }

    #[test]
    fn test_dashes_split_straight_line() {
        // 10px line, 2px on / 3px off -> dashes at [0,2] and [5,7]
        let pts = vec![(0.0, 0.0), (10.0, 0.0)];
        let segs = dash_segments(&pts, &pts, &[2.0, 3.0], 1.0);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], vec![(0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(segs[1], vec![(5.0, 0.0), (7.0, 0.0)]);
    }

    #[test]
    fn test_dash_carries_across_vertices() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        let segs = dash_segments(&pts, &pts, &[1.5, 10.0], 1.0);
        assert_eq!(segs, vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.5)]]);
    }

    #[test]
    fn test_dash_scales_with_data_space() {
        // data spans 0..1 while pixels span 0..100
        let pts = vec![(0.0, 0.0), (1.0, 0.0)];
        let px = vec![(0.0, 0.0), (100.0, 0.0)];
        let segs = dash_segments(&pts, &px, &[25.0, 25.0], 1.0);
        assert_eq!(segs.len(), 2);
        assert!((segs[1][0].0 - 0.5).abs() < 1e-12);
    }
}
