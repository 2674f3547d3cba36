//! Bar-chart figures.
//!
//! Figures are described by a [`FigureSpec`] built from the outcome profiles
//! and then drawn with plotters onto a bitmap or SVG backend. Sizes are given
//! in inches and scaled by the configured DPI, so fonts and margins are
//! expressed in points.

use crate::analysis::GroupProfile;
use crate::cli::ChartFormat;
use crate::models::{format_percent, OutcomesReport};
use crate::study::outcomes::{DISTRICT_FIGURE, HOSPITAL_FIGURE, URBAN_RURAL_FIGURE};
use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FALLBACK_COLOR: RGBColor = RGBColor(0x7F, 0x7F, 0x7F);
const MORTALITY_COLOR: RGBColor = RGBColor(0xE7, 0x4C, 0x3C);
const FONT: &str = "sans-serif";

/// One bar with its label and annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub annotation: String,
    pub color: RGBColor,
    pub opacity: f64,
}

/// A single bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarPanel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
    /// Upper bound of the value axis.
    pub y_max: f64,
    /// Relative width of each bar within its slot.
    pub bar_width: f64,
}

/// A figure made of side-by-side panels.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureSpec {
    /// File name without extension.
    pub stem: &'static str,
    pub title: Option<String>,
    pub panels: Vec<BarPanel>,
    pub footnote: Option<String>,
    /// Width and height in inches.
    pub size: (f64, f64),
}

impl FigureSpec {
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let dpi = f64::from(dpi);
        (
            (self.size.0 * dpi).round() as u32,
            (self.size.1 * dpi).round() as u32,
        )
    }

    pub fn has_bars(&self) -> bool {
        self.panels.iter().any(|p| !p.bars.is_empty())
    }
}

/// Parse `#RRGGBB`.
pub fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let digits = hex.trim().strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Value axis bound: 30% headroom over the tallest bar.
fn headroom(bars: &[Bar]) -> f64 {
    let max = bars.iter().map(|b| b.value).fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.3
    } else {
        1.0
    }
}

fn count_annotation(events: usize, total: usize, rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{}/{} ({:.1}%)", events, total, rate),
        None => "no data".to_string(),
    }
}

fn panel(title: &str, x_label: &str, y_label: &str, bars: Vec<Bar>, bar_width: f64) -> BarPanel {
    BarPanel {
        title: title.to_string(),
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        y_max: headroom(&bars),
        bars,
        bar_width,
    }
}

/// Hospital mortality and HIV prevalence, side by side.
pub fn hospital_figure(profiles: &[GroupProfile], colors: &BTreeMap<String, String>) -> FigureSpec {
    let color = |key: &str| {
        colors
            .get(key)
            .and_then(|hex| parse_hex_color(hex))
            .unwrap_or(FALLBACK_COLOR)
    };

    let mortality = profiles
        .iter()
        .map(|p| Bar {
            label: p.key.clone(),
            value: p.mortality.percent().unwrap_or(0.0),
            annotation: count_annotation(p.mortality.events, p.n_patients, p.mortality.percent()),
            color: color(&p.key),
            opacity: 0.8,
        })
        .collect();
    let hiv = profiles
        .iter()
        .map(|p| Bar {
            label: p.key.clone(),
            value: p.hiv.percent().unwrap_or(0.0),
            annotation: count_annotation(p.hiv.events, p.n_patients, p.hiv.percent()),
            color: color(&p.key),
            opacity: 0.8,
        })
        .collect();

    FigureSpec {
        stem: HOSPITAL_FIGURE,
        title: Some(
            "Hospital Catchment Area Analysis: Geographic Variation in CAP Outcomes".to_string(),
        ),
        panels: vec![
            panel(
                "30-Day Mortality by Hospital",
                "Hospital",
                "30-Day Mortality Rate (%)",
                mortality,
                0.7,
            ),
            panel(
                "HIV Prevalence by Hospital",
                "Hospital",
                "HIV Prevalence (%)",
                hiv,
                0.7,
            ),
        ],
        footnote: None,
        size: (12.0, 6.0),
    }
}

/// Mortality of the districts that meet the reporting minimum.
pub fn district_figure(profiles: &[GroupProfile], report_min: usize) -> FigureSpec {
    let bars = profiles
        .iter()
        .map(|p| Bar {
            label: format!("{} (n={})", p.key, p.n_patients),
            value: p.mortality.percent().unwrap_or(0.0),
            annotation: format_percent(p.mortality.percent()),
            color: MORTALITY_COLOR,
            opacity: 0.7,
        })
        .collect();

    FigureSpec {
        stem: DISTRICT_FIGURE,
        title: None,
        panels: vec![panel(
            "District-Level 30-Day Mortality Rates",
            "District (Sample Size)",
            "30-Day Mortality Rate (%)",
            bars,
            0.7,
        )],
        footnote: Some(format!("Only districts with >={} patients shown", report_min)),
        size: (10.0, 6.0),
    }
}

/// Urban versus rural mortality.
pub fn urban_rural_figure(profiles: &[GroupProfile]) -> FigureSpec {
    let bars = profiles
        .iter()
        .map(|p| Bar {
            label: p.key.clone(),
            value: p.mortality.percent().unwrap_or(0.0),
            annotation: count_annotation(p.mortality.events, p.n_patients, p.mortality.percent()),
            color: MORTALITY_COLOR,
            opacity: 0.7,
        })
        .collect();

    FigureSpec {
        stem: URBAN_RURAL_FIGURE,
        title: None,
        panels: vec![panel(
            "Urban vs Rural CAP Mortality Patterns",
            "Geographic Classification",
            "30-Day Mortality Rate (%)",
            bars,
            0.6,
        )],
        footnote: Some("Based on residence district classification".to_string()),
        size: (8.0, 6.0),
    }
}

/// Figures the report supports drawing. Figure 14 is left out when no
/// district qualifies.
pub fn outcome_figures(
    report: &OutcomesReport,
    colors: &BTreeMap<String, String>,
) -> Vec<FigureSpec> {
    let mut figures = Vec::new();
    if let Ok(hospitals) = &report.hospitals {
        figures.push(hospital_figure(hospitals, colors));
    }
    if let Ok(districts) = &report.districts {
        if !districts.is_empty() {
            figures.push(district_figure(districts, report.district_report_min));
        }
    }
    if let Ok(classes) = &report.urban_rural {
        figures.push(urban_rural_figure(classes));
    }
    figures.retain(FigureSpec::has_bars);
    figures
}

/// Options for [`render_figures`].
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub format: ChartFormat,
    pub dpi: u32,
    pub show_progress: bool,
}

/// Draw every figure into `dir`. Failures are logged and skipped; the
/// paths of the figures that were written are returned.
pub fn render_figures(figures: &[FigureSpec], dir: &Path, options: RenderOptions) -> Vec<PathBuf> {
    let progress = if options.show_progress {
        let pb = ProgressBar::new(figures.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut written = Vec::new();
    for figure in figures {
        progress.set_message(figure.stem);
        match render_figure(figure, dir, options.format, options.dpi) {
            Ok(path) => {
                info!("Saved {}", path.display());
                written.push(path);
            }
            Err(e) => warn!("Could not draw {}: {:#}", figure.stem, e),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    written
}

/// Draw one figure. Returns the file path.
pub fn render_figure(
    figure: &FigureSpec,
    dir: &Path,
    format: ChartFormat,
    dpi: u32,
) -> Result<PathBuf> {
    let path = dir.join(format!("{}.{}", figure.stem, format.extension()));
    let size = figure.pixel_size(dpi);
    let scale = Scale::new(dpi);
    debug!("Drawing {} at {}x{}", path.display(), size.0, size.1);

    match format {
        ChartFormat::Png => draw(figure, BitMapBackend::new(&path, size).into_drawing_area(), scale)?,
        ChartFormat::Svg => draw(figure, SVGBackend::new(&path, size).into_drawing_area(), scale)?,
    }

    Ok(path)
}

/// Converts points to pixels.
#[derive(Debug, Clone, Copy)]
struct Scale(f64);

impl Scale {
    fn new(dpi: u32) -> Self {
        Scale(f64::from(dpi) / 72.0)
    }

    fn pt(self, points: f64) -> f64 {
        points * self.0
    }

    fn px(self, points: f64) -> u32 {
        self.pt(points).round() as u32
    }
}

fn draw<DB: DrawingBackend>(
    figure: &FigureSpec,
    root: DrawingArea<DB, Shift>,
    scale: Scale,
) -> Result<()> {
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let body = match &figure.title {
        Some(title) => root
            .titled(
                title,
                (FONT, scale.pt(16.0)).into_font().style(FontStyle::Bold),
            )
            .map_err(|e| anyhow!("{:?}", e))?,
        None => root.clone(),
    };

    let (body, notes) = match &figure.footnote {
        Some(_) => {
            let (_, height) = body.dim_in_pixel();
            let (upper, lower) = body.split_vertically(height.saturating_sub(scale.px(24.0)));
            (upper, Some(lower))
        }
        None => (body, None),
    };

    let areas = body.split_evenly((1, figure.panels.len().max(1)));
    for (panel, area) in figure.panels.iter().zip(areas.iter()) {
        draw_panel(panel, area, scale)?;
    }

    if let (Some(note), Some(area)) = (&figure.footnote, notes) {
        let (width, _) = area.dim_in_pixel();
        let style = TextStyle::from((FONT, scale.pt(10.0)).into_font().style(FontStyle::Italic))
            .pos(Pos::new(HPos::Center, VPos::Top));
        area.draw(&Text::new(note.clone(), ((width / 2) as i32, 0), style))
            .map_err(|e| anyhow!("{:?}", e))?;
    }

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

/// Segment offset of the first bar and the last axis value for `bars` bars.
///
/// A discrete axis `0..n` has `n + 1` segments. A lone bar is centred in a
/// three-segment axis, since a one-value axis has no width to map onto.
fn slot_layout(bars: usize) -> (usize, usize) {
    match bars {
        0 | 1 => (1, 2),
        n => (0, n - 1),
    }
}

fn draw_panel<DB: DrawingBackend>(
    panel: &BarPanel,
    area: &DrawingArea<DB, Shift>,
    scale: Scale,
) -> Result<()> {
    if panel.bars.is_empty() {
        return Ok(());
    }
    let (offset, axis_max) = slot_layout(panel.bars.len());

    let mut chart = ChartBuilder::on(area)
        .caption(
            &panel.title,
            (FONT, scale.pt(14.0)).into_font().style(FontStyle::Bold),
        )
        .margin(scale.px(10.0))
        .x_label_area_size(scale.px(36.0))
        .y_label_area_size(scale.px(48.0))
        .build_cartesian_2d((0..axis_max).into_segmented(), 0f64..panel.y_max)
        .map_err(|e| anyhow!("{:?}", e))?;

    let label_of = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(i) => i
            .checked_sub(offset)
            .and_then(|i| panel.bars.get(i))
            .map(|b| b.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(axis_max + 1)
        .x_label_formatter(&label_of)
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .label_style((FONT, scale.pt(10.0)))
        .axis_desc_style((FONT, scale.pt(12.0)).into_font().style(FontStyle::Bold))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let (plot_width, _) = chart.plotting_area().dim_in_pixel();
    let slot_width = f64::from(plot_width) / (axis_max + 1) as f64;
    let margin = (slot_width * (1.0 - panel.bar_width) / 2.0).max(0.0) as u32;

    chart
        .draw_series(panel.bars.iter().enumerate().map(|(i, bar)| {
            let mut rect = Rectangle::new(
                [
                    (SegmentValue::Exact(i + offset), 0.0),
                    (SegmentValue::Exact(i + offset + 1), bar.value),
                ],
                bar.color.mix(bar.opacity).filled(),
            );
            rect.set_margin(0, 0, margin, margin);
            rect
        }))
        .map_err(|e| anyhow!("{:?}", e))?;

    let annotation_style = TextStyle::from((FONT, scale.pt(10.0)).into_font().style(FontStyle::Bold))
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    let lift = panel.y_max * 0.01;
    chart
        .draw_series(panel.bars.iter().enumerate().map(|(i, bar)| {
            Text::new(
                bar.annotation.clone(),
                (SegmentValue::CenterOf(i + offset), bar.value + lift),
                annotation_style.clone(),
            )
        }))
        .map_err(|e| anyhow!("{:?}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::profile::RateCell;

    fn profile(key: &str, n: usize, deaths: usize, hiv: usize) -> GroupProfile {
        GroupProfile {
            key: key.to_string(),
            n_patients: n,
            mortality: RateCell {
                events: deaths,
                total: n,
            },
            hiv: RateCell {
                events: hiv,
                total: n,
            },
            median_age: None,
        }
    }

    #[test]
    fn test_slot_layout_matches_bar_count() {
        // axis 0..n spans n + 1 segments
        assert_eq!(slot_layout(3), (0, 2));
        assert_eq!(slot_layout(2), (0, 1));
        // a lone bar sits in the middle of three segments
        assert_eq!(slot_layout(1), (1, 2));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#E31A1C"), Some(RGBColor(0xE3, 0x1A, 0x1C)));
        assert_eq!(parse_hex_color(" #1f78b4 "), Some(RGBColor(0x1F, 0x78, 0xB4)));
        assert_eq!(parse_hex_color("E31A1C"), None);
        assert_eq!(parse_hex_color("#E31A"), None);
        assert_eq!(parse_hex_color("#GGGGGG"), None);
    }

    #[test]
    fn test_hospital_figure() {
        let colors: BTreeMap<String, String> =
            [("Mulago".to_string(), "#E31A1C".to_string())].into_iter().collect();
        let figure = hospital_figure(
            &[profile("Mulago", 60, 10, 25), profile("Other", 40, 4, 10)],
            &colors,
        );

        assert_eq!(figure.panels.len(), 2);
        assert_eq!(figure.pixel_size(300), (3600, 1800));

        let mortality = &figure.panels[0];
        assert_eq!(mortality.bars[0].annotation, "10/60 (16.7%)");
        assert_eq!(mortality.bars[0].color, RGBColor(0xE3, 0x1A, 0x1C));
        assert_eq!(mortality.bars[1].color, FALLBACK_COLOR);
        assert!((mortality.y_max - 16.7 * 1.3).abs() < 1e-9);

        let hiv = &figure.panels[1];
        assert_eq!(hiv.bars[0].value, 41.7);
    }

    #[test]
    fn test_district_figure_labels() {
        let figure = district_figure(&[profile("Kampala", 70, 7, 0)], 20);
        let bar = &figure.panels[0].bars[0];

        assert_eq!(bar.label, "Kampala (n=70)");
        assert_eq!(bar.annotation, "10.0%");
        assert_eq!(
            figure.footnote.as_deref(),
            Some("Only districts with >=20 patients shown")
        );
    }

    #[test]
    fn test_zero_rates_keep_positive_axis() {
        let figure = urban_rural_figure(&[profile("Urban", 10, 0, 0)]);
        assert_eq!(figure.panels[0].y_max, 1.0);
        assert!(figure.has_bars());
    }

    #[test]
    fn test_empty_profiles_have_no_bars() {
        let figure = urban_rural_figure(&[]);
        assert!(!figure.has_bars());
    }
}
