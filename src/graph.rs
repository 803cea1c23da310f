#![cfg(feature = "web")]
//! Static SVG snapshots of dashboard figures.
//!
//! The interactive page renders [`Figure`]s in the browser; this module draws
//! the same description server-side with `plotters` for consumers that
//! cannot run JavaScript (reports, e-mail, quick `curl` checks).

use crate::chart::{ChartKind, Figure, Layout};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::{FRAC_PI_2, TAU};
use thiserror::Error;

/// Size of the generated image
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to draw chart: {0}")]
    Draw(String),
}

type DrawResult = Result<(), Box<dyn std::error::Error>>;
type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

/// Draws `figure` and returns the SVG document.
///
/// Empty figures still produce a titled, empty chart.
///
/// # Examples
/// ```
/// use mall_dashboard::chart::{category_figure, CategoryChartType};
/// use mall_dashboard::graph::{render_svg, GraphOptions};
///
/// let figure = category_figure(&[], CategoryChartType::Bar);
/// let svg = render_svg(&figure, &GraphOptions::default()).unwrap();
/// assert!(svg.contains("<svg"));
/// ```
pub fn render_svg(figure: &Figure, options: &GraphOptions) -> Result<String, GraphError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        draw(&root, figure).map_err(|e| GraphError::Draw(e.to_string()))?;
        root.present()
            .map_err(|e| GraphError::Draw(e.to_string()))?;
    }
    Ok(svg)
}

fn draw(root: &Area<'_>, figure: &Figure) -> DrawResult {
    root.fill(&WHITE)?;
    match figure.kind {
        ChartKind::Line => draw_line(root, figure),
        ChartKind::Bar => draw_bars(root, figure),
        ChartKind::Scatter => draw_scatter(root, figure),
        ChartKind::Pie => draw_pie(root, figure),
    }
}

/// Line with markers over categorical (month) positions.
fn draw_line(root: &Area<'_>, figure: &Figure) -> DrawResult {
    let points = figure.points();
    let labels: Vec<String> = points.iter().map(|(x, _)| x.label()).collect();
    let values: Vec<f64> = points.iter().map(|(_, y)| y.as_f64().unwrap_or(0.0)).collect();
    let (y_min, y_max) = value_range(values.iter().copied());
    let x_max = labels.len().max(1) as f64 - 0.5;

    let mut chart = ChartBuilder::on(root)
        .caption(figure.title(), ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_title(&figure.layout))
        .y_desc(y_title(&figure.layout))
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|x| label_at(&labels, *x))
        .draw()?;

    chart.draw_series(LineSeries::new(
        values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
        &BLUE,
    ))?;
    chart.draw_series(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Circle::new((i as f64, *v), 4, BLUE.filled())),
    )?;

    Ok(())
}

/// Vertical bars, one per category, 0.8 units wide.
fn draw_bars(root: &Area<'_>, figure: &Figure) -> DrawResult {
    let points = figure.points();
    let labels: Vec<String> = points.iter().map(|(x, _)| x.label()).collect();
    let values: Vec<f64> = points.iter().map(|(_, y)| y.as_f64().unwrap_or(0.0)).collect();
    let (y_min, y_max) = value_range(values.iter().copied());
    let x_max = labels.len().max(1) as f64 - 0.5;

    let mut chart = ChartBuilder::on(root)
        .caption(figure.title(), ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_title(&figure.layout))
        .y_desc(y_title(&figure.layout))
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|x| label_at(&labels, *x))
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *v)], BLUE.filled())
    }))?;

    Ok(())
}

/// Points per trace, each trace in its own palette colour with a legend entry.
fn draw_scatter(root: &Area<'_>, figure: &Figure) -> DrawResult {
    let all = figure.points();
    let (x_min, x_max) = padded_range(all.iter().filter_map(|(x, _)| x.as_f64()));
    let (y_min, y_max) = value_range(all.iter().filter_map(|(_, y)| y.as_f64()));

    let mut chart = ChartBuilder::on(root)
        .caption(figure.title(), ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_title(&figure.layout))
        .y_desc(y_title(&figure.layout))
        .draw()?;

    for (idx, trace) in figure.data.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(f64, f64)> = trace
            .points()
            .iter()
            .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
            .collect();

        chart
            .draw_series(
                points
                    .into_iter()
                    .map(move |p| Circle::new(p, 5, color.filled())),
            )?
            .label(trace.name().unwrap_or_default().to_string())
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    if !figure.data.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

/// Slices drawn as polygons with a percentage label outside each slice.
fn draw_pie(root: &Area<'_>, figure: &Figure) -> DrawResult {
    let area = root.titled(figure.title(), ("sans-serif", 30).into_font())?;
    let (width, height) = area.dim_in_pixel();
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = f64::from(width.min(height)) * 0.35;

    let points = figure.points();
    let values: Vec<f64> = points
        .iter()
        .map(|(_, v)| v.as_f64().unwrap_or(0.0).max(0.0))
        .collect();
    let total: f64 = values.iter().sum();

    for (idx, (start, end)) in pie_slices(&values).into_iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let mut outline = vec![center];
        outline.extend(arc(center, radius, start, end));
        area.draw(&Polygon::new(outline, color.filled()))?;

        let mid = (start + end) / 2.0;
        let label_pos = polar(center, radius * 1.15, mid);
        let share = values[idx] / total * 100.0;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", points[idx].0.label(), share),
            label_pos,
            ("sans-serif", 14).into_font(),
        ))?;
    }

    Ok(())
}

fn x_title(layout: &Layout) -> &str {
    layout.xaxis.as_ref().map(|a| a.title.text.as_str()).unwrap_or("")
}

fn y_title(layout: &Layout) -> &str {
    layout.yaxis.as_ref().map(|a| a.title.text.as_str()).unwrap_or("")
}

/// Tick label for categorical position `x`; blank between categories.
fn label_at(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Value axis range: always includes zero, with 5% headroom above the max.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = (max - min).max(1.0);
    (min, max + span * 0.05)
}

/// Data range with 5% padding on both sides; `0..1` when there is no data.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let bounds = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });
    match bounds {
        None => (0.0, 1.0),
        Some((lo, hi)) => {
            let pad = ((hi - lo) * 0.05).max(1.0);
            (lo - pad, hi + pad)
        }
    }
}

/// Start and end angle (radians) of each slice, clockwise from twelve o'clock.
fn pie_slices(values: &[f64]) -> Vec<(f64, f64)> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut start = -FRAC_PI_2;
    values
        .iter()
        .map(|v| {
            let end = start + v / total * TAU;
            let slice = (start, end);
            start = end;
            slice
        })
        .collect()
}

fn arc(center: (i32, i32), radius: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / TAU) * 120.0).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|i| polar(center, radius, start + (end - start) * i as f64 / steps as f64))
        .collect()
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 + (radius * angle.sin()).round() as i32,
    )
}
