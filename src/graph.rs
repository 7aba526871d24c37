use crate::chart::{ChartType, RenderRequest, SeriesPoint};
use crate::palette::{ColorPalette, SERIES_COLOR};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::ops::Range;

/// Largest RGB buffer we render into (an 8192x8192 image)
const MAX_BUFFER_BYTES: usize = 8192 * 8192 * 3;

pub struct GraphConfig {
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            title: None,
            width: 800,
            height: 600,
        }
    }
}

/// Draw a chart and encode it as PNG.
///
/// Cells that are not numbers are left out of the drawing: no bar, no line
/// vertex, no slice.
pub fn render_chart(request: &RenderRequest, config: &GraphConfig) -> Result<Vec<u8>> {
    let points = request.points();
    if points.is_empty() {
        anyhow::bail!("Cannot create chart with no data points");
    }

    let buffer_len = (config.width as usize)
        .checked_mul(config.height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .filter(|len| *len > 0 && *len <= MAX_BUFFER_BYTES)
        .with_context(|| {
            format!(
                "Unsupported image size {}x{} (at most {} pixels)",
                config.width,
                config.height,
                MAX_BUFFER_BYTES / 3
            )
        })?;
    let mut buffer = vec![0u8; buffer_len];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (config.width, config.height))
            .into_drawing_area();

        root.fill(&WHITE)
            .context("Failed to fill background")?;

        let title = config.title.as_deref().unwrap_or("");
        match request.chart_type {
            ChartType::Bar => draw_bars(&root, title, request, &points)?,
            ChartType::Line => draw_line(&root, title, request, &points)?,
            ChartType::Pie => draw_pie(&root, title, &points)?,
        }

        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(
                &buffer,
                config.width,
                config.height,
                image::ColorType::Rgb8,
            )
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

fn draw_bars(
    root: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    request: &RenderRequest,
    points: &[SeriesPoint],
) -> Result<()> {
    let labels: Vec<String> = points.iter().map(|p| p.label.clone()).collect();
    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(category_range(points.len()), value_range(points, true))
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(points.len())
        .x_label_formatter(&|x| category_label(&labels, *x))
        .x_desc(request.x)
        .y_desc(request.y)
        .draw()
        .context("Failed to draw mesh")?;

    chart
        .draw_series(points.iter().enumerate().filter_map(|(i, p)| {
            let v = p.value?;
            let x = i as f64;
            Some(Rectangle::new([(x - 0.4, 0.0), (x + 0.4, v)], SERIES_COLOR.filled()))
        }))
        .context("Failed to draw bars")?;

    Ok(())
}

fn draw_line(
    root: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    request: &RenderRequest,
    points: &[SeriesPoint],
) -> Result<()> {
    let labels: Vec<String> = points.iter().map(|p| p.label.clone()).collect();
    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(category_range(points.len()), value_range(points, false))
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_labels(points.len())
        .x_label_formatter(&|x| category_label(&labels, *x))
        .x_desc(request.x)
        .y_desc(request.y)
        .draw()
        .context("Failed to draw mesh")?;

    let xy: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.value.map(|v| (i as f64, v)))
        .collect();

    chart
        .draw_series(LineSeries::new(xy.clone(), SERIES_COLOR.stroke_width(2)))
        .context("Failed to draw line series")?;
    chart
        .draw_series(xy.into_iter().map(|p| Circle::new(p, 3, SERIES_COLOR.filled())))
        .context("Failed to draw line markers")?;

    Ok(())
}

fn draw_pie(
    root: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    points: &[SeriesPoint],
) -> Result<()> {
    let area = root
        .titled(title, ("sans-serif", 20))
        .context("Failed to draw title")?;

    let slices: Vec<(usize, &SeriesPoint, f64)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.value.filter(|v| *v > 0.0).map(|v| (i, p, v)))
        .collect();
    let total: f64 = slices.iter().map(|(_, _, v)| v).sum();
    if total <= 0.0 {
        return Ok(());
    }

    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = width.min(height) as f64 * 0.35;
    let palette = ColorPalette::pie();

    let mut start = -PI / 2.0;
    for (i, point, value) in slices {
        let sweep = value / total * 2.0 * PI;
        let end = start + sweep;

        area.draw(&Polygon::new(
            sector(center, radius, start, end),
            palette.get_color(i).filled(),
        ))
        .context("Failed to draw pie slice")?;

        let mid = start + sweep / 2.0;
        let label = format!("{} ({:.0}%)", point.label, value / total * 100.0);
        area.draw(&Text::new(
            label,
            polar(center, radius * 1.15, mid),
            ("sans-serif", 14),
        ))
        .context("Failed to draw pie label")?;

        start = end;
    }

    Ok(())
}

/// One unit per category, centered on its index
fn category_range(count: usize) -> Range<f64> {
    -0.5..(count as f64 - 0.5)
}

fn category_label(labels: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Padded range over the finite values; bars always include zero
fn value_range(points: &[SeriesPoint], include_zero: bool) -> Range<f64> {
    let values = points.iter().filter_map(|p| p.value).filter(|v| v.is_finite());
    let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if min > max {
        return -1.0..1.0;
    }
    if include_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }

    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}

fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 + radius * angle.sin()).round() as i32,
    )
}

fn sector(center: (f64, f64), radius: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / (PI / 90.0)).ceil() as usize).max(1);
    let mut vertices = vec![(center.0.round() as i32, center.1.round() as i32)];
    vertices.extend((0..=steps).map(|s| {
        let angle = start + (end - start) * s as f64 / steps as f64;
        polar(center, radius, angle)
    }));
    vertices
}
