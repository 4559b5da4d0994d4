use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::display::monitor::MonitorSink;
use crate::error::PlotError;
use crate::types::{GaugeChannel, SeriesChannel};

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    pub frame: RGBColor,
    pub margin: u32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            background: RGBColor(0, 0, 0),
            trace: RGBColor(0, 255, 0),
            frame: RGBColor(40, 40, 40),
            margin: 6,
        }
    }
}

/// Renders the monitor as a PNG: waveform panels stacked on the left two
/// thirds, gauges as filled bars on the right.
pub fn render_dashboard_png(monitor: &MonitorSink, style: &PlotStyle) -> Result<Vec<u8>, PlotError> {
    if style.width < 3 || style.height < 4 {
        return Err(PlotError::Render(format!(
            "{}x{} is too small for the dashboard",
            style.width, style.height
        )));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let (waves, gauges) = root.split_horizontally(style.width * 2 / 3);
        let wave_areas = waves.split_evenly((SeriesChannel::ALL.len(), 1));
        for (area, channel) in wave_areas.iter().zip(SeriesChannel::ALL) {
            draw_series_panel(area, monitor, channel, style)?;
        }
        let gauge_areas = gauges.split_evenly((GaugeChannel::ALL.len(), 1));
        for (area, channel) in gauge_areas.iter().zip(GaugeChannel::ALL) {
            draw_gauge_panel(area, monitor, channel, style)?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn draw_series_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    monitor: &MonitorSink,
    channel: SeriesChannel,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let panel = monitor.layout().series_panel(channel);
    let frame = monitor.frame(channel);
    // Default interval, widened when the trace leaves it.
    let (mut y_lo, mut y_hi) = panel.y_range;
    if let Some((lo, hi)) = frame.value_bounds() {
        y_lo = y_lo.min(lo);
        y_hi = y_hi.max(hi);
    }
    if y_hi <= y_lo {
        y_hi = y_lo + 1.0;
    }
    let (x_lo, mut x_hi) = frame.x_range;
    if x_hi <= x_lo {
        x_hi = x_lo + 1.0;
    }
    draw_border(area, style)?;
    let mut chart = ChartBuilder::on(area)
        .margin(style.margin)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart.draw_series(LineSeries::new(
        frame.points.iter().map(|p| (p.time, p.value)),
        style.trace.stroke_width(2),
    ))?;
    Ok(())
}

fn draw_gauge_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    monitor: &MonitorSink,
    channel: GaugeChannel,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let panel = monitor.layout().gauge_panel(channel);
    let state = monitor.gauge(channel);
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    draw_border(area, style)?;
    let pad = style.margin as i32 * 2;
    let left = pad;
    let right = (w - pad).max(left + 1);
    let top = h / 2 - h / 8;
    let bottom = (h / 2 + h / 8).max(top + 1);
    area.draw(&Rectangle::new(
        [(left, top), (right, bottom)],
        style.frame.filled(),
    ))?;
    if let Some(value) = state.value {
        let filled = ((right - left) as f64 * panel.fraction(value)).round() as i32;
        area.draw(&Rectangle::new(
            [(left, top), (left + filled, bottom)],
            style.trace.filled(),
        ))?;
    }
    Ok(())
}

fn draw_border(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Rectangle::new(
        [(0, 0), (w as i32 - 1, h as i32 - 1)],
        style.frame.stroke_width(1),
    ))?;
    Ok(())
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PlotError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PlotError::Render("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
