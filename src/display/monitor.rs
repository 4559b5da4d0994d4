use log::debug;

use crate::display::buffer::{SeriesBuffer, SeriesFrame};
use crate::display::layout::DashboardLayout;
use crate::display::sink::DisplaySink;
use crate::error::SinkError;
use crate::types::{GaugeChannel, SeriesChannel};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GaugeState {
    pub value: Option<f64>,
    pub updates: u64,
}

/// In-memory model of the bedside dashboard.
///
/// Holds what a charting front end would display: a bounded scrolling buffer
/// per waveform panel and the latest value per gauge.
#[derive(Clone, Debug)]
pub struct MonitorSink {
    layout: DashboardLayout,
    series: [SeriesBuffer; 4],
    gauges: [GaugeState; 2],
    is_open: bool,
}

impl MonitorSink {
    pub fn new(layout: DashboardLayout) -> Self {
        let series = SeriesChannel::ALL
            .map(|channel| SeriesBuffer::with_capacity(layout.series_panel(channel).max_samples));
        Self {
            layout,
            series,
            gauges: [GaugeState::default(); 2],
            is_open: false,
        }
    }

    pub fn layout(&self) -> &DashboardLayout {
        &self.layout
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn series(&self, channel: SeriesChannel) -> &SeriesBuffer {
        &self.series[channel.index()]
    }

    /// Visible part of a waveform panel.
    pub fn frame(&self, channel: SeriesChannel) -> SeriesFrame {
        let window = self.layout.series_panel(channel).x_window;
        self.series(channel).frame(window)
    }

    pub fn gauge(&self, channel: GaugeChannel) -> GaugeState {
        self.gauges[channel.index()]
    }

    fn ensure_open(&self) -> Result<(), SinkError> {
        if self.is_open {
            Ok(())
        } else {
            Err(SinkError::NotOpen)
        }
    }
}

impl Default for MonitorSink {
    fn default() -> Self {
        Self::new(DashboardLayout::default())
    }
}

impl DisplaySink for MonitorSink {
    fn open(&mut self) -> Result<(), SinkError> {
        for buffer in &mut self.series {
            buffer.clear();
        }
        self.gauges = [GaugeState::default(); 2];
        self.is_open = true;
        debug!("monitor display opened");
        Ok(())
    }

    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError> {
        self.ensure_open()?;
        self.series[channel.index()].push_batch(times, values)
    }

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
        self.ensure_open()?;
        let state = &mut self.gauges[gauge.index()];
        state.value = Some(value);
        state.updates += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.ensure_open()?;
        self.is_open = false;
        debug!("monitor display closed");
        Ok(())
    }
}
