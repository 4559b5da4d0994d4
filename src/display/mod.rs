// src/display/mod.rs
// Display side of playback: the sink seam plus the bundled in-memory monitor
pub mod buffer;
pub mod layout;
pub mod monitor;
pub mod plot;
pub mod sink;

pub use buffer::{SeriesBuffer, SeriesFrame, SeriesPoint};
pub use layout::{DashboardLayout, DisplayOverrides, GaugePanel, SeriesPanel};
pub use monitor::{GaugeState, MonitorSink};
pub use plot::{render_dashboard_png, PlotStyle};
pub use sink::{DisplaySink, Tee};
