use crate::error::SinkError;
use crate::types::{GaugeChannel, SeriesChannel};

/// Target that renders replayed samples.
///
/// Calls are synchronous; a returned error aborts the playback session.
pub trait DisplaySink {
    fn open(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Append ordered samples to a scrolling series. `times` and `values` are
    /// positionally aligned.
    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError>;

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError>;

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    fn open(&mut self) -> Result<(), SinkError> {
        (**self).open()
    }

    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError> {
        (**self).append_series(channel, times, values)
    }

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
        (**self).set_gauge_value(gauge, value)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn open(&mut self) -> Result<(), SinkError> {
        (**self).open()
    }

    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError> {
        (**self).append_series(channel, times, values)
    }

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
        (**self).set_gauge_value(gauge, value)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

/// A missing sink swallows every call.
impl<S: DisplaySink> DisplaySink for Option<S> {
    fn open(&mut self) -> Result<(), SinkError> {
        match self {
            Some(sink) => sink.open(),
            None => Ok(()),
        }
    }

    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError> {
        match self {
            Some(sink) => sink.append_series(channel, times, values),
            None => Ok(()),
        }
    }

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
        match self {
            Some(sink) => sink.set_gauge_value(gauge, value),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), SinkError> {
        match self {
            Some(sink) => sink.close(),
            None => Ok(()),
        }
    }
}

/// Fans every call out to two sinks, first `A` then `B`.
#[derive(Debug, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<A, B> Tee<A, B> {
    pub fn into_inner(self) -> (A, B) {
        (self.0, self.1)
    }
}

impl<A: DisplaySink, B: DisplaySink> DisplaySink for Tee<A, B> {
    fn open(&mut self) -> Result<(), SinkError> {
        self.0.open()?;
        self.1.open()
    }

    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError> {
        self.0.append_series(channel, times, values)?;
        self.1.append_series(channel, times, values)
    }

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
        self.0.set_gauge_value(gauge, value)?;
        self.1.set_gauge_value(gauge, value)
    }

    /// Both sinks are closed even if the first one fails; the first error wins.
    fn close(&mut self) -> Result<(), SinkError> {
        let first = self.0.close();
        let second = self.1.close();
        first.and(second)
    }
}
