use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::display::DisplaySink;
use crate::error::SinkError;
use crate::types::{GaugeChannel, SeriesChannel};

const HEADER: [&str; 5] = ["seq", "kind", "channel", "time", "value"];

#[derive(Serialize)]
struct Row<'a> {
    seq: u64,
    kind: &'a str,
    channel: &'a str,
    time: Option<f64>,
    value: f64,
}

/// Writes every delivered sample to CSV, one row per point or gauge reading.
///
/// Header: `seq,kind,channel,time,value`. Gauge rows leave `time` empty.
pub struct RecordingSink<W: Write> {
    writer: csv::Writer<W>,
    seq: u64,
    header_written: bool,
}

impl RecordingSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("recording playback to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordingSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(inner),
            seq: 0,
            header_written: false,
        }
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.seq
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(err.into_error()))
    }

    fn write_header(&mut self) -> Result<(), SinkError> {
        if !self.header_written {
            self.writer.write_record(HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write(
        &mut self,
        kind: &str,
        channel: &str,
        time: Option<f64>,
        value: f64,
    ) -> Result<(), SinkError> {
        self.write_header()?;
        self.writer.serialize(Row {
            seq: self.seq,
            kind,
            channel,
            time,
            value,
        })?;
        self.seq += 1;
        Ok(())
    }
}

impl<W: Write> DisplaySink for RecordingSink<W> {
    fn open(&mut self) -> Result<(), SinkError> {
        self.write_header()
    }

    fn append_series(
        &mut self,
        channel: SeriesChannel,
        times: &[f64],
        values: &[f64],
    ) -> Result<(), SinkError> {
        if times.len() != values.len() {
            return Err(SinkError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        let key = channel.channel_id().key();
        for (&time, &value) in times.iter().zip(values) {
            self.write("series", key, Some(time), value)?;
        }
        Ok(())
    }

    fn set_gauge_value(&mut self, gauge: GaugeChannel, value: f64) -> Result<(), SinkError> {
        self.write("gauge", gauge.channel_id().key(), None, value)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        info!("recording closed after {} rows", self.seq);
        Ok(())
    }
}
