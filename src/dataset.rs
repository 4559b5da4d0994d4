//! Loader for recorded vital-sign exports.
//!
//! The export is a headerless comma-separated table, one row per time tick.
//! Missing cells become `0.0` so every channel has the same length as the
//! time index, but each sample also keeps a presence flag: the gauge channels
//! (temperature, heart rate) are sampled far less often than the waveforms and
//! only carry a reading on some rows.

use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::types::{ChannelId, GaugeChannel, SeriesChannel};

/// Cell spellings treated as "no value", in addition to an empty cell. Same
/// list as pandas' default `na_values`, matched case-sensitively.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Which gauge samples count as "no new reading".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsentPolicy {
    /// Blank cells and literal zeros both mean "no reading". This is how the
    /// bedside export has always been replayed.
    #[default]
    ZeroOrBlank,
    /// Only blank cells are absent; a recorded zero is shown on the gauge.
    BlankOnly,
}

/// Assignment of file columns to channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<ChannelId>,
}

impl ColumnLayout {
    pub fn new(columns: Vec<ChannelId>) -> Result<Self, LoadError> {
        for (idx, id) in columns.iter().enumerate() {
            if columns[..idx].contains(id) {
                return Err(LoadError::DuplicateColumn(*id));
            }
        }
        if let Some(missing) = ChannelId::DEFAULT_LAYOUT
            .into_iter()
            .find(|id| !columns.contains(id))
        {
            return Err(LoadError::MissingColumn(missing));
        }
        Ok(Self { columns })
    }

    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self, LoadError> {
        let columns = keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                ChannelId::from_key(key).ok_or_else(|| LoadError::UnknownColumn(key.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ChannelId] {
        &self.columns
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            columns: ChannelId::DEFAULT_LAYOUT.to_vec(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub layout: ColumnLayout,
    pub absent_policy: AbsentPolicy,
}

/// One named signal, positionally aligned with the time index.
#[derive(Clone, Debug)]
pub struct Channel {
    id: ChannelId,
    values: Vec<f64>,
    present: Vec<bool>,
}

impl Channel {
    fn with_capacity(id: ChannelId, capacity: usize) -> Self {
        Self {
            id,
            values: Vec::with_capacity(capacity),
            present: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, value: f64, present: bool) {
        self.values.push(value);
        self.present.push(present);
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Values with absent samples filled in as `0.0`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reading(&self, index: usize) -> Option<f64> {
        match self.present.get(index) {
            Some(true) => self.values.get(index).copied(),
            _ => None,
        }
    }

    /// Present readings inside `range`, in order.
    pub fn readings(&self, range: Range<usize>) -> impl Iterator<Item = f64> + '_ {
        range.filter_map(move |idx| self.reading(idx))
    }

    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }
}

/// Loaded export: a time index plus six equally long channels.
#[derive(Clone, Debug)]
pub struct Dataset {
    time: Vec<f64>,
    series: [Channel; 4],
    gauges: [Channel; 2],
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with(path, &LoadOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file, options)?;
        info!(
            "loaded {} samples from {}",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Self, LoadError> {
        let layout = &options.layout;
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut builder = DatasetBuilder::new(options.absent_policy);
        let mut cells: Vec<Option<f64>> = vec![None; layout.width()];
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.len() != layout.width() {
                return Err(LoadError::ColumnCount {
                    line,
                    expected: layout.width(),
                    found: record.len(),
                });
            }
            for (column, raw) in record.iter().enumerate() {
                cells[column] = parse_cell(raw).ok_or_else(|| LoadError::InvalidNumber {
                    line,
                    column: column + 1,
                    value: raw.to_owned(),
                })?;
            }
            builder.push_row(layout, &cells);
        }
        Ok(builder.finish())
    }

    /// Number of samples, N.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn series(&self, channel: SeriesChannel) -> &Channel {
        &self.series[channel.index()]
    }

    pub fn gauge(&self, channel: GaugeChannel) -> &Channel {
        &self.gauges[channel.index()]
    }

    /// Numeric view of any column, time included.
    pub fn values(&self, id: ChannelId) -> &[f64] {
        match id {
            ChannelId::Time => &self.time,
            ChannelId::Ecg => self.series(SeriesChannel::Ecg).values(),
            ChannelId::Pleth => self.series(SeriesChannel::Pleth).values(),
            ChannelId::Art => self.series(SeriesChannel::Art).values(),
            ChannelId::Co2 => self.series(SeriesChannel::Co2).values(),
            ChannelId::Temperature => self.gauge(GaugeChannel::Temperature).values(),
            ChannelId::HeartRate => self.gauge(GaugeChannel::HeartRate).values(),
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        let channels = self
            .series
            .iter()
            .chain(self.gauges.iter())
            .map(ChannelSummary::of)
            .collect();
        DatasetSummary {
            samples: self.len(),
            time_start: self.time.first().copied(),
            time_end: self.time.last().copied(),
            channels,
        }
    }
}

/// Accumulates parsed rows into channels.
struct DatasetBuilder {
    policy: AbsentPolicy,
    time: Vec<f64>,
    series: [Channel; 4],
    gauges: [Channel; 2],
    decreasing_steps: usize,
}

impl DatasetBuilder {
    fn new(policy: AbsentPolicy) -> Self {
        Self {
            policy,
            time: Vec::new(),
            series: SeriesChannel::ALL.map(|c| Channel::with_capacity(c.channel_id(), 0)),
            gauges: GaugeChannel::ALL.map(|c| Channel::with_capacity(c.channel_id(), 0)),
            decreasing_steps: 0,
        }
    }

    fn push_row(&mut self, layout: &ColumnLayout, cells: &[Option<f64>]) {
        for (&id, cell) in layout.columns().iter().zip(cells) {
            let value = cell.unwrap_or(0.0);
            if let Some(gauge) = GaugeChannel::from_channel_id(id) {
                let present = match self.policy {
                    AbsentPolicy::ZeroOrBlank => value != 0.0,
                    AbsentPolicy::BlankOnly => cell.is_some(),
                };
                self.gauges[gauge.index()].push(value, present);
            } else if let Some(series) = SeriesChannel::from_channel_id(id) {
                self.series[series.index()].push(value, cell.is_some());
            } else {
                if self.time.last().is_some_and(|prev| value < *prev) {
                    self.decreasing_steps += 1;
                }
                self.time.push(value);
            }
        }
    }

    fn finish(self) -> Dataset {
        if self.decreasing_steps > 0 {
            warn!(
                "time index decreases {} times; samples are replayed in file order",
                self.decreasing_steps
            );
        }
        debug!(
            "dataset rows={} temperature readings={} heart-rate readings={}",
            self.time.len(),
            self.gauges[GaugeChannel::Temperature.index()].present_count(),
            self.gauges[GaugeChannel::HeartRate.index()].present_count()
        );
        Dataset {
            time: self.time,
            series: self.series,
            gauges: self.gauges,
        }
    }
}

/// `Some(None)` for a missing cell, `None` for an unparsable one.
fn parse_cell(raw: &str) -> Option<Option<f64>> {
    if raw.is_empty() || NA_MARKERS.contains(&raw) {
        return Some(None);
    }
    let value: f64 = raw.parse().ok()?;
    if value.is_nan() {
        Some(None)
    } else {
        Some(Some(value))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DatasetSummary {
    pub samples: usize,
    pub time_start: Option<f64>,
    pub time_end: Option<f64>,
    pub channels: Vec<ChannelSummary>,
}

/// Statistics over the present samples of one channel.
#[derive(Clone, Debug, Serialize)]
pub struct ChannelSummary {
    pub channel: ChannelId,
    pub present: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl ChannelSummary {
    fn of(channel: &Channel) -> Self {
        let readings: Vec<f64> = channel.readings(0..channel.len()).collect();
        let min = readings.iter().copied().reduce(f64::min);
        let max = readings.iter().copied().reduce(f64::max);
        let mean = if readings.is_empty() {
            None
        } else {
            Some(readings.iter().sum::<f64>() / readings.len() as f64)
        };
        Self {
            channel: channel.id(),
            present: readings.len(),
            min,
            max,
            mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
0,10,80,30,0.1,,
1,11,81,31,0.2,36.5,
2,,82,32,0.3,,72
3,13,83,33,0.4,0,0
";

    fn load(text: &str) -> Result<Dataset, LoadError> {
        Dataset::from_reader(text.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn loads_default_layout_with_equal_lengths() {
        let ds = load(SAMPLE).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.time(), &[0.0, 1.0, 2.0, 3.0]);
        for id in ChannelId::DEFAULT_LAYOUT {
            assert_eq!(ds.values(id).len(), 4, "{id}");
        }
        assert_eq!(ds.values(ChannelId::Ecg), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(ds.values(ChannelId::Art), &[80.0, 81.0, 82.0, 83.0]);
    }

    #[test]
    fn missing_cells_become_zero() {
        let ds = load(SAMPLE).unwrap();
        assert_eq!(ds.values(ChannelId::Co2), &[10.0, 11.0, 0.0, 13.0]);
        assert_eq!(ds.values(ChannelId::Temperature), &[0.0, 36.5, 0.0, 0.0]);
        assert_eq!(ds.series(SeriesChannel::Co2).reading(2), None);
        assert_eq!(ds.series(SeriesChannel::Co2).reading(3), Some(13.0));
    }

    #[test]
    fn gauge_zeros_are_absent_by_default() {
        let ds = load(SAMPLE).unwrap();
        let hr = ds.gauge(GaugeChannel::HeartRate);
        assert_eq!(hr.readings(0..4).collect::<Vec<_>>(), vec![72.0]);
        assert_eq!(ds.gauge(GaugeChannel::Temperature).present_count(), 1);
    }

    #[test]
    fn blank_only_policy_keeps_recorded_zeros() {
        let options = LoadOptions {
            absent_policy: AbsentPolicy::BlankOnly,
            ..LoadOptions::default()
        };
        let ds = Dataset::from_reader(SAMPLE.as_bytes(), &options).unwrap();
        let hr = ds.gauge(GaugeChannel::HeartRate);
        assert_eq!(hr.readings(0..4).collect::<Vec<_>>(), vec![72.0, 0.0]);
    }

    #[test]
    fn na_markers_are_missing() {
        let ds = load("0,NaN,1,2,3,NA,null\n1,nan,1,2,3,n/a,\n").unwrap();
        assert_eq!(ds.values(ChannelId::Co2), &[0.0, 0.0]);
        assert_eq!(ds.gauge(GaugeChannel::Temperature).present_count(), 0);

        let ds = load("0,<NA>,#NA,None,NULL,#N/A,-1.#IND\n").unwrap();
        assert_eq!(ds.series(SeriesChannel::Co2).present_count(), 0);
        assert_eq!(ds.series(SeriesChannel::Art).present_count(), 0);
        assert_eq!(ds.series(SeriesChannel::Pleth).present_count(), 0);
        assert_eq!(ds.series(SeriesChannel::Ecg).present_count(), 0);
    }

    #[test]
    fn na_markers_are_case_sensitive() {
        for cell in ["Null", "NONE", "n/A", "none"] {
            let err = load(&format!("0,{cell},1,2,3,,\n")).unwrap_err();
            match err {
                LoadError::InvalidNumber { line, column, value } => {
                    assert_eq!((line, column), (1, 2));
                    assert_eq!(value, cell);
                }
                other => panic!("unexpected error for {cell:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_column_count_is_a_schema_error() {
        let err = load("0,1,2,3,4,5,6\n1,1,2,3\n").unwrap_err();
        assert!(err.is_schema_error());
        match err {
            LoadError::ColumnCount {
                line,
                expected,
                found,
            } => {
                assert_eq!((line, expected, found), (2, 7, 4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_cell_is_a_load_error() {
        let err = load("0,1,2,3,4,5,6\n1,1,abc,3,4,5,6\n").unwrap_err();
        assert!(!err.is_schema_error());
        assert!(matches!(
            err,
            LoadError::InvalidNumber { line: 2, column: 3, .. }
        ));
    }

    #[test]
    fn empty_file_loads_as_zero_samples() {
        let ds = load("").unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.summary().time_start, None);
    }

    #[test]
    fn custom_layout_reorders_columns() {
        let layout = ColumnLayout::from_keys(&[
            "time",
            "ecg",
            "pleth",
            "art",
            "co2",
            "heart_rate",
            "temperature",
        ])
        .unwrap();
        let options = LoadOptions {
            layout,
            ..LoadOptions::default()
        };
        let ds = Dataset::from_reader("5,0.5,40,90,20,60,37\n".as_bytes(), &options).unwrap();
        assert_eq!(ds.values(ChannelId::Ecg), &[0.5]);
        assert_eq!(ds.gauge(GaugeChannel::HeartRate).reading(0), Some(60.0));
        assert_eq!(ds.gauge(GaugeChannel::Temperature).reading(0), Some(37.0));
    }

    #[test]
    fn layout_must_assign_every_channel_once() {
        let dup = ColumnLayout::from_keys(&["time", "ecg", "ecg"]).unwrap_err();
        assert!(matches!(dup, LoadError::DuplicateColumn(ChannelId::Ecg)));
        let missing = ColumnLayout::from_keys(&["time", "ecg"]).unwrap_err();
        assert!(missing.is_schema_error());
        let unknown = ColumnLayout::from_keys(&["spo2"]).unwrap_err();
        assert!(matches!(unknown, LoadError::UnknownColumn(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ds = Dataset::load(file.path()).unwrap();
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn summary_uses_present_samples_only() {
        let ds = load(SAMPLE).unwrap();
        let summary = ds.summary();
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.time_end, Some(3.0));
        let co2 = summary
            .channels
            .iter()
            .find(|c| c.channel == ChannelId::Co2)
            .unwrap();
        assert_eq!(co2.present, 3);
        assert_eq!(co2.min, Some(10.0));
        assert_eq!(co2.max, Some(13.0));
    }
}
