//! Synthetic monitor exports for demos and tests.
//!
//! Rows follow the default column layout. Waveforms are sampled at
//! [`SAMPLE_RATE_HZ`]; temperature and heart rate carry a reading only once
//! every [`GAUGE_EVERY`] rows and are blank elsewhere, like the slow bedside
//! monitor columns in real exports.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SAMPLE_RATE_HZ: f64 = 500.0;
pub const GAUGE_EVERY: usize = 500;

/// One row in default layout order: time, CO2, ART, PLETH, ECG, temperature,
/// heart rate. `None` is written as an empty cell.
pub type SyntheticRow = [Option<f64>; 7];

struct Vitals {
    heart_rate: f64,
    temperature: f64,
    breaths_per_min: f64,
}

impl Vitals {
    fn beat_phase(&self, t: f64) -> f64 {
        (t * self.heart_rate / 60.0).fract()
    }

    fn ecg(&self, t: f64) -> f64 {
        let p = self.beat_phase(t);
        let bump = |center: f64, width: f64, height: f64| {
            height * (-((p - center) / width).powi(2)).exp()
        };
        // P wave, QRS spike, T wave
        bump(0.15, 0.03, 0.12) - bump(0.28, 0.008, 0.15) + bump(0.30, 0.012, 0.9)
            - bump(0.32, 0.008, 0.2)
            + bump(0.55, 0.05, 0.25)
    }

    fn pleth(&self, t: f64) -> f64 {
        let p = self.beat_phase(t - 0.2);
        40.0 + 12.0 * (2.0 * PI * p).sin().max(0.0) + 3.0 * (4.0 * PI * p).sin()
    }

    fn art(&self, t: f64) -> f64 {
        let p = self.beat_phase(t - 0.15);
        let systolic = (PI * (p / 0.35).min(1.0)).sin().max(0.0);
        let diastolic = (-(p - 0.35).max(0.0) * 3.0).exp();
        80.0 + 40.0 * systolic + 10.0 * diastolic
    }

    fn co2(&self, t: f64) -> f64 {
        let p = (t * self.breaths_per_min / 60.0).fract();
        // flat inspiration, plateau on expiration
        if p < 0.4 {
            2.0
        } else {
            35.0 + 4.0 * (p - 0.4)
        }
    }
}

/// Deterministic for a given `seed`.
pub fn generate(rows: usize, seed: u64) -> Vec<SyntheticRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut vitals = Vitals {
        heart_rate: rng.gen_range(60.0..90.0_f64),
        temperature: rng.gen_range(36.2..37.2_f64),
        breaths_per_min: rng.gen_range(10.0..16.0_f64),
    };
    (0..rows)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE_HZ;
            let gauges = i % GAUGE_EVERY == 0;
            if gauges && i > 0 {
                vitals.heart_rate =
                    (vitals.heart_rate + rng.gen_range(-2.0..2.0_f64)).clamp(45.0, 140.0);
                vitals.temperature =
                    (vitals.temperature + rng.gen_range(-0.05..0.05_f64)).clamp(35.0, 40.0);
            }
            [
                Some(t),
                Some(vitals.co2(t) + rng.gen_range(-0.3..0.3_f64)),
                Some(vitals.art(t) + rng.gen_range(-0.8..0.8_f64)),
                Some(vitals.pleth(t) + rng.gen_range(-0.4..0.4_f64)),
                Some(vitals.ecg(t) + rng.gen_range(-0.02..0.02_f64)),
                gauges.then(|| (vitals.temperature * 10.0).round() / 10.0),
                gauges.then(|| vitals.heart_rate.round()),
            ]
        })
        .collect()
}

/// Writes `rows` as a headerless export.
pub fn write_rows<W: Write>(writer: W, rows: &[SyntheticRow]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in rows {
        csv_writer.write_record(row.iter().map(|cell| match cell {
            Some(value) => format!("{value:.4}"),
            None => String::new(),
        }))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv(path: impl AsRef<Path>, rows: &[SyntheticRow]) -> Result<(), csv::Error> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_rows(BufWriter::new(file), rows)?;
    info!("wrote {} synthetic rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, LoadOptions};
    use crate::types::{GaugeChannel, SeriesChannel};

    #[test]
    fn same_seed_same_rows() {
        assert_eq!(generate(1200, 7), generate(1200, 7));
        assert_ne!(generate(1200, 7), generate(1200, 8));
    }

    #[test]
    fn gauges_are_sparse() {
        let rows = generate(1501, 1);
        let readings: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row[6].is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(readings, vec![0, 500, 1000, 1500]);
        assert!(rows.iter().all(|row| row[6].is_some() == row[5].is_some()));
    }

    #[test]
    fn waveforms_stay_near_display_ranges() {
        for row in generate(2000, 3) {
            let [_, co2, art, pleth, ecg, ..] = row.map(|c| c.unwrap_or(0.0));
            assert!((-1.0..55.0).contains(&co2));
            assert!((40.0..160.0).contains(&art));
            assert!((15.0..65.0).contains(&pleth));
            assert!((-0.6..1.2).contains(&ecg));
        }
    }

    #[test]
    fn written_export_loads_back() {
        let rows = generate(1100, 42);
        let mut bytes = Vec::new();
        write_rows(&mut bytes, &rows).unwrap();
        let ds = Dataset::from_reader(bytes.as_slice(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 1100);
        assert_eq!(ds.gauge(GaugeChannel::HeartRate).present_count(), 3);
        assert_eq!(ds.gauge(GaugeChannel::Temperature).present_count(), 3);
        assert_eq!(ds.series(SeriesChannel::Ecg).present_count(), 1100);
        assert_eq!(ds.time()[500], 1.0);
    }

    #[test]
    fn write_csv_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthetic.csv");
        write_csv(&path, &generate(10, 0)).unwrap();
        assert_eq!(Dataset::load(&path).unwrap().len(), 10);
    }
}
