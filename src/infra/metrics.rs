// ============================================================
// Layer 6 — Run Logs
// ============================================================
// Three records are kept while training:
//
//   metrics.csv      — one row per epoch, appended as it happens
//                      epoch,train_loss,train_acc,test_loss,test_acc
//
//   all_scalars.json — every scalar keyed by "<run>/<tag>", each a
//                      list of [wall_time, step, value], the same
//                      shape as a TensorBoard scalar export
//
//   histograms.json  — per epoch and parameter: min, max, mean,
//                      std and bucketed counts of the values
//
// The two JSON files are written once, at the end of the run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const TAG_TRAIN_ACC:  &str = "Accuracy/Train Accuracy";
pub const TAG_TEST_ACC:   &str = "Accuracy/Test Accuracy";
pub const TAG_TRAIN_LOSS: &str = "Loss/Train Loss";
pub const TAG_TEST_LOSS:  &str = "Loss/Test Loss";

const HISTOGRAM_BUCKETS: usize = 30;

/// One row of metrics for a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number, starting at 0
    pub epoch: usize,
    /// Mean cross-entropy over training batches
    pub train_loss: f64,
    /// Fraction of training leptons classified correctly
    pub train_acc: f64,
    /// Mean cross-entropy over test batches
    pub test_loss: f64,
    /// Fraction of test leptons classified correctly
    pub test_acc: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, train_acc: f64, test_loss: f64, test_acc: f64) -> Self {
        Self { epoch, train_loss, train_acc, test_loss, test_acc }
    }

    /// Console line printed after every epoch
    pub fn summary_line(&self) -> String {
        format!(
            "Epoch: {:03}, Train Loss: {:0.4}, Train Acc: {:0.4}, Test Loss: {:0.4}, Test Acc: {:0.4}",
            self.epoch, self.train_loss, self.train_acc, self.test_loss, self.test_acc,
        )
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,train_acc,test_loss,test_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.train_acc, m.test_loss, m.test_acc,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── ScalarLog ────────────────────────────────────────────────────────────────
/// Tagged scalar series: tag → [(wall_time, step, value)]
#[derive(Debug, Default)]
pub struct ScalarLog {
    run:    String,
    series: BTreeMap<String, Vec<(f64, usize, f64)>>,
}

impl ScalarLog {
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into(), series: BTreeMap::new() }
    }

    pub fn add_scalar(&mut self, tag: &str, value: f64, step: usize) {
        let wall_time = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        self.series
            .entry(tag.to_string())
            .or_default()
            .push((wall_time, step, value));
    }

    /// Number of points recorded under `tag`
    pub fn len(&self, tag: &str) -> usize {
        self.series.get(tag).map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub fn values(&self, tag: &str) -> Vec<f64> {
        self.series
            .get(tag)
            .map(|points| points.iter().map(|(_, _, v)| *v).collect())
            .unwrap_or_default()
    }

    /// JSON object keyed by "<run>/<tag>"
    pub fn to_json(&self) -> serde_json::Value {
        let keyed: BTreeMap<String, &Vec<(f64, usize, f64)>> = self
            .series
            .iter()
            .map(|(tag, points)| (format!("{}/{}", self.run, tag), points))
            .collect();
        serde_json::json!(keyed)
    }

    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(&self.to_json())?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

// ─── Histograms ───────────────────────────────────────────────────────────────
/// Summary of one parameter tensor at one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub name:          String,
    pub step:          usize,
    pub min:           f64,
    pub max:           f64,
    pub mean:          f64,
    pub std:           f64,
    /// Upper edge of every bucket
    pub bucket_limits: Vec<f64>,
    pub bucket_counts: Vec<usize>,
}

impl Histogram {
    /// None for an empty parameter
    pub fn from_values(name: &str, step: usize, values: &[f32], buckets: usize) -> Option<Self> {
        if values.is_empty() || buckets == 0 {
            return None;
        }
        let n    = values.len() as f64;
        let min  = values.iter().fold(f64::INFINITY, |a, &v| a.min(v as f64));
        let max  = values.iter().fold(f64::NEG_INFINITY, |a, &v| a.max(v as f64));
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var  = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;

        let width = (max - min) / buckets as f64;
        let (bucket_limits, bucket_counts) = if width <= 0.0 {
            (vec![max], vec![values.len()])
        } else {
            let mut counts = vec![0usize; buckets];
            for &v in values {
                let idx = (((v as f64) - min) / width) as usize;
                counts[idx.min(buckets - 1)] += 1;
            }
            let limits = (1..=buckets).map(|i| min + width * i as f64).collect();
            (limits, counts)
        };

        Some(Self {
            name: name.to_string(),
            step,
            min,
            max,
            mean,
            std: var.sqrt(),
            bucket_limits,
            bucket_counts,
        })
    }
}

#[derive(Debug, Default)]
pub struct HistogramLog {
    entries: Vec<Histogram>,
}

impl HistogramLog {
    pub fn add(&mut self, name: &str, values: &[f32], step: usize) {
        if let Some(h) = Histogram::from_values(name, step, values, HISTOGRAM_BUCKETS) {
            self.entries.push(h);
        }
    }

    pub fn entries(&self) -> &[Histogram] {
        &self.entries
    }

    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(&self.entries)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

// ─── RunLogs ──────────────────────────────────────────────────────────────────
/// All logs for one training run, rooted in the output folder.
pub struct RunLogs {
    dir:            PathBuf,
    pub csv:        MetricsLogger,
    pub scalars:    ScalarLog,
    pub histograms: HistogramLog,
}

impl RunLogs {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let csv = MetricsLogger::new(&dir)?;
        let scalars = ScalarLog::new(dir.display().to_string());
        Ok(Self { dir, csv, scalars, histograms: HistogramLog::default() })
    }

    pub fn record_epoch(&mut self, m: &EpochMetrics) -> Result<()> {
        self.scalars.add_scalar(TAG_TRAIN_ACC, m.train_acc, m.epoch);
        self.scalars.add_scalar(TAG_TEST_ACC, m.test_acc, m.epoch);
        self.scalars.add_scalar(TAG_TRAIN_LOSS, m.train_loss, m.epoch);
        self.scalars.add_scalar(TAG_TEST_LOSS, m.test_loss, m.epoch);
        self.csv.log(m)
    }

    pub fn record_parameters(&mut self, epoch: usize, params: Vec<(String, Vec<f32>)>) {
        for (name, values) in params {
            self.histograms.add(&name, &values, epoch);
        }
    }

    /// Write all_scalars.json and histograms.json
    pub fn export(&self) -> Result<()> {
        self.scalars.export_json(self.dir.join("all_scalars.json"))?;
        self.histograms.export_json(self.dir.join("histograms.json"))?;
        tracing::info!(
            "Exported {} epochs of scalars and {} histograms to '{}' (per-epoch CSV: '{}')",
            self.scalars.len(TAG_TRAIN_LOSS),
            self.histograms.entries().len(),
            self.dir.display(),
            self.csv.csv_path().display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_format() {
        let m = EpochMetrics::new(3, 0.69314, 0.5, 0.7, 0.48);
        assert_eq!(
            m.summary_line(),
            "Epoch: 003, Train Loss: 0.6931, Train Acc: 0.5000, Test Loss: 0.7000, Test Acc: 0.4800"
        );
    }

    #[test]
    fn test_scalar_export_shape() {
        let mut log = ScalarLog::new("runs/a");
        log.add_scalar(TAG_TRAIN_LOSS, 0.9, 0);
        log.add_scalar(TAG_TRAIN_LOSS, 0.7, 1);

        let json   = log.to_json();
        let points = json["runs/a/Loss/Train Loss"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        // [wall_time, step, value]
        assert_eq!(points[1][1], 1);
        assert_eq!(points[1][2], 0.7);
        assert_eq!(log.values(TAG_TRAIN_LOSS), vec![0.9, 0.7]);
        assert_eq!(log.len(TAG_TEST_LOSS), 0);
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let values: Vec<f32> = (0..100).map(|i| i as f32 / 10.0).collect();
        let h = Histogram::from_values("w", 0, &values, 30).unwrap();
        assert_eq!(h.bucket_counts.iter().sum::<usize>(), 100);
        assert_eq!(h.bucket_limits.len(), 30);
        assert_eq!(h.min, 0.0);
        assert!((h.max - 9.9).abs() < 1e-6);
        assert!((h.mean - 4.95).abs() < 1e-6);
    }

    #[test]
    fn test_histogram_of_constant_parameter() {
        let h = Histogram::from_values("b", 2, &[0.0; 8], 30).unwrap();
        assert_eq!(h.bucket_counts, vec![8]);
        assert_eq!(h.std, 0.0);
        assert!(Histogram::from_values("e", 0, &[], 30).is_none());
    }

    #[test]
    fn test_run_logs_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut logs = RunLogs::new(dir.path()).unwrap();
        logs.record_epoch(&EpochMetrics::new(0, 0.7, 0.5, 0.69, 0.55)).unwrap();
        logs.record_parameters(0, vec![("output_layer.weight".into(), vec![0.1, -0.2])]);
        logs.export().unwrap();

        let csv = fs::read_to_string(logs.csv.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert_eq!(logs.scalars.len(TAG_TRAIN_LOSS), 1);
        assert_eq!(logs.histograms.entries().len(), 1);
        assert!(dir.path().join("all_scalars.json").exists());

        let hist: Vec<Histogram> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("histograms.json")).unwrap()).unwrap();
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].name, "output_layer.weight");
    }
}
