// ============================================================
// Layer 6 — ROC Curve
// ============================================================
// Receiver operating characteristic of the isolated-class score.
//
// Leptons are sorted by score, highest first; the threshold is
// lowered past one distinct score at a time and the curve gets
// one point per threshold:
//
//   tpr = isolated leptons above threshold / all isolated
//   fpr = non-isolated above threshold     / all non-isolated
//
// Equal scores move both rates together, so ties draw a straight
// segment. The curve starts at (0,0), ends at (1,1), and the AUC
// is the trapezoid sum under it.

use anyhow::{bail, Context, Result};
use plotters::prelude::*;
use std::{fs, fmt::Write as _, path::Path};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocPoint {
    pub threshold: f32,
    pub fpr:       f64,
    pub tpr:       f64,
}

#[derive(Debug, Clone)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc:    f64,
}

impl RocCurve {
    /// Build the curve from aligned scores and truth flags.
    /// Fails unless both classes are present and every score is finite.
    pub fn compute(scores: &[f32], truth: &[bool]) -> Result<Self> {
        if scores.len() != truth.len() {
            bail!("{} scores but {} truth values", scores.len(), truth.len());
        }
        let n_bad = scores.iter().filter(|s| !s.is_finite()).count();
        if n_bad > 0 {
            bail!("{n_bad} non-finite scores, the network has diverged");
        }
        let n_pos = truth.iter().filter(|t| **t).count();
        let n_neg = truth.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            bail!("ROC needs both classes: {n_pos} isolated, {n_neg} non-isolated");
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut points = vec![RocPoint { threshold: f32::INFINITY, fpr: 0.0, tpr: 0.0 }];
        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;

        while i < order.len() {
            let threshold = scores[order[i]];
            // consume every lepton sharing this score
            while i < order.len() && scores[order[i]] == threshold {
                if truth[order[i]] { tp += 1 } else { fp += 1 }
                i += 1;
            }
            points.push(RocPoint {
                threshold,
                fpr: fp as f64 / n_neg as f64,
                tpr: tp as f64 / n_pos as f64,
            });
        }

        let auc = points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum();

        Ok(Self { points, auc })
    }

    /// threshold,fpr,tpr — one row per point
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = String::from("threshold,fpr,tpr\n");
        for p in &self.points {
            writeln!(out, "{},{:.6},{:.6}", p.threshold, p.fpr, p.tpr)?;
        }
        fs::write(path, out).with_context(|| format!("Cannot write '{}'", path.display()))
    }

    /// Draw the curve and the chance diagonal to a PNG.
    pub fn plot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let root = BitMapBackend::new(path, (640, 640)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow::anyhow!("ROC plot: {e}"))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .build_cartesian_2d(0f64..1f64, 0f64..1f64)
            .map_err(|e| anyhow::anyhow!("ROC plot: {e}"))?;

        chart
            .draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], &BLACK.mix(0.3)))
            .map_err(|e| anyhow::anyhow!("ROC plot: {e}"))?;
        chart
            .draw_series(LineSeries::new(
                self.points.iter().map(|p| (p.fpr, p.tpr)),
                BLUE.stroke_width(2),
            ))
            .map_err(|e| anyhow::anyhow!("ROC plot: {e}"))?;

        root.present()
            .map_err(|e| anyhow::anyhow!("Cannot write '{}': {e}", path.display()))?;
        tracing::debug!("ROC figure written to '{}'", path.display());
        Ok(())
    }
}
