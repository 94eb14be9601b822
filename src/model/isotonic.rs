//! Isotonic regression for probability calibration
//!
//! Non-decreasing step fit via pool-adjacent-violators, evaluated with linear
//! interpolation between fitted points and clipped outside the fitted range.

use serde::{Deserialize, Serialize};

use crate::{QuinielaError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotonicRegression {
    /// Distinct inputs, ascending
    x: Vec<f64>,
    /// Fitted non-decreasing outputs for each input
    y: Vec<f64>,
}

impl IsotonicRegression {
    /// Fit a non-decreasing function of `x` to `y`.
    ///
    /// Non-finite inputs are ignored. Repeated `x` values are pooled into
    /// their mean target before the fit.
    pub fn fit(x: &[f64], y: &[f64]) -> Self {
        let mut points: Vec<(f64, f64)> = x
            .iter()
            .zip(y)
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(&a, &b)| (a, b))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        // (x, weighted target sum, weight) per distinct x
        let mut unique: Vec<(f64, f64, f64)> = Vec::with_capacity(points.len());
        for (px, py) in points {
            match unique.last_mut() {
                Some(last) if last.0 == px => {
                    last.1 += py;
                    last.2 += 1.0;
                }
                _ => unique.push((px, py, 1.0)),
            }
        }

        // Pool adjacent violators: blocks of (target sum, weight, point count)
        let mut blocks: Vec<(f64, f64, usize)> = Vec::with_capacity(unique.len());
        for &(_, sum, weight) in &unique {
            blocks.push((sum, weight, 1));
            while blocks.len() >= 2 {
                let n = blocks.len();
                let (prev, last) = (blocks[n - 2], blocks[n - 1]);
                if prev.0 / prev.1 <= last.0 / last.1 {
                    break;
                }
                blocks.truncate(n - 1);
                blocks[n - 2] = (prev.0 + last.0, prev.1 + last.1, prev.2 + last.2);
            }
        }

        let xs: Vec<f64> = unique.iter().map(|u| u.0).collect();
        let mut ys = Vec::with_capacity(xs.len());
        for (sum, weight, count) in blocks {
            ys.extend(std::iter::repeat(sum / weight).take(count));
        }

        IsotonicRegression { x: xs, y: ys }
    }

    /// Evaluate the fitted function; 0.0 if fitted on no points
    pub fn predict(&self, value: f64) -> f64 {
        let n = self.x.len().min(self.y.len());
        if n == 0 {
            return 0.0;
        }
        let (xs, ys) = (&self.x[..n], &self.y[..n]);

        if value.is_nan() || value <= xs[0] {
            return ys[0];
        }
        if value >= xs[n - 1] {
            return ys[n - 1];
        }

        let upper = xs.partition_point(|&x| x < value);
        if xs[upper] == value {
            return ys[upper];
        }
        let lower = upper - 1;
        let (x0, x1) = (xs[lower], xs[upper]);
        let (y0, y1) = (ys[lower], ys[upper]);
        y0 + (y1 - y0) * (value - x0) / (x1 - x0)
    }

    /// Check a deserialized fit: paired finite points with strictly ascending inputs
    pub fn validate(&self) -> Result<()> {
        if self.x.len() != self.y.len() {
            return Err(QuinielaError::Model(format!(
                "calibrator has {} inputs but {} outputs",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.iter().chain(&self.y).any(|v| !v.is_finite()) {
            return Err(QuinielaError::Model(
                "calibrator holds non-finite points".to_string(),
            ));
        }
        if self.x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(QuinielaError::Model(
                "calibrator inputs are not strictly ascending".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of distinct fitted points
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
