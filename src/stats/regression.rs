//! Ordinary least squares trend line.

use serde::{Deserialize, Serialize};

use crate::error::{StatsError, StatsResult};

/// A point in plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit the `(x[i], y[i])` pairs.
    ///
    /// slope     = (n·Σxy − Σx·Σy) / (n·Σxx − (Σx)²)
    /// intercept = ȳ − slope·x̄
    ///
    /// Fails with [`StatsError::RegressionUndefined`] when all x values are
    /// equal (including the single-point case), where the denominator is 0.
    pub fn fit(x: &[f64], y: &[f64]) -> StatsResult<Self> {
        let n = x.len().min(y.len());
        if n == 0 {
            return Err(StatsError::EmptyInput { field: "x" });
        }

        let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
        let (mut min_x, mut max_x) = (x[0], x[0]);
        for (&xi, &yi) in x.iter().zip(y) {
            sum_x += xi;
            sum_y += yi;
            sum_xx += xi * xi;
            sum_xy += xi * yi;
            min_x = min_x.min(xi);
            max_x = max_x.max(xi);
        }

        let nf = n as f64;
        let denominator = nf * sum_xx - sum_x * sum_x;
        if min_x == max_x || denominator == 0.0 {
            return Err(StatsError::RegressionUndefined { n });
        }

        let slope = (nf * sum_xy - sum_x * sum_y) / denominator;
        let intercept = sum_y / nf - slope * sum_x / nf;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(StatsError::RegressionUndefined { n });
        }
        Ok(LinearFit { slope, intercept })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Trend line handed to the plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionLine {
    /// No data points.
    Empty,
    /// Data present but no unique least-squares line exists.
    Undefined,
    Segment { from: PlotPoint, to: PlotPoint },
}

impl RegressionLine {
    /// Line across `[min(x), max(x)]` fitted to the pairs.
    pub fn through(x: &[f64], y: &[f64]) -> Self {
        match LinearFit::fit(x, y) {
            Ok(fit) => {
                let min_x = x.iter().copied().fold(f64::INFINITY, f64::min);
                let max_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                RegressionLine::Segment {
                    from: PlotPoint { x: min_x, y: fit.at(min_x) },
                    to: PlotPoint { x: max_x, y: fit.at(max_x) },
                }
            }
            Err(StatsError::EmptyInput { .. }) => RegressionLine::Empty,
            Err(StatsError::RegressionUndefined { .. }) => RegressionLine::Undefined,
        }
    }

    /// The segment's two end points, or nothing.
    pub fn points(&self) -> Vec<PlotPoint> {
        match self {
            RegressionLine::Segment { from, to } => vec![*from, *to],
            _ => Vec::new(),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, RegressionLine::Segment { .. })
    }
}
