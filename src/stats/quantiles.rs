//! Distribution summary of one numeric sample.

use serde::{Deserialize, Serialize};

/// Percentiles reported as cut points, in ascending order.
pub const CUT_POINT_PERCENTS: [usize; 5] = [10, 25, 50, 75, 90];

/// Min/max, cut points and moments of one sample.
///
/// Cut points use the nearest-rank-by-floor rule: the `p`th percentile of
/// `n` sorted values is `sorted[floor(n * p / 100)]`. No interpolation, so
/// every cut point is a member of the sample.
///
/// `min_x`/`max_x` are the time-axis bounds filled in by the basic plot
/// computation; the quantile computation itself leaves them at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantiles {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub q10: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub q90: f64,
    pub avg: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min_x: f64,
    pub max_x: f64,
}

impl Quantiles {
    /// Summarise `values`. NaN entries are ignored; an empty sample gives
    /// [`Quantiles::default`]. The input is not modified.
    pub fn compute(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let at = |percent: usize| sorted[n * percent / 100];

        let avg = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n as f64;

        Quantiles {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            q10: at(CUT_POINT_PERCENTS[0]),
            q25: at(CUT_POINT_PERCENTS[1]),
            q50: at(CUT_POINT_PERCENTS[2]),
            q75: at(CUT_POINT_PERCENTS[3]),
            q90: at(CUT_POINT_PERCENTS[4]),
            avg,
            std_dev: variance.sqrt(),
            min_x: 0.0,
            max_x: 0.0,
        }
    }

    /// Cut points matching [`CUT_POINT_PERCENTS`].
    pub fn cut_points(&self) -> [f64; 5] {
        [self.q10, self.q25, self.q50, self.q75, self.q90]
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Free-function form of [`Quantiles::compute`].
pub fn compute_quantiles(values: &[f64]) -> Quantiles {
    Quantiles::compute(values)
}
