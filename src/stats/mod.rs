//! Statistics over transaction prices: distribution quantiles and the
//! least-squares trend line.

pub mod quantiles;
pub mod regression;

pub use quantiles::{compute_quantiles, Quantiles};
pub use regression::{LinearFit, PlotPoint, RegressionLine};
