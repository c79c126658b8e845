//! Numerical helpers: random sources and the standard normal CDF.

use statrs::function::erf::erfc;

pub mod rng;

pub use rng::{GeneratorKind, RandomNumberSource, SeededNormalRng, stream_seed};

/// Standard normal CDF via `erfc`, accurate in both tails.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}
