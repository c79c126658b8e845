//! Monte Carlo simulation configuration.
//!
//! [`MonteCarloConfig`] fixes how many paths are simulated and how they are cut
//! into batches. The batch layout is part of the result: batch `k` always draws
//! from sub-stream `k`, so changing `batch_size` changes the estimate for a given
//! seed while changing the worker count does not.

use serde::{Deserialize, Serialize};

use crate::core::PricingError;

/// Upper bound on the paths per batch.
pub const MAX_BATCH_SIZE: usize = 1 << 20;

/// Monte Carlo engine settings.
///
/// # Examples
///
/// ```
/// use ferric_options::engines::monte_carlo::MonteCarloConfig;
///
/// let config = MonteCarloConfig::builder()
///     .num_paths(200_000)
///     .batch_size(4_096)
///     .build()
///     .unwrap();
/// assert_eq!(config.num_batches(), 49);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of simulated terminal prices.
    pub num_paths: usize,
    /// Paths per batch; the last batch may be shorter.
    pub batch_size: usize,
    /// Run batches on the rayon pool when the `parallel` feature is enabled.
    pub parallel: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_paths: 50_000,
            batch_size: 8_192,
            parallel: true,
        }
    }
}

impl MonteCarloConfig {
    #[inline]
    pub fn builder() -> MonteCarloConfigBuilder {
        MonteCarloConfigBuilder::default()
    }

    /// Validates path and batch bounds. Any positive path count is accepted.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.num_paths == 0 {
            return Err(PricingError::invalid("num_paths must be > 0"));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(PricingError::invalid(format!(
                "batch_size must be in 1..={MAX_BATCH_SIZE}"
            )));
        }
        Ok(())
    }

    /// Number of batches the paths are split into.
    #[inline]
    pub fn num_batches(&self) -> usize {
        self.num_paths.div_ceil(self.batch_size)
    }

    /// Loads and validates a configuration from JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, PricingError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PricingError::invalid(format!("monte carlo config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`MonteCarloConfig`].
#[derive(Debug, Clone, Default)]
pub struct MonteCarloConfigBuilder {
    num_paths: Option<usize>,
    batch_size: Option<usize>,
    parallel: Option<bool>,
}

impl MonteCarloConfigBuilder {
    #[inline]
    pub fn num_paths(mut self, n: usize) -> Self {
        self.num_paths = Some(n);
        self
    }

    #[inline]
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    #[inline]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn build(self) -> Result<MonteCarloConfig, PricingError> {
        let defaults = MonteCarloConfig::default();
        let config = MonteCarloConfig {
            num_paths: self.num_paths.unwrap_or(defaults.num_paths),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            parallel: self.parallel.unwrap_or(defaults.parallel),
        };
        config.validate()?;
        Ok(config)
    }
}
