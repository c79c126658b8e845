//! Terminal-value Monte Carlo under geometric Brownian motion.
//!
//! `S_T = S₀ exp((r - σ²/2) T + σ √T z)` with `z ~ N(0, 1)`; the price is the
//! discounted sample mean of the payoff. Paths are grouped into fixed-size
//! batches. Each run forks the supplied source once, then batch `k` draws from
//! sub-stream `k` of that fork and contributes one partial sum. Partial sums are
//! reduced in batch order, so the estimate for a given source state is the same
//! for any number of worker threads.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, debug_span, trace};

use crate::core::{
    DiagKey, Diagnostics, OptionContract, PricingEngine, PricingError, PricingResult,
};
use crate::engines::monte_carlo::{CancellationToken, MonteCarloConfig};
use crate::math::rng::{RandomNumberSource, SeededNormalRng};
use crate::payoff::{Payoff, VanillaPayoff};

/// Discounted Monte Carlo estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloResult {
    pub price: f64,
    /// Discounted standard error of the mean; NaN for a single path.
    pub stderr: f64,
    pub num_paths: usize,
    pub num_batches: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct BatchSum {
    sum: f64,
    sum_sq: f64,
    paths: usize,
}

/// GBM terminal-value constants of one run.
#[derive(Debug, Clone, Copy)]
struct Terminal {
    spot: f64,
    drift: f64,
    diffusion: f64,
}

impl Terminal {
    #[inline]
    fn at(&self, z: f64) -> f64 {
        self.spot * self.diffusion.mul_add(z, self.drift).exp()
    }
}

/// Monte Carlo pricing engine for European payoffs of the terminal price.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEngine {
    config: MonteCarloConfig,
    seed: Option<u64>,
    cancellation: Option<CancellationToken>,
}

impl MonteCarloEngine {
    /// Engine simulating `num_paths` paths with the default batch layout.
    pub fn new(num_paths: usize) -> Self {
        Self::with_config(MonteCarloConfig {
            num_paths,
            ..MonteCarloConfig::default()
        })
    }

    pub fn with_config(config: MonteCarloConfig) -> Self {
        Self {
            config,
            seed: None,
            cancellation: None,
        }
    }

    /// Seed used when pricing through [`PricingEngine`]; entropy otherwise.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[inline]
    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Discounted price of `payoff(S_T)`.
    pub fn price_value<P, R>(
        &self,
        spot: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
        payoff: &P,
        rng: &mut R,
    ) -> Result<f64, PricingError>
    where
        P: Payoff + ?Sized,
        R: RandomNumberSource + Sync,
    {
        self.simulate(spot, maturity, rate, volatility, payoff, rng)
            .map(|result| result.price)
    }

    /// Runs the simulation and returns the price with its standard error.
    ///
    /// # Errors
    /// - [`PricingError::InvalidParameter`] for non-finite inputs, `spot <= 0`,
    ///   `maturity <= 0`, `volatility < 0` or an invalid path configuration
    /// - [`PricingError::Cancelled`] if the cancellation token fires mid-run
    pub fn simulate<P, R>(
        &self,
        spot: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
        payoff: &P,
        rng: &mut R,
    ) -> Result<MonteCarloResult, PricingError>
    where
        P: Payoff + ?Sized,
        R: RandomNumberSource + Sync,
    {
        validate_market(spot, maturity, rate, volatility)?;
        self.config.validate()?;

        let num_paths = self.config.num_paths;
        let batch_size = self.config.batch_size;
        let num_batches = self.config.num_batches();
        let parallel = self.runs_in_parallel();
        let _span = debug_span!(
            "monte_carlo",
            spot,
            maturity,
            rate,
            volatility,
            num_paths,
            num_batches,
            parallel
        )
        .entered();

        let terminal = Terminal {
            spot,
            drift: (rate - 0.5 * volatility * volatility) * maturity,
            diffusion: volatility * maturity.sqrt(),
        };
        let discount = (-rate * maturity).exp();
        let source = rng.fork();

        let run_batch = |k: usize| -> Option<BatchSum> {
            if self.is_cancelled() {
                return None;
            }
            let start = k * batch_size;
            let paths = batch_size.min(num_paths - start);
            let mut stream = source.substream(k as u64);
            let mut normals = vec![0.0_f64; paths];
            stream.fill_standard_normal(&mut normals);

            let mut batch = BatchSum {
                paths,
                ..BatchSum::default()
            };
            for &z in &normals {
                let value = payoff.evaluate(terminal.at(z));
                batch.sum += value;
                batch.sum_sq = value.mul_add(value, batch.sum_sq);
            }
            trace!(batch = k, paths, sum = batch.sum, "batch complete");
            Some(batch)
        };

        let batches = collect_batches(num_batches, parallel, run_batch);

        let mut total = BatchSum::default();
        let mut cancelled = false;
        for batch in &batches {
            match batch {
                Some(b) => {
                    total.sum += b.sum;
                    total.sum_sq += b.sum_sq;
                    total.paths += b.paths;
                }
                None => cancelled = true,
            }
        }
        if cancelled {
            debug!(completed_paths = total.paths, "simulation cancelled");
            return Err(PricingError::Cancelled {
                completed_paths: total.paths,
            });
        }

        let n = total.paths as f64;
        let mean = total.sum / n;
        let stderr = if total.paths > 1 {
            let variance = ((total.sum_sq - total.sum * mean) / (n - 1.0)).max(0.0);
            discount * (variance / n).sqrt()
        } else {
            f64::NAN
        };
        let price = discount * mean;
        debug!(price, stderr, "monte carlo estimate");

        Ok(MonteCarloResult {
            price,
            stderr,
            num_paths: total.paths,
            num_batches,
        })
    }

    #[inline]
    fn runs_in_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.config.parallel && self.config.num_batches() > 1
    }

    #[inline]
    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

fn validate_market(
    spot: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
) -> Result<(), PricingError> {
    if !spot.is_finite() || spot <= 0.0 {
        return Err(PricingError::invalid("spot must be finite and > 0"));
    }
    if !maturity.is_finite() || maturity <= 0.0 {
        return Err(PricingError::invalid("maturity must be finite and > 0"));
    }
    if !rate.is_finite() {
        return Err(PricingError::invalid("rate must be finite"));
    }
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(PricingError::invalid("volatility must be finite and >= 0"));
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn collect_batches<F>(num_batches: usize, parallel: bool, run_batch: F) -> Vec<Option<BatchSum>>
where
    F: Fn(usize) -> Option<BatchSum> + Sync + Send,
{
    if parallel {
        (0..num_batches).into_par_iter().map(run_batch).collect()
    } else {
        (0..num_batches).map(run_batch).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn collect_batches<F>(num_batches: usize, _parallel: bool, run_batch: F) -> Vec<Option<BatchSum>>
where
    F: Fn(usize) -> Option<BatchSum>,
{
    (0..num_batches).map(run_batch).collect()
}

impl PricingEngine for MonteCarloEngine {
    fn price(&self, contract: &OptionContract) -> Result<PricingResult, PricingError> {
        if contract.exercise().is_american() {
            return Err(PricingError::invalid(
                "monte carlo engine supports European exercise only",
            ));
        }

        let mut rng = self
            .seed
            .map_or_else(SeededNormalRng::from_entropy, SeededNormalRng::new);
        let payoff = VanillaPayoff::from_contract(contract);
        let result = self.simulate(
            contract.spot(),
            contract.maturity(),
            contract.rate(),
            contract.volatility(),
            &payoff,
            &mut rng,
        )?;

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert(DiagKey::NumPaths, result.num_paths as f64);
        diagnostics.insert(DiagKey::NumBatches, result.num_batches as f64);
        diagnostics.insert(DiagKey::Vol, contract.volatility());
        diagnostics.insert(
            DiagKey::DiscountFactor,
            (-contract.rate() * contract.maturity()).exp(),
        );

        Ok(PricingResult {
            price: result.price,
            stderr: Some(result.stderr),
            diagnostics,
        })
    }
}
