//! Module `engines::tree::binomial`.
//!
//! Cox-Ross-Rubinstein lattice with backward induction (Cox, Ross and Rubinstein 1979;
//! Hull, 11th ed., Ch. 13).
//!
//! Key types: [`LatticeParameters`] holds the per-step up/down factors, the
//! risk-neutral probability and the discount; [`BinomialTreeEngine`] runs the
//! induction for European and American vanillas in `O(steps²)` time and `O(steps)`
//! memory.
//!
//! Numerical considerations: convergence to the continuous-time price is first
//! order in the step count with the usual odd/even oscillation. Nodes inside a step
//! are swept in fixed-size blocks whose spot levels are recomputed from `S₀` at
//! every block start, so the sequential and the rayon sweep produce bit-identical
//! prices.
//!
//! When to use: American exercise, or as an independent check on the closed form
//! and the Monte Carlo estimate for European vanillas.

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::core::{
    DiagKey, Diagnostics, OptionContract, OptionType, PricingEngine, PricingError, PricingResult,
};

/// Nodes per sweep block.
const BLOCK: usize = 256;

/// Upper bound on the step count; keeps node exponents `2j - n` inside `i32`.
pub const MAX_STEPS: usize = 100_000_000;

/// Derived CRR lattice quantities for a contract and a step count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeParameters {
    /// Step length `T / n`.
    pub dt: f64,
    /// Up factor `exp(σ √dt)`.
    pub u: f64,
    /// Down factor `1 / u`.
    pub d: f64,
    /// Per-step growth `exp(r dt)`.
    pub growth: f64,
    /// Risk-neutral up probability `(growth - d) / (u - d)`.
    pub p: f64,
    /// Per-step discount `exp(-r dt)`.
    pub discount: f64,
}

impl LatticeParameters {
    /// Derives the lattice for `contract` with `steps` time steps.
    ///
    /// # Errors
    /// - [`PricingError::InvalidParameter`] if `steps == 0`
    /// - [`PricingError::ArbitrageViolation`] if `p` is not a finite value in `[0, 1]`
    ///   (for instance zero volatility with a positive rate)
    pub fn new(contract: &OptionContract, steps: usize) -> Result<Self, PricingError> {
        if steps == 0 {
            return Err(PricingError::invalid("binomial steps must be > 0"));
        }
        if steps > MAX_STEPS {
            return Err(PricingError::invalid(format!(
                "binomial steps must be <= {MAX_STEPS}"
            )));
        }

        let dt = contract.maturity() / steps as f64;
        let u = (contract.volatility() * dt.sqrt()).exp();
        let d = 1.0 / u;
        let growth = (contract.rate() * dt).exp();
        let p = (growth - d) / (u - d);
        if !(0.0..=1.0).contains(&p) || !p.is_finite() {
            return Err(PricingError::ArbitrageViolation { probability: p });
        }
        let discount = (-contract.rate() * dt).exp();

        Ok(Self {
            dt,
            u,
            d,
            growth,
            p,
            discount,
        })
    }
}

/// Lattice engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinomialConfig {
    /// Number of time steps.
    pub steps: usize,
    /// Minimum nodes in a step before it is swept on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for BinomialConfig {
    fn default() -> Self {
        Self {
            steps: 200,
            parallel_threshold: 4_096,
        }
    }
}

impl BinomialConfig {
    #[inline]
    pub fn builder() -> BinomialConfigBuilder {
        BinomialConfigBuilder::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.steps == 0 || self.steps > MAX_STEPS {
            return Err(PricingError::invalid(format!(
                "binomial steps must be in 1..={MAX_STEPS}"
            )));
        }
        if self.parallel_threshold == 0 {
            return Err(PricingError::invalid("parallel_threshold must be > 0"));
        }
        Ok(())
    }

    /// Loads and validates a configuration from JSON; omitted fields keep their defaults.
    ///
    /// ```
    /// use ferric_options::engines::tree::BinomialConfig;
    ///
    /// let config = BinomialConfig::from_json(r#"{ "steps": 1000 }"#).unwrap();
    /// assert_eq!(config.steps, 1000);
    /// assert_eq!(config.parallel_threshold, BinomialConfig::default().parallel_threshold);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, PricingError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PricingError::invalid(format!("binomial config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`BinomialConfig`].
#[derive(Debug, Clone, Default)]
pub struct BinomialConfigBuilder {
    steps: Option<usize>,
    parallel_threshold: Option<usize>,
}

impl BinomialConfigBuilder {
    #[inline]
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = Some(steps);
        self
    }

    #[inline]
    pub fn parallel_threshold(mut self, nodes: usize) -> Self {
        self.parallel_threshold = Some(nodes);
        self
    }

    pub fn build(self) -> Result<BinomialConfig, PricingError> {
        let defaults = BinomialConfig::default();
        let config = BinomialConfig {
            steps: self.steps.unwrap_or(defaults.steps),
            parallel_threshold: self.parallel_threshold.unwrap_or(defaults.parallel_threshold),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Cox-Ross-Rubinstein binomial tree engine.
#[derive(Debug, Clone, Default)]
pub struct BinomialTreeEngine {
    config: BinomialConfig,
}

/// Per-run constants shared by every block of the sweep.
struct Sweep {
    option_type: OptionType,
    american: bool,
    spot: f64,
    strike: f64,
    u: f64,
    ratio: f64,
    disc_p: f64,
    disc_1mp: f64,
}

impl Sweep {
    /// Spot level of node `j` at step `step`: `S₀ u^j d^(step - j) = S₀ u^(2j - step)`.
    #[inline]
    fn level(&self, step: usize, j: usize) -> f64 {
        // Both fit in i32: steps <= MAX_STEPS.
        self.spot * self.u.powi(2 * j as i32 - step as i32)
    }

    fn terminal_block(&self, steps: usize, start: usize, out: &mut [f64]) {
        let mut st = self.level(steps, start);
        for value in out {
            *value = self.option_type.intrinsic(st, self.strike);
            st *= self.ratio;
        }
    }

    /// Rolls the level `step + 1` values in `prev` back onto nodes
    /// `start..start + out.len()` of `step`.
    fn induction_block(&self, step: usize, start: usize, prev: &[f64], out: &mut [f64]) {
        let window = &prev[start..=start + out.len()];
        if self.american {
            let mut st = self.level(step, start);
            for (k, value) in out.iter_mut().enumerate() {
                let continuation = self.disc_p.mul_add(window[k + 1], self.disc_1mp * window[k]);
                let exercise = self.option_type.intrinsic(st, self.strike);
                *value = continuation.max(exercise);
                st *= self.ratio;
            }
        } else {
            for (k, value) in out.iter_mut().enumerate() {
                *value = self.disc_p.mul_add(window[k + 1], self.disc_1mp * window[k]);
            }
        }
    }
}

impl BinomialTreeEngine {
    /// Creates a tree engine with the given number of steps.
    pub fn new(steps: usize) -> Self {
        Self {
            config: BinomialConfig {
                steps,
                ..BinomialConfig::default()
            },
        }
    }

    pub fn with_config(config: BinomialConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &BinomialConfig {
        &self.config
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.config.steps
    }

    /// Prices `contract`, returning the bare present value.
    pub fn price_value(&self, contract: &OptionContract) -> Result<f64, PricingError> {
        self.run(contract).map(|(price, _)| price)
    }

    fn run(&self, contract: &OptionContract) -> Result<(f64, LatticeParameters), PricingError> {
        let steps = self.config.steps;
        let american = contract.exercise().is_american();
        let _span = debug_span!(
            "binomial",
            steps,
            option_type = %contract.option_type(),
            american
        )
        .entered();

        let lattice = LatticeParameters::new(contract, steps)?;
        debug!(
            dt = lattice.dt,
            u = lattice.u,
            p = lattice.p,
            discount = lattice.discount,
            "lattice parameters"
        );

        let sweep = Sweep {
            option_type: contract.option_type(),
            american,
            spot: contract.spot(),
            strike: contract.strike(),
            u: lattice.u,
            ratio: lattice.u / lattice.d,
            disc_p: lattice.discount * lattice.p,
            disc_1mp: lattice.discount * (1.0 - lattice.p),
        };

        let mut values = vec![0.0_f64; steps + 1];
        let mut next = vec![0.0_f64; steps + 1];

        for (b, out) in values.chunks_mut(BLOCK).enumerate() {
            sweep.terminal_block(steps, b * BLOCK, out);
        }

        for step in (0..steps).rev() {
            let out = &mut next[..=step];
            if self.sweep_in_parallel(step + 1) {
                induction_parallel(&sweep, step, &values, out);
            } else {
                for (b, chunk) in out.chunks_mut(BLOCK).enumerate() {
                    sweep.induction_block(step, b * BLOCK, &values, chunk);
                }
            }
            std::mem::swap(&mut values, &mut next);
        }

        let price = values[0];
        debug!(price, "binomial price");
        Ok((price, lattice))
    }

    #[inline]
    fn sweep_in_parallel(&self, nodes: usize) -> bool {
        cfg!(feature = "parallel") && nodes >= self.config.parallel_threshold
    }
}

#[cfg(feature = "parallel")]
fn induction_parallel(sweep: &Sweep, step: usize, prev: &[f64], out: &mut [f64]) {
    use rayon::prelude::*;

    out.par_chunks_mut(BLOCK)
        .enumerate()
        .for_each(|(b, chunk)| sweep.induction_block(step, b * BLOCK, prev, chunk));
}

#[cfg(not(feature = "parallel"))]
fn induction_parallel(sweep: &Sweep, step: usize, prev: &[f64], out: &mut [f64]) {
    for (b, chunk) in out.chunks_mut(BLOCK).enumerate() {
        sweep.induction_block(step, b * BLOCK, prev, chunk);
    }
}

impl PricingEngine for BinomialTreeEngine {
    fn price(&self, contract: &OptionContract) -> Result<PricingResult, PricingError> {
        let (price, lattice) = self.run(contract)?;

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert(DiagKey::NumSteps, self.config.steps as f64);
        diagnostics.insert(DiagKey::Vol, contract.volatility());
        diagnostics.insert(DiagKey::U, lattice.u);
        diagnostics.insert(DiagKey::Pu, lattice.p);
        diagnostics.insert(DiagKey::DiscountFactor, lattice.discount);

        Ok(PricingResult {
            price,
            stderr: None,
            diagnostics,
        })
    }
}
