//! ferric-options prices equity options with two independent numerical methods and a
//! sandboxed payoff language.
//!
//! - A Cox-Ross-Rubinstein binomial lattice for European and American vanillas.
//! - A Monte Carlo engine under geometric Brownian motion for any payoff of the
//!   terminal price, with deterministic sub-streams per batch.
//! - A compiler for small payoff formulas such as `max(s - 100, 0)` that accepts
//!   arithmetic, comparisons, conditionals and a fixed `math` namespace, and rejects
//!   everything else at compile time.
//!
//! References:
//! - Cox, Ross and Rubinstein (1979); Hull, *Options, Futures, and Other Derivatives*
//!   (11th ed.), Ch. 13 and 21.
//! - Glasserman (2004) for Monte Carlo estimators.
//!
//! Numerical considerations:
//! - The lattice converges at first order in the step count with odd/even oscillation.
//! - Monte Carlo standard errors shrink as `1/√N`; results for a seeded source do not
//!   depend on the number of worker threads.
//!
//! # Feature Flags
//! - `parallel` (default): sweeps large lattice steps and Monte Carlo batches on the
//!   Rayon pool.
//!
//! # Quick Start
//! Price an American put on a lattice:
//! ```rust
//! use ferric_options::{OptionType, price_binomial};
//!
//! let px = price_binomial(100.0, 100.0, 1.0, 0.05, 0.20, 500, OptionType::Put, true).unwrap();
//! assert!(px > 6.0 && px < 6.2);
//! ```
//!
//! Price a compiled payoff by simulation:
//! ```rust
//! use ferric_options::math::SeededNormalRng;
//! use ferric_options::{compile_payoff, price_monte_carlo};
//!
//! let digital = compile_payoff("1 if s > 100 else 0").unwrap();
//! let mut rng = SeededNormalRng::new(7);
//! let px = price_monte_carlo(100.0, 1.0, 0.05, 0.20, 100_000, &digital, &mut rng).unwrap();
//! assert!(px > 0.50 && px < 0.55);
//! ```
//!
//! Use the engine types directly:
//! ```rust
//! use ferric_options::core::{OptionContract, PricingEngine};
//! use ferric_options::engines::tree::BinomialTreeEngine;
//!
//! let contract = OptionContract::european_call(100.0, 100.0, 1.0, 0.05, 0.20).unwrap();
//! let result = BinomialTreeEngine::new(1_000).price(&contract).unwrap();
//! assert!((result.price - 10.4506).abs() < 0.01);
//! assert_eq!(result.diagnostics.get("num_steps"), Some(1_000.0));
//! ```
//!
//! Unsafe formulas never compile:
//! ```rust
//! use ferric_options::{PricingError, compile_payoff};
//!
//! let err = compile_payoff("__import__('os').system('ls')").unwrap_err();
//! assert!(matches!(err, PricingError::UnsafeExpression { .. }));
//! ```

pub mod core;
pub mod engines;
pub mod math;
pub mod payoff;
pub mod pricing;

pub use crate::core::{ExerciseStyle, OptionContract, OptionType, PricingError};
pub use crate::payoff::{CompiledPayoff, Payoff, compile_payoff};
pub use crate::pricing::{black_scholes_price, price_binomial, price_monte_carlo};

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::engines::analytic::{BlackScholesEngine, black_scholes_price};
    pub use crate::engines::monte_carlo::{
        CancellationToken, MonteCarloConfig, MonteCarloEngine, MonteCarloResult,
    };
    pub use crate::engines::tree::{BinomialConfig, BinomialTreeEngine};
    pub use crate::math::rng::{RandomNumberSource, SeededNormalRng};
    pub use crate::payoff::{CompiledPayoff, Payoff, PayoffCompiler, VanillaPayoff, compile_payoff};
    pub use crate::pricing::{price_binomial, price_monte_carlo};
}
