//! Function-call pricing API.
//!
//! Thin wrappers over [`BinomialTreeEngine`] and [`MonteCarloEngine`] for callers
//! that hold bare market parameters rather than an [`OptionContract`].

use crate::core::{ExerciseStyle, OptionContract, OptionType, PricingError};
use crate::engines::monte_carlo::MonteCarloEngine;
use crate::engines::tree::BinomialTreeEngine;
use crate::math::rng::RandomNumberSource;
use crate::payoff::Payoff;

pub use crate::engines::analytic::black_scholes_price;
pub use crate::payoff::compile_payoff;

/// Prices a vanilla option on a CRR lattice with `steps` time steps.
///
/// # Errors
/// - [`PricingError::InvalidParameter`] for invalid contract inputs or `steps == 0`
/// - [`PricingError::ArbitrageViolation`] when the risk-neutral probability leaves `[0, 1]`
///
/// # Examples
/// ```
/// use ferric_options::OptionType;
/// use ferric_options::pricing::price_binomial;
///
/// let american = price_binomial(100.0, 100.0, 1.0, 0.05, 0.2, 500, OptionType::Put, true).unwrap();
/// let european = price_binomial(100.0, 100.0, 1.0, 0.05, 0.2, 500, OptionType::Put, false).unwrap();
/// assert!(american > european);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn price_binomial(
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
    steps: usize,
    option_type: OptionType,
    american: bool,
) -> Result<f64, PricingError> {
    let contract = OptionContract::new(
        spot,
        strike,
        maturity,
        rate,
        volatility,
        option_type,
        ExerciseStyle::from_american_flag(american),
    )?;
    BinomialTreeEngine::new(steps).price_value(&contract)
}

/// Prices `payoff(S_T)` by Monte Carlo simulation of `num_paths` GBM terminal values.
///
/// Each call advances `rng`, so repeated calls on one source give independent
/// estimates. Two sources built from the same seed give identical estimates.
///
/// # Errors
/// [`PricingError::InvalidParameter`] for non-finite inputs, `spot <= 0`,
/// `maturity <= 0`, `volatility < 0` or `num_paths == 0`.
///
/// # Examples
/// ```
/// use ferric_options::math::SeededNormalRng;
/// use ferric_options::pricing::{compile_payoff, price_monte_carlo};
///
/// let payoff = compile_payoff("max(s - 100, 0)").unwrap();
/// let mut rng = SeededNormalRng::new(42);
/// let price = price_monte_carlo(100.0, 1.0, 0.05, 0.2, 100_000, &payoff, &mut rng).unwrap();
/// assert!((price - 10.45).abs() < 0.2);
/// ```
pub fn price_monte_carlo<P, R>(
    spot: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
    num_paths: usize,
    payoff: &P,
    rng: &mut R,
) -> Result<f64, PricingError>
where
    P: Payoff + ?Sized,
    R: RandomNumberSource + Sync,
{
    MonteCarloEngine::new(num_paths).price_value(spot, maturity, rate, volatility, payoff, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SeededNormalRng;

    #[test]
    fn binomial_rejects_bad_contract() {
        let err = price_binomial(100.0, 100.0, 0.0, 0.05, 0.2, 100, OptionType::Call, false)
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter(_)));
        let err = price_binomial(100.0, 100.0, 1.0, 0.05, -0.2, 100, OptionType::Call, false)
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter(_)));
    }

    #[test]
    fn monte_carlo_rejects_zero_paths() {
        let mut rng = SeededNormalRng::new(1);
        let err = price_monte_carlo(100.0, 1.0, 0.05, 0.2, 0, &|s: f64| s, &mut rng).unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter(_)));
    }

    #[test]
    fn both_methods_agree_on_a_european_put() {
        let lattice =
            price_binomial(100.0, 110.0, 0.5, 0.02, 0.25, 800, OptionType::Put, false).unwrap();
        let payoff = compile_payoff("max(110 - s, 0)").unwrap();
        let mut rng = SeededNormalRng::new(11);
        let mc = price_monte_carlo(100.0, 0.5, 0.02, 0.25, 200_000, &payoff, &mut rng).unwrap();
        assert!((lattice - mc).abs() < 0.1, "lattice={lattice} mc={mc}");
    }
}
