use crate::core::{
    DiagKey, Diagnostics, OptionContract, OptionType, PricingEngine, PricingError, PricingResult,
};
use crate::math::normal_cdf;

/// Analytic Black-Scholes engine for European vanilla options.
#[derive(Debug, Clone, Default)]
pub struct BlackScholesEngine;

impl BlackScholesEngine {
    /// Creates a Black-Scholes engine instance.
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn d1_d2(spot: f64, strike: f64, rate: f64, vol: f64, expiry: f64) -> (f64, f64) {
    let sig_sqrt_t = vol * expiry.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * expiry) / sig_sqrt_t;
    (d1, d1 - sig_sqrt_t)
}

/// Closed-form Black-Scholes price of a European call or put without dividends.
///
/// Degenerate inputs collapse to their limits: intrinsic value for `expiry <= 0`
/// and the discounted forward payoff for `vol <= 0`.
///
/// ```
/// use ferric_options::{OptionType, black_scholes_price};
///
/// let call = black_scholes_price(OptionType::Call, 100.0, 100.0, 0.05, 0.2, 1.0);
/// assert!((call - 10.450_583_572_185_565).abs() < 1e-10);
/// ```
#[inline]
pub fn black_scholes_price(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    if expiry <= 0.0 {
        return option_type.intrinsic(spot, strike);
    }
    let df_r = (-rate * expiry).exp();
    if vol <= 0.0 {
        return option_type.intrinsic(spot, strike * df_r);
    }

    let (d1, d2) = d1_d2(spot, strike, rate, vol, expiry);
    match option_type {
        OptionType::Call => spot * normal_cdf(d1) - strike * df_r * normal_cdf(d2),
        OptionType::Put => strike * df_r * normal_cdf(-d2) - spot * normal_cdf(-d1),
    }
}

impl PricingEngine for BlackScholesEngine {
    fn price(&self, contract: &OptionContract) -> Result<PricingResult, PricingError> {
        if contract.exercise().is_american() {
            return Err(PricingError::invalid(
                "BlackScholesEngine supports European exercise only",
            ));
        }

        let price = black_scholes_price(
            contract.option_type(),
            contract.spot(),
            contract.strike(),
            contract.rate(),
            contract.volatility(),
            contract.maturity(),
        );

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert(DiagKey::Vol, contract.volatility());
        diagnostics.insert(
            DiagKey::DiscountFactor,
            (-contract.rate() * contract.maturity()).exp(),
        );

        Ok(PricingResult {
            price,
            stderr: None,
            diagnostics,
        })
    }
}
