//! CRR lattice against the Black-Scholes closed form and no-arbitrage identities.

use approx::assert_relative_eq;
use ferric_options::core::{OptionContract, PricingEngine};
use ferric_options::engines::tree::{BinomialConfig, BinomialTreeEngine};
use ferric_options::{OptionType, PricingError, black_scholes_price, price_binomial};

const BS_ATM_CALL: f64 = 10.450_583_572_185_565;

fn european(option_type: OptionType, strike: f64, steps: usize) -> f64 {
    price_binomial(100.0, strike, 1.0, 0.05, 0.2, steps, option_type, false)
        .expect("valid lattice inputs")
}

#[test]
fn european_call_converges_to_black_scholes() {
    let px = european(OptionType::Call, 100.0, 2_000);
    assert!(
        (px - BS_ATM_CALL).abs() < 2.0e-3,
        "lattice={px} closed form={BS_ATM_CALL}"
    );
}

#[test]
fn doubling_steps_shrinks_error() {
    let errors: Vec<f64> = [100_usize, 200, 400, 800]
        .iter()
        .map(|&n| (european(OptionType::Call, 100.0, n) - BS_ATM_CALL).abs())
        .collect();
    for pair in errors.windows(2) {
        assert!(pair[1] < pair[0], "errors did not shrink: {errors:?}");
    }
    assert!(errors[3] < errors[0] / 4.0, "errors: {errors:?}");
}

#[test]
fn european_put_call_parity_holds_on_the_lattice() {
    for steps in [50_usize, 51, 200, 999] {
        for strike in [80.0, 100.0, 120.0] {
            let call = european(OptionType::Call, strike, steps);
            let put = european(OptionType::Put, strike, steps);
            let forward = 100.0 - strike * (-0.05_f64).exp();
            assert_relative_eq!(call - put, forward, epsilon = 1e-9);
        }
    }
}

#[test]
fn american_put_dominates_european_put() {
    for strike in [70.0, 90.0, 100.0, 110.0, 140.0] {
        let european = european(OptionType::Put, strike, 400);
        let american =
            price_binomial(100.0, strike, 1.0, 0.05, 0.2, 400, OptionType::Put, true).unwrap();
        assert!(american >= european, "K={strike}: {american} < {european}");
        assert!(american >= (strike - 100.0_f64).max(0.0));
    }
}

#[test]
fn american_put_reference_value() {
    // Hull, Example 21.1 setup priced with a fine lattice.
    let px = price_binomial(50.0, 50.0, 5.0 / 12.0, 0.10, 0.40, 2_000, OptionType::Put, true)
        .unwrap();
    assert!((px - 4.28).abs() < 0.01, "american put = {px}");
}

#[test]
fn zero_volatility_with_positive_rate_is_an_arbitrage_violation() {
    let err =
        price_binomial(100.0, 100.0, 1.0, 0.05, 0.0, 100, OptionType::Call, false).unwrap_err();
    assert!(matches!(err, PricingError::ArbitrageViolation { .. }));
}

#[test]
fn degenerate_lattice_is_rejected_not_clamped() {
    // u == d leaves the probability undefined.
    let err =
        price_binomial(110.0, 100.0, 1.0, 0.0, 0.0, 10, OptionType::Call, false).unwrap_err();
    match err {
        PricingError::ArbitrageViolation { probability } => assert!(probability.is_nan()),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    let cases = [
        (0.0, 100.0, 1.0, 0.2, 100),
        (100.0, -1.0, 1.0, 0.2, 100),
        (100.0, 100.0, 0.0, 0.2, 100),
        (100.0, 100.0, 1.0, -0.2, 100),
        (100.0, 100.0, 1.0, 0.2, 0),
        (f64::NAN, 100.0, 1.0, 0.2, 100),
    ];
    for (spot, strike, maturity, vol, steps) in cases {
        let err = price_binomial(spot, strike, maturity, 0.05, vol, steps, OptionType::Put, true)
            .unwrap_err();
        assert!(
            matches!(err, PricingError::InvalidParameter(_)),
            "({spot}, {strike}, {maturity}, {vol}, {steps}) gave {err:?}"
        );
    }
}

#[test]
fn engine_and_free_function_agree() {
    let contract = OptionContract::european_call(100.0, 95.0, 0.75, 0.03, 0.3).unwrap();
    let engine = BinomialTreeEngine::with_config(
        BinomialConfig::from_json(r#"{ "steps": 300, "parallel_threshold": 64 }"#).unwrap(),
    );
    let result = engine.price(&contract).unwrap();
    let direct = price_binomial(100.0, 95.0, 0.75, 0.03, 0.3, 300, OptionType::Call, false)
        .unwrap();
    assert_eq!(result.price.to_bits(), direct.to_bits());

    let reference = black_scholes_price(OptionType::Call, 100.0, 95.0, 0.03, 0.3, 0.75);
    assert!((result.price - reference).abs() < 0.05);
}
