//! Engines run under an installed subscriber and emit through `tracing`.

use ferric_options::core::{OptionContract, PricingEngine};
use ferric_options::engines::monte_carlo::MonteCarloEngine;
use ferric_options::engines::tree::BinomialTreeEngine;
use ferric_options::payoff::PayoffCompiler;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ferric_options=trace"))
        .with_test_writer()
        .try_init();
}

#[test]
fn pricing_with_a_subscriber_installed() {
    init_tracing();

    let contract = OptionContract::european_call(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
    let lattice = BinomialTreeEngine::new(200).price(&contract).unwrap();
    let mc = MonteCarloEngine::new(20_000)
        .with_seed(5)
        .price(&contract)
        .unwrap();
    let _payoff = PayoffCompiler::new()
        .compile("max(s - 100, 0)")
        .unwrap();

    let stderr = mc.stderr.unwrap();
    assert!((lattice.price - mc.price).abs() < 4.0 * stderr + 0.02);
}
