//! Monte Carlo pricing engines.

pub mod cancel;
pub mod config;
pub mod mc_engine;

pub use cancel::CancellationToken;
pub use config::{MAX_BATCH_SIZE, MonteCarloConfig, MonteCarloConfigBuilder};
pub use mc_engine::{MonteCarloEngine, MonteCarloResult};
