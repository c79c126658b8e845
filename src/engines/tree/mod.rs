//! Tree-based pricing engines.

pub mod binomial;

pub use binomial::{
    BinomialConfig, BinomialConfigBuilder, BinomialTreeEngine, LatticeParameters, MAX_STEPS,
};
