//! Core traits, common domain types, and library-wide result/error structures.

pub mod contract;
pub mod engine;
pub mod error;
pub mod types;

pub use contract::{OptionContract, OptionContractBuilder};
pub use engine::{DiagKey, Diagnostics, PricingEngine, PricingResult};
pub use error::{PricingError, Span, annotate_source};
pub use types::{ExerciseStyle, OptionType};
