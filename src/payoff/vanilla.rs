use crate::core::{OptionContract, OptionType};
use crate::payoff::Payoff;

/// Plain call/put payoff `max(±(s - K), 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VanillaPayoff {
    pub option_type: OptionType,
    pub strike: f64,
}

impl VanillaPayoff {
    pub fn new(option_type: OptionType, strike: f64) -> Self {
        Self {
            option_type,
            strike,
        }
    }

    pub fn call(strike: f64) -> Self {
        Self::new(OptionType::Call, strike)
    }

    pub fn put(strike: f64) -> Self {
        Self::new(OptionType::Put, strike)
    }

    /// Terminal payoff of `contract`.
    pub fn from_contract(contract: &OptionContract) -> Self {
        Self::new(contract.option_type(), contract.strike())
    }
}

impl Payoff for VanillaPayoff {
    #[inline]
    fn evaluate(&self, terminal: f64) -> f64 {
        self.option_type.intrinsic(terminal, self.strike)
    }
}
