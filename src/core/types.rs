use std::str::FromStr;

use crate::core::PricingError;

/// Plain-vanilla option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option payoff profile.
    Call,
    /// Put option payoff profile.
    Put,
}

impl OptionType {
    /// Exercise value at `spot`, floored at a positive zero.
    ///
    /// # Examples
    /// ```
    /// use ferric_options::core::OptionType;
    ///
    /// assert_eq!(OptionType::Call.intrinsic(120.0, 100.0), 20.0);
    /// assert_eq!(OptionType::Put.intrinsic(120.0, 100.0), 0.0);
    /// ```
    #[inline(always)]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        let raw = match self {
            Self::Call => spot - strike,
            Self::Put => strike - spot,
        };
        // `f64::max` may keep -0.0; an explicit branch always yields +0.0.
        if raw > 0.0 { raw } else { 0.0 }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    /// Parses `"call"` / `"put"` (case-insensitive, surrounding whitespace ignored).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(PricingError::InvalidParameter(format!(
                "unrecognized option kind '{other}': expected 'call' or 'put'"
            ))),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exercise rights for an option contract.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    /// Exercise only at expiry.
    #[default]
    European,
    /// Exercise at any time up to expiry.
    American,
}

impl ExerciseStyle {
    /// Maps the `american` flag used by the functional API.
    #[inline]
    pub fn from_american_flag(american: bool) -> Self {
        if american {
            Self::American
        } else {
            Self::European
        }
    }

    #[inline]
    pub fn is_american(self) -> bool {
        matches!(self, Self::American)
    }
}
