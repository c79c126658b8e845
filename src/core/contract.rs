//! Validated vanilla option contract shared by every engine.
//!
//! [`OptionContract`] bundles the underlying state (spot, rate, volatility) with the
//! contract terms (strike, maturity, side, exercise style). Fields are private and
//! checked once at construction, so engines can rely on `spot > 0`, `strike > 0`,
//! `maturity > 0`, `volatility >= 0` and finite inputs.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{ExerciseStyle, OptionType, PricingError};

/// Immutable option contract plus the Black-Scholes market inputs it is priced under.
///
/// # Examples
/// ```
/// use ferric_options::core::{ExerciseStyle, OptionContract, OptionType};
///
/// let contract = OptionContract::builder()
///     .spot(100.0)
///     .strike(95.0)
///     .maturity(0.5)
///     .rate(0.03)
///     .volatility(0.25)
///     .option_type(OptionType::Put)
///     .exercise(ExerciseStyle::American)
///     .build()
///     .unwrap();
///
/// assert_eq!(contract.strike(), 95.0);
/// assert!(contract.exercise().is_american());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionContract {
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
    option_type: OptionType,
    exercise: ExerciseStyle,
}

impl OptionContract {
    /// Builds a contract, validating every field.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when:
    /// - any numeric input is not finite
    /// - `spot <= 0`, `strike <= 0` or `maturity <= 0`
    /// - `volatility < 0`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
        option_type: OptionType,
        exercise: ExerciseStyle,
    ) -> Result<Self, PricingError> {
        require_finite("spot", spot)?;
        require_finite("strike", strike)?;
        require_finite("maturity", maturity)?;
        require_finite("rate", rate)?;
        require_finite("volatility", volatility)?;
        if spot <= 0.0 {
            return Err(PricingError::invalid("spot must be > 0"));
        }
        if strike <= 0.0 {
            return Err(PricingError::invalid("strike must be > 0"));
        }
        if maturity <= 0.0 {
            return Err(PricingError::invalid("maturity must be > 0"));
        }
        if volatility < 0.0 {
            return Err(PricingError::invalid("volatility cannot be negative"));
        }

        Ok(Self {
            spot,
            strike,
            maturity,
            rate,
            volatility,
            option_type,
            exercise,
        })
    }

    /// Starts a contract builder.
    #[inline]
    pub fn builder() -> OptionContractBuilder {
        OptionContractBuilder::default()
    }

    /// Builds a European call.
    pub fn european_call(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, PricingError> {
        Self::new(
            spot,
            strike,
            maturity,
            rate,
            volatility,
            OptionType::Call,
            ExerciseStyle::European,
        )
    }

    /// Builds a European put.
    pub fn european_put(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, PricingError> {
        Self::new(
            spot,
            strike,
            maturity,
            rate,
            volatility,
            OptionType::Put,
            ExerciseStyle::European,
        )
    }

    /// Builds an American put.
    pub fn american_put(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
    ) -> Result<Self, PricingError> {
        Self::new(
            spot,
            strike,
            maturity,
            rate,
            volatility,
            OptionType::Put,
            ExerciseStyle::American,
        )
    }

    /// Returns a copy with a different side, keeping every other field.
    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = option_type;
        self
    }

    /// Returns a copy with a different exercise style.
    pub fn with_exercise(mut self, exercise: ExerciseStyle) -> Self {
        self.exercise = exercise;
        self
    }

    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Time to maturity in years.
    #[inline]
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Continuously compounded risk-free rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Annualized volatility.
    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    #[inline]
    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    #[inline]
    pub fn exercise(&self) -> ExerciseStyle {
        self.exercise
    }

    /// Exercise value of the contract at `spot`.
    #[inline]
    pub fn intrinsic(&self, spot: f64) -> f64 {
        self.option_type.intrinsic(spot, self.strike)
    }
}

#[derive(Deserialize)]
struct RawContract {
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    volatility: f64,
    option_type: OptionType,
    #[serde(default)]
    exercise: ExerciseStyle,
}

// Deserialization goes through the validating constructor.
impl<'de> Deserialize<'de> for OptionContract {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawContract::deserialize(deserializer)?;
        Self::new(
            raw.spot,
            raw.strike,
            raw.maturity,
            raw.rate,
            raw.volatility,
            raw.option_type,
            raw.exercise,
        )
        .map_err(serde::de::Error::custom)
    }
}

fn require_finite(name: &str, value: f64) -> Result<(), PricingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PricingError::invalid(format!("{name} must be finite, got {value}")))
    }
}

/// Builder for [`OptionContract`].
#[derive(Debug, Clone, Default)]
pub struct OptionContractBuilder {
    spot: Option<f64>,
    strike: Option<f64>,
    maturity: Option<f64>,
    rate: Option<f64>,
    volatility: Option<f64>,
    option_type: Option<OptionType>,
    exercise: ExerciseStyle,
}

impl OptionContractBuilder {
    #[inline]
    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    #[inline]
    pub fn strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    #[inline]
    pub fn maturity(mut self, maturity: f64) -> Self {
        self.maturity = Some(maturity);
        self
    }

    /// Sets the risk-free rate (defaults to zero).
    #[inline]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    #[inline]
    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    #[inline]
    pub fn option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = Some(option_type);
        self
    }

    /// Sets the exercise style (defaults to European).
    #[inline]
    pub fn exercise(mut self, exercise: ExerciseStyle) -> Self {
        self.exercise = exercise;
        self
    }

    /// Validates and builds the contract.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when a required field is missing
    /// or fails the checks of [`OptionContract::new`].
    pub fn build(self) -> Result<OptionContract, PricingError> {
        let spot = self.spot.ok_or_else(|| PricingError::invalid("spot is required"))?;
        let strike = self
            .strike
            .ok_or_else(|| PricingError::invalid("strike is required"))?;
        let maturity = self
            .maturity
            .ok_or_else(|| PricingError::invalid("maturity is required"))?;
        let volatility = self
            .volatility
            .ok_or_else(|| PricingError::invalid("volatility is required"))?;
        let option_type = self
            .option_type
            .ok_or_else(|| PricingError::invalid("option type is required"))?;

        OptionContract::new(
            spot,
            strike,
            maturity,
            self.rate.unwrap_or(0.0),
            volatility,
            option_type,
            self.exercise,
        )
    }
}
