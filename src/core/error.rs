//! Error taxonomy shared by the engines and the payoff compiler.

use std::fmt;

use thiserror::Error;

/// Byte range inside a payoff expression, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Failures surfaced by every public operation of the crate.
///
/// Errors are raised immediately; no operation returns a partial or clamped
/// result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Non-positive steps/maturity/path count, negative volatility,
    /// non-finite inputs, or an unrecognized option kind.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The derived risk-neutral probability falls outside `[0, 1]`.
    #[error("no-arbitrage violation: risk-neutral probability {probability} is outside [0, 1]")]
    ArbitrageViolation { probability: f64 },

    /// The payoff expression is empty or whitespace-only.
    #[error("payoff expression cannot be empty")]
    EmptyExpression,

    /// The payoff expression is malformed.
    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },

    /// The payoff expression uses a construct or name outside the sandbox.
    #[error("unsafe expression at {span}: {message}")]
    UnsafeExpression { message: String, span: Span },

    /// A Monte Carlo run observed its cancellation token.
    #[error("monte carlo run cancelled after {completed_paths} paths")]
    Cancelled { completed_paths: usize },
}

impl PricingError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub(crate) fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::InvalidSyntax {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn unsafe_expr(message: impl Into<String>, span: Span) -> Self {
        Self::UnsafeExpression {
            message: message.into(),
            span,
        }
    }

    /// Source span for expression errors.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::InvalidSyntax { span, .. } | Self::UnsafeExpression { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Renders the error with a line/column position inside `source`.
    ///
    /// # Examples
    /// ```
    /// use ferric_options::compile_payoff;
    ///
    /// let source = "max(s - 100,\n  0) +";
    /// let err = compile_payoff(source).unwrap_err();
    /// assert!(err.describe(source).contains("line 2"));
    /// ```
    pub fn describe(&self, source: &str) -> String {
        match self.span() {
            Some(span) => format!("{self} ({})", annotate_source(source, span)),
            None => self.to_string(),
        }
    }
}

/// Annotates an expression string with line/column information for a given span.
pub fn annotate_source(source: &str, span: Span) -> String {
    let mut start = span.start.min(source.len());
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    let before = &source[..start];
    let line = before.chars().filter(|&c| c == '\n').count() + 1;
    let col = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    format!("line {line}, col {col}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_reports_line_and_column() {
        let source = "max(s,\n   0) $";
        assert_eq!(annotate_source(source, Span::new(13, 14)), "line 2, col 7");
        assert_eq!(annotate_source(source, Span::new(0, 1)), "line 1, col 1");
    }

    #[test]
    fn annotate_clamps_out_of_range_spans() {
        assert_eq!(annotate_source("s +", Span::new(99, 99)), "line 1, col 4");
    }

    #[test]
    fn display_includes_span() {
        let err = PricingError::syntax("expected expression", Span::new(3, 3));
        assert_eq!(err.to_string(), "invalid syntax at 3-3: expected expression");
        assert_eq!(err.span(), Some(Span::new(3, 3)));
        assert_eq!(PricingError::EmptyExpression.span(), None);
    }
}
