//! Payoff functions and the sandboxed payoff expression compiler.
//!
//! A payoff maps the terminal underlying price to a cash amount. Besides plain
//! closures and [`VanillaPayoff`], payoffs can be written as small arithmetic
//! expressions over a single free variable (`s` by default):
//!
//! ```text
//! source → lexer → parser → AST → name validation → IR (folded) → evaluator
//! ```
//!
//! Only literals, the free variable, `max`, `min` and the members of `math` can
//! be referenced. Anything else (strings, subscripts, attribute access outside
//! `math.`, unknown names such as `__import__`) is rejected at compile time with
//! [`PricingError::UnsafeExpression`], and no expression can touch anything but
//! the value it is evaluated at.
//!
//! # Quick Start
//!
//! ```rust
//! use ferric_options::payoff::{compile_payoff, Payoff};
//!
//! let digital_call = compile_payoff("1 if s > 100 else 0").unwrap();
//! assert_eq!(digital_call.evaluate(120.0), 1.0);
//!
//! let log_contract = compile_payoff("math.log(s / 100)").unwrap();
//! assert!(log_contract.evaluate(100.0).abs() < 1e-15);
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::core::PricingError;

pub mod ast;
pub mod compiler;
pub mod eval;
pub mod ir;
pub mod lexer;
pub mod namespace;
pub mod parser;
pub mod vanilla;

pub use vanilla::VanillaPayoff;

/// Default name of the free variable.
pub const DEFAULT_VARIABLE: &str = "s";

/// A terminal payoff function.
///
/// Implementations must be pure: the Monte Carlo engine calls `evaluate` from
/// several threads at once and relies on identical inputs giving identical
/// outputs.
pub trait Payoff: Send + Sync {
    fn evaluate(&self, terminal: f64) -> f64;
}

impl<F> Payoff for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[inline]
    fn evaluate(&self, terminal: f64) -> f64 {
        self(terminal)
    }
}

/// A validated, compiled payoff expression.
///
/// Cloning shares the compiled tree.
#[derive(Debug, Clone)]
pub struct CompiledPayoff {
    source: Arc<str>,
    variable: Arc<str>,
    program: Arc<ir::Expr>,
}

impl CompiledPayoff {
    /// Evaluates the payoff with the free variable bound to `s`.
    #[inline]
    pub fn evaluate(&self, s: f64) -> f64 {
        eval::evaluate(&self.program, s)
    }

    /// The expression text this payoff was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Returns the value if the expression does not depend on its variable.
    pub fn as_constant(&self) -> Option<f64> {
        self.program.as_const()
    }

    pub fn program(&self) -> &ir::Expr {
        &self.program
    }
}

impl Payoff for CompiledPayoff {
    #[inline]
    fn evaluate(&self, terminal: f64) -> f64 {
        CompiledPayoff::evaluate(self, terminal)
    }
}

/// Compiles payoff expressions, optionally under a custom variable name.
///
/// # Examples
/// ```
/// use ferric_options::payoff::PayoffCompiler;
///
/// let compiler = PayoffCompiler::new().with_variable("spot").unwrap();
/// let payoff = compiler.compile("max(110 - spot, 0)").unwrap();
/// assert_eq!(payoff.evaluate(100.0), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoffCompiler {
    variable: String,
}

impl Default for PayoffCompiler {
    fn default() -> Self {
        Self {
            variable: DEFAULT_VARIABLE.to_string(),
        }
    }
}

impl PayoffCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the free variable.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] if `name` is not an ASCII
    /// identifier or collides with a keyword or a namespace member.
    pub fn with_variable(mut self, name: impl Into<String>) -> Result<Self, PricingError> {
        let name = name.into();
        let mut chars = name.chars();
        let is_identifier = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            return Err(PricingError::invalid(format!(
                "payoff variable '{name}' is not a valid identifier"
            )));
        }
        if lexer::is_keyword(&name) || namespace::is_reserved(&name) {
            return Err(PricingError::invalid(format!(
                "payoff variable '{name}' is a reserved name"
            )));
        }
        self.variable = name;
        Ok(self)
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Compiles `source`.
    ///
    /// # Errors
    /// - [`PricingError::EmptyExpression`] for empty or whitespace-only input
    /// - [`PricingError::InvalidSyntax`] for malformed input, wrong argument
    ///   counts or calls of non-functions
    /// - [`PricingError::UnsafeExpression`] for constructs or names outside the sandbox
    pub fn compile(&self, source: &str) -> Result<CompiledPayoff, PricingError> {
        let program = compiler::compile(source, &self.variable)?;
        debug!(
            expression = source,
            variable = %self.variable,
            constant = program.as_const().is_some(),
            "compiled payoff expression"
        );
        Ok(CompiledPayoff {
            source: Arc::from(source),
            variable: Arc::from(self.variable.as_str()),
            program: Arc::new(program),
        })
    }
}

/// Compiles a payoff expression over the variable `s`.
///
/// # Examples
/// ```
/// use ferric_options::payoff::compile_payoff;
///
/// let call = compile_payoff("max(s - 100, 0)").unwrap();
/// assert_eq!(call.evaluate(120.0), 20.0);
/// assert_eq!(call.evaluate(80.0), 0.0);
/// ```
pub fn compile_payoff(source: &str) -> Result<CompiledPayoff, PricingError> {
    PayoffCompiler::default().compile(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_call_payoff() {
        let payoff = compile_payoff("max(s - 100, 0)").unwrap();
        assert_eq!(payoff.evaluate(120.0), 20.0);
        assert_eq!(payoff.evaluate(80.0), 0.0);
        assert_eq!(payoff.source(), "max(s - 100, 0)");
        assert_eq!(payoff.variable(), "s");
        assert_eq!(payoff.as_constant(), None);
    }

    #[test]
    fn expression_semantics() {
        let cases: &[(&str, f64, f64)] = &[
            ("-s ** 2", 3.0, -9.0),
            ("2 ** -1", 0.0, 0.5),
            ("s % 3", -7.0, 2.0),
            ("s % -3", 7.0, -2.0),
            ("s and 5", 0.0, 0.0),
            ("s and 5", 2.0, 5.0),
            ("s or 5", 0.0, 5.0),
            ("90 < s < 110", 100.0, 1.0),
            ("90 < s < 110", 120.0, 0.0),
            ("(s > 100) * 10", 101.0, 10.0),
            ("s - 100 if s > 100 else 0", 130.0, 30.0),
            ("min(s, 120) - 100", 150.0, 20.0),
            ("math.exp(0) + math.floor(s)", 2.7, 3.0),
            ("math.log(8, 2)", 0.0, 3.0),
            ("1_000 + 0x10 + .5", 0.0, 1016.5),
            ("s / 0", 1.0, f64::INFINITY),
        ];
        for &(source, s, expected) in cases {
            let payoff = compile_payoff(source).unwrap();
            assert_eq!(payoff.evaluate(s), expected, "{source} at s={s}");
        }
    }

    #[test]
    fn ieee_faults_do_not_error() {
        assert!(compile_payoff("0 / 0").unwrap().evaluate(1.0).is_nan());
        assert!(compile_payoff("math.sqrt(s)").unwrap().evaluate(-4.0).is_nan());
        assert_eq!(
            compile_payoff("math.log(s)").unwrap().evaluate(0.0),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn constant_payoff_is_detected() {
        let payoff = compile_payoff("math.pi * 2").unwrap();
        assert_eq!(payoff.as_constant(), Some(std::f64::consts::TAU));
        assert_eq!(payoff.evaluate(42.0), std::f64::consts::TAU);
    }

    #[test]
    fn closures_are_payoffs() {
        fn apply<P: Payoff + ?Sized>(p: &P, s: f64) -> f64 {
            p.evaluate(s)
        }
        let straddle = |s: f64| (s - 100.0).abs();
        assert_eq!(apply(&straddle, 90.0), 10.0);
        let compiled = compile_payoff("s * 2").unwrap();
        let dynamic: &dyn Payoff = &compiled;
        assert_eq!(apply(dynamic, 3.0), 6.0);
    }

    #[test]
    fn compiled_payoff_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledPayoff>();

        let payoff = compile_payoff("max(s - 100, 0)").unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let payoff = payoff.clone();
                std::thread::spawn(move || payoff.evaluate(100.0 + i as f64))
            })
            .collect();
        let results: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn variable_names_are_checked() {
        for bad in ["", "1s", "max", "math", "lambda", "not", "True", "spot price"] {
            let err = PayoffCompiler::new().with_variable(bad).unwrap_err();
            assert!(matches!(err, PricingError::InvalidParameter(_)), "{bad}");
        }
        let compiler = PayoffCompiler::new().with_variable("S_T").unwrap();
        assert_eq!(compiler.variable(), "S_T");
        assert_eq!(compiler.compile("S_T * 2").unwrap().evaluate(2.0), 4.0);
    }

    #[test]
    fn error_classes() {
        assert_eq!(
            compile_payoff("").unwrap_err(),
            PricingError::EmptyExpression
        );
        assert!(matches!(
            compile_payoff("s +").unwrap_err(),
            PricingError::InvalidSyntax { .. }
        ));
        assert!(matches!(
            compile_payoff("__import__('os')").unwrap_err(),
            PricingError::UnsafeExpression { .. }
        ));
    }
}
