//! Intermediate representation for compiled payoffs.
//!
//! The IR has no names left in it: the free variable is `Var`, namespace
//! constants are inlined, and calls point straight at a [`BuiltinFn`].

use crate::payoff::namespace::BuiltinFn;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Floored modulo: the result takes the sign of the divisor.
    Mod,
    Pow,
}

impl BinOp {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Mod => floored_mod(a, b),
            Self::Pow => a.powf(b),
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    #[inline]
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Lt => a < b,
            Self::Le => a <= b,
            Self::Gt => a > b,
            Self::Ge => a >= b,
        }
    }
}

/// Expression in the IR.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal or folded constant.
    Const(f64),
    /// The payoff's free variable.
    Var,
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Left-to-right fold of `first` with each `(op, operand)`.
    Chain {
        first: Box<Expr>,
        rest: Vec<(BinOp, Expr)>,
    },
    /// Comparison chain; each operand is evaluated once.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    /// Short-circuit `and`, yielding the deciding operand.
    And(Vec<Expr>),
    /// Short-circuit `or`, yielding the deciding operand.
    Or(Vec<Expr>),
    Conditional {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call {
        func: BuiltinFn,
        args: Vec<Expr>,
    },
}

impl Expr {
    #[inline]
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Self::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// True when every direct child is a constant (leaves trivially qualify
    /// unless they are `Var`).
    pub fn children_are_const(&self) -> bool {
        let is_const = |e: &Expr| matches!(e, Self::Const(_));
        match self {
            Self::Const(_) => true,
            Self::Var => false,
            Self::Neg(operand) => is_const(operand),
            Self::Binary { lhs, rhs, .. } => is_const(lhs) && is_const(rhs),
            Self::Chain { first, rest } => is_const(first) && rest.iter().all(|(_, e)| is_const(e)),
            Self::Compare { first, rest } => {
                is_const(first) && rest.iter().all(|(_, e)| is_const(e))
            }
            Self::And(operands) | Self::Or(operands) => operands.iter().all(is_const),
            Self::Conditional { test, body, orelse } => {
                is_const(test) && is_const(body) && is_const(orelse)
            }
            Self::Call { args, .. } => args.iter().all(is_const),
        }
    }

    /// True if the free variable appears anywhere below this node.
    pub fn uses_var(&self) -> bool {
        match self {
            Self::Const(_) => false,
            Self::Var => true,
            Self::Neg(operand) => operand.uses_var(),
            Self::Binary { lhs, rhs, .. } => lhs.uses_var() || rhs.uses_var(),
            Self::Chain { first, rest } => {
                first.uses_var() || rest.iter().any(|(_, e)| e.uses_var())
            }
            Self::Compare { first, rest } => {
                first.uses_var() || rest.iter().any(|(_, e)| e.uses_var())
            }
            Self::And(operands) | Self::Or(operands) => operands.iter().any(Expr::uses_var),
            Self::Conditional { test, body, orelse } => {
                test.uses_var() || body.uses_var() || orelse.uses_var()
            }
            Self::Call { args, .. } => args.iter().any(Expr::uses_var),
        }
    }
}

/// Truthiness of a numeric value: anything but (signed) zero, NaN included.
#[inline(always)]
pub fn truthy(v: f64) -> bool {
    v != 0.0
}

#[inline(always)]
pub fn from_bool(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Modulo whose result has the sign of `b`; `b == 0` gives NaN.
#[inline]
pub fn floored_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 {
        if (r < 0.0) != (b < 0.0) { r + b } else { r }
    } else {
        0.0_f64.copysign(b)
    }
}
