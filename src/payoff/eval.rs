//! Tree-walking evaluator for the payoff IR.
//!
//! Evaluation is pure: it reads nothing but the IR and the value bound to the
//! free variable, so one compiled payoff can be shared across threads.

use crate::payoff::ir::{Expr, from_bool, truthy};

/// Evaluate `expr` with the free variable bound to `s`.
pub fn evaluate(expr: &Expr, s: f64) -> f64 {
    match expr {
        Expr::Const(v) => *v,
        Expr::Var => s,
        Expr::Neg(operand) => -evaluate(operand, s),
        Expr::Binary { op, lhs, rhs } => op.apply(evaluate(lhs, s), evaluate(rhs, s)),
        Expr::Chain { first, rest } => rest
            .iter()
            .fold(evaluate(first, s), |acc, (op, operand)| {
                op.apply(acc, evaluate(operand, s))
            }),
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, s);
            for (op, operand) in rest {
                let right = evaluate(operand, s);
                if !op.holds(left, right) {
                    return 0.0;
                }
                left = right;
            }
            1.0
        }
        Expr::And(operands) => eval_logical(operands, s, false),
        Expr::Or(operands) => eval_logical(operands, s, true),
        Expr::Conditional { test, body, orelse } => {
            if truthy(evaluate(test, s)) {
                evaluate(body, s)
            } else {
                evaluate(orelse, s)
            }
        }
        Expr::Call { func, args } => match args.as_slice() {
            [a] => func.apply(&[evaluate(a, s)]),
            [a, b] => func.apply(&[evaluate(a, s), evaluate(b, s)]),
            [a, b, c] => func.apply(&[evaluate(a, s), evaluate(b, s), evaluate(c, s)]),
            _ => {
                let values: Vec<f64> = args.iter().map(|a| evaluate(a, s)).collect();
                func.apply(&values)
            }
        },
    }
}

/// Returns the first operand whose truthiness equals `stop_on`, else the last.
#[inline]
fn eval_logical(operands: &[Expr], s: f64, stop_on: bool) -> f64 {
    let mut value = from_bool(!stop_on);
    for operand in operands {
        value = evaluate(operand, s);
        if truthy(value) == stop_on {
            return value;
        }
    }
    value
}
