//! Compiler: source → tokens → AST → name validation → IR with constant folding.

use crate::core::{PricingError, Span};
use crate::payoff::ast::{self, Expr as AstExpr, ExprKind, dotted};
use crate::payoff::eval::evaluate;
use crate::payoff::ir::{self, BinOp, CmpOp, Expr};
use crate::payoff::lexer::tokenize;
use crate::payoff::namespace::{Member, resolve};
use crate::payoff::parser::parse;

/// Compile `source` into IR, binding `variable` as the free variable.
pub fn compile(source: &str, variable: &str) -> Result<Expr, PricingError> {
    if source.trim().is_empty() {
        return Err(PricingError::EmptyExpression);
    }

    let tokens = tokenize(source)?;
    let ast = parse(tokens)?;
    validate(&ast, variable)?;
    lower(&ast, variable)
}

/// Checks every referenced name against the namespace before anything else,
/// so an unsafe name is reported ahead of any usage mistake elsewhere.
pub fn validate(expr: &AstExpr, variable: &str) -> Result<(), PricingError> {
    match &expr.kind {
        ExprKind::Name(path) => check_name(path, variable, expr.span)?,
        ExprKind::Call {
            function,
            function_span,
            ..
        } => check_name(function, variable, *function_span)?,
        _ => {}
    }
    expr.kind
        .children()
        .try_for_each(|child| validate(child, variable))
}

fn check_name(path: &[String], variable: &str, span: Span) -> Result<(), PricingError> {
    if let [name] = path {
        if name == variable {
            return Ok(());
        }
    }
    if resolve(path).is_some() {
        return Ok(());
    }

    let message = match path {
        [name] => format!("name '{name}' is not available in payoff expressions"),
        [root, ..] if root == variable => {
            format!("attribute access on '{variable}' is not allowed")
        }
        _ => format!("'{}' is not available in payoff expressions", dotted(path)),
    };
    Err(PricingError::unsafe_expr(message, span))
}

/// Lowers a validated AST into IR, folding subtrees that do not depend on the
/// free variable.
pub fn lower(expr: &AstExpr, variable: &str) -> Result<Expr, PricingError> {
    let lowered = match &expr.kind {
        ExprKind::Number(n) => Expr::Const(*n),
        ExprKind::Bool(b) => Expr::Const(ir::from_bool(*b)),
        ExprKind::Name(path) => lower_name(path, variable, expr.span)?,
        ExprKind::Unary { op, operand } => {
            let operand = lower(operand, variable)?;
            match op {
                ast::UnaryOp::Neg => Expr::Neg(Box::new(operand)),
                ast::UnaryOp::Pos => operand,
            }
        }
        ExprKind::Binary { op, lhs, rhs } => Expr::Binary {
            op: lower_binop(*op),
            lhs: Box::new(lower(lhs, variable)?),
            rhs: Box::new(lower(rhs, variable)?),
        },
        ExprKind::Arith { first, rest } => Expr::Chain {
            first: Box::new(lower(first, variable)?),
            rest: rest
                .iter()
                .map(|(op, e)| lower(e, variable).map(|e| (lower_binop(*op), e)))
                .collect::<Result<Vec<_>, _>>()?,
        },
        ExprKind::Compare { first, rest } => Expr::Compare {
            first: Box::new(lower(first, variable)?),
            rest: rest
                .iter()
                .map(|(op, e)| lower(e, variable).map(|e| (lower_cmpop(*op), e)))
                .collect::<Result<Vec<_>, _>>()?,
        },
        ExprKind::Logical { op, operands } => {
            let operands = operands
                .iter()
                .map(|e| lower(e, variable))
                .collect::<Result<Vec<_>, _>>()?;
            match op {
                ast::LogicalOp::And => Expr::And(operands),
                ast::LogicalOp::Or => Expr::Or(operands),
            }
        }
        ExprKind::Conditional { body, test, orelse } => {
            let test = lower(test, variable)?;
            let body = lower(body, variable)?;
            let orelse = lower(orelse, variable)?;
            match test.as_const() {
                Some(t) if ir::truthy(t) => body,
                Some(_) => orelse,
                None => Expr::Conditional {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
            }
        }
        ExprKind::Call {
            function,
            function_span,
            args,
        } => lower_call(function, *function_span, args, variable, expr.span)?,
    };

    Ok(fold(lowered))
}

fn lower_name(path: &[String], variable: &str, span: Span) -> Result<Expr, PricingError> {
    if matches!(path, [name] if name == variable) {
        return Ok(Expr::Var);
    }
    match resolve(path) {
        Some(Member::Constant(v)) => Ok(Expr::Const(v)),
        Some(Member::Function(f)) => Err(PricingError::syntax(
            format!("'{}' is a function and must be called", f.name()),
            span,
        )),
        Some(Member::Module) => Err(PricingError::syntax(
            "'math' is a module; use one of its members such as math.exp",
            span,
        )),
        None => Err(PricingError::unsafe_expr(
            format!("'{}' is not available in payoff expressions", dotted(path)),
            span,
        )),
    }
}

fn lower_call(
    function: &[String],
    function_span: Span,
    args: &[AstExpr],
    variable: &str,
    span: Span,
) -> Result<Expr, PricingError> {
    let name = dotted(function);
    let func = match resolve(function) {
        Some(Member::Function(f)) => f,
        Some(_) => {
            return Err(PricingError::syntax(
                format!("'{name}' is not callable"),
                function_span,
            ));
        }
        None if matches!(function, [n] if n == variable) => {
            return Err(PricingError::syntax(
                format!("'{name}' is a number and is not callable"),
                function_span,
            ));
        }
        None => {
            return Err(PricingError::unsafe_expr(
                format!("'{name}' is not available in payoff expressions"),
                function_span,
            ));
        }
    };

    if !func.arity().accepts(args.len()) {
        return Err(PricingError::syntax(
            format!(
                "{}() takes {}, got {}",
                func.name(),
                func.arity(),
                args.len()
            ),
            span,
        ));
    }

    let args = args
        .iter()
        .map(|a| lower(a, variable))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Call { func, args })
}

fn lower_binop(op: ast::BinaryOp) -> BinOp {
    match op {
        ast::BinaryOp::Add => BinOp::Add,
        ast::BinaryOp::Sub => BinOp::Sub,
        ast::BinaryOp::Mul => BinOp::Mul,
        ast::BinaryOp::Div => BinOp::Div,
        ast::BinaryOp::Mod => BinOp::Mod,
        ast::BinaryOp::Pow => BinOp::Pow,
    }
}

fn lower_cmpop(op: ast::CompareOp) -> CmpOp {
    match op {
        ast::CompareOp::Eq => CmpOp::Eq,
        ast::CompareOp::Ne => CmpOp::Ne,
        ast::CompareOp::Lt => CmpOp::Lt,
        ast::CompareOp::Le => CmpOp::Le,
        ast::CompareOp::Gt => CmpOp::Gt,
        ast::CompareOp::Ge => CmpOp::Ge,
    }
}

/// Replaces a node whose children are all constants by its value.
fn fold(expr: Expr) -> Expr {
    if !matches!(expr, Expr::Const(_)) && expr.children_are_const() {
        Expr::Const(evaluate(&expr, f64::NAN))
    } else {
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::namespace::BuiltinFn;

    fn compile_s(source: &str) -> Result<Expr, PricingError> {
        compile(source, "s")
    }

    #[test]
    fn empty_and_blank_sources_are_empty_expressions() {
        assert_eq!(compile_s(""), Err(PricingError::EmptyExpression));
        assert_eq!(compile_s("  \n\t "), Err(PricingError::EmptyExpression));
    }

    #[test]
    fn constants_fold() {
        assert_eq!(compile_s("2 ** 3 + math.pi * 0").unwrap(), Expr::Const(8.0));
        assert_eq!(compile_s("-2 ** 2").unwrap(), Expr::Const(-4.0));
        assert_eq!(compile_s("max(1, 2, 3)").unwrap(), Expr::Const(3.0));
        assert_eq!(compile_s("True + True").unwrap(), Expr::Const(2.0));
        assert_eq!(
            compile_s("s if 1 < 2 else 0").unwrap(),
            Expr::Var,
            "constant test selects a branch"
        );
    }

    #[test]
    fn long_sums_compile_and_fold() {
        let strip = (0..150)
            .map(|k| format!("max(s - {k}, 0)"))
            .collect::<Vec<_>>()
            .join(" + ");
        let payoff = compile_s(&strip).unwrap();
        assert!(matches!(&payoff, Expr::Chain { rest, .. } if rest.len() == 149));
        assert_eq!(evaluate(&payoff, 200.0), (0..150).map(|k| 200.0 - k as f64).sum::<f64>());

        let ones = vec!["1"; 300].join(" + ");
        assert_eq!(compile_s(&ones).unwrap(), Expr::Const(300.0));
    }

    #[test]
    fn variable_dependent_subtrees_stay() {
        let ir = compile_s("max(s - math.e * 0, 0)").unwrap();
        match ir {
            Expr::Call { func, args } => {
                assert_eq!(func, BuiltinFn::Max);
                assert!(args[0].uses_var());
                assert_eq!(args[1], Expr::Const(0.0));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn unknown_names_are_unsafe() {
        for source in [
            "x + 1",
            "__import__('os')",
            "abs(s)",
            "math.system(1)",
            "s.real",
            "math.__dict__",
            "None",
            "eval(s)",
            "max(s, 0) + open",
        ] {
            let err = compile_s(source).unwrap_err();
            assert!(
                matches!(err, PricingError::UnsafeExpression { .. }),
                "{source}: {err:?}"
            );
        }
    }

    #[test]
    fn unsafe_names_take_priority_over_arity_errors() {
        let err = compile_s("max(s) + secret").unwrap_err();
        assert!(matches!(err, PricingError::UnsafeExpression { .. }));
    }

    #[test]
    fn arity_and_callability_errors_are_syntax() {
        for source in [
            "math.exp()",
            "max(s)",
            "math.log(s, 2, 3)",
            "math.pi(1)",
            "s(2)",
            "max",
            "math",
            "math(1)",
            "s + math.sqrt",
        ] {
            let err = compile_s(source).unwrap_err();
            assert!(
                matches!(err, PricingError::InvalidSyntax { .. }),
                "{source}: {err:?}"
            );
        }
    }

    #[test]
    fn arity_message_names_function() {
        let err = compile_s("math.exp(1, 2)").unwrap_err();
        assert!(
            err.to_string().contains("math.exp() takes exactly 1 argument, got 2"),
            "{err}"
        );
    }

    #[test]
    fn custom_variable_name() {
        assert_eq!(compile("spot", "spot").unwrap(), Expr::Var);
        assert!(matches!(
            compile("s", "spot").unwrap_err(),
            PricingError::UnsafeExpression { .. }
        ));
    }
}
