//! Payoff expressions: accepted language, sandbox rejections and error reporting.

use ferric_options::payoff::{PayoffCompiler, compile_payoff};
use ferric_options::{Payoff, PricingError};

fn eval(source: &str, s: f64) -> f64 {
    compile_payoff(source)
        .unwrap_or_else(|e| panic!("{source}: {e}"))
        .evaluate(s)
}

#[test]
fn vanilla_call_expression() {
    let payoff = compile_payoff("max(s - 100, 0)").unwrap();
    assert_eq!(payoff.evaluate(120.0), 20.0);
    assert_eq!(payoff.evaluate(80.0), 0.0);
}

#[test]
fn common_structured_payoffs() {
    // Digital, capped call, straddle, power, log contract, gap.
    assert_eq!(eval("10 if s >= 100 else 0", 100.0), 10.0);
    assert_eq!(eval("min(max(s - 100, 0), 25)", 140.0), 25.0);
    assert_eq!(eval("math.fabs(s - 100)", 93.0), 7.0);
    assert_eq!(eval("max(s ** 2 / 100 - 100, 0)", 110.0), 21.0);
    assert!(eval("math.log(s / 100)", 100.0).abs() < 1e-15);
    assert_eq!(eval("(s - 95) * (s > 100)", 105.0), 10.0);
    assert_eq!(eval("(s - 95) * (s > 100)", 99.0), 0.0);
}

#[test]
fn multi_line_expressions_with_comments() {
    let source = "max(\n    s - 100,  # intrinsic\n    0,\n)";
    assert_eq!(eval(source, 130.0), 30.0);
}

#[test]
fn math_namespace_members() {
    assert_eq!(eval("math.floor(s) + math.ceil(s)", 1.5), 3.0);
    assert_eq!(eval("math.trunc(s)", -1.7), -1.0);
    assert_eq!(eval("math.copysign(3, s)", -0.0), -3.0);
    assert_eq!(eval("math.hypot(3, s)", 4.0), 5.0);
    assert_eq!(eval("math.fmod(s, 3)", -7.0), -1.0);
    assert_eq!(eval("math.atan2(0, s)", -1.0), std::f64::consts::PI);
    assert_eq!(eval("math.gamma(s)", 5.0).round(), 24.0);
    assert!((eval("math.erf(s)", 1.0) - 0.842_700_792_949_714_9).abs() < 1e-12);
    assert_eq!(eval("math.tau / 2 == math.pi", 0.0), 1.0);
    assert_eq!(eval("math.inf > s", 1e300), 1.0);
    assert!(eval("math.nan", 0.0).is_nan());
}

#[test]
fn long_payoff_strips_compile() {
    let sum = vec!["s"; 101].join(" + ");
    assert_eq!(eval(&sum, 2.0), 202.0);

    let strip = (0..101)
        .map(|k| format!("max(s - {k}, 0)"))
        .collect::<Vec<_>>()
        .join(" + ");
    assert_eq!(eval(&strip, 50.0), (0..=50).map(|k| 50.0 - k as f64).sum::<f64>());
}

#[test]
fn empty_expression() {
    assert_eq!(compile_payoff("").unwrap_err(), PricingError::EmptyExpression);
    assert_eq!(
        compile_payoff(" \t\n ").unwrap_err(),
        PricingError::EmptyExpression
    );
}

#[test]
fn malformed_expressions_are_syntax_errors() {
    for source in [
        "s +",
        "max(s - 100, 0",
        "(s",
        "s 100",
        "1e",
        "09",
        "s $ 2",
        "s if s > 1",
        "max(s,, 0)",
        ")",
    ] {
        let err = compile_payoff(source).unwrap_err();
        assert!(
            matches!(err, PricingError::InvalidSyntax { .. }),
            "{source}: {err:?}"
        );
    }
}

#[test]
fn sandbox_escapes_are_unsafe() {
    for source in [
        "__import__('os')",
        "__import__('os').system('rm -rf /')",
        "open('/etc/passwd')",
        "eval('1')",
        "exec('x = 1')",
        "globals()",
        "s.__class__",
        "(1).__class__.__bases__",
        "math.__loader__",
        "[c for c in ().__class__.__base__.__subclasses__()]",
        "lambda: 0",
        "s[0]",
        "{}",
        "{'a': 1}",
        "not s",
        "s is None",
        "s in (1, 2)",
        "s // 2",
        "s << 1",
        "~s",
        "s & 1",
        "x := 1",
        "s = 1",
        "max(s, key=abs)",
        "max(*s)",
        "1, 2",
        "import os",
        "s; 1",
        "f'{s}'",
        "b'x'",
        "1j",
        "...",
        "s @ s",
    ] {
        let err = compile_payoff(source).unwrap_err();
        assert!(
            matches!(err, PricingError::UnsafeExpression { .. }),
            "{source}: {err:?}"
        );
    }
}

#[test]
fn unknown_variables_are_unsafe() {
    let err = compile_payoff("max(x - 100, 0)").unwrap_err();
    match err {
        PricingError::UnsafeExpression { message, span } => {
            assert!(message.contains("'x'"), "{message}");
            assert_eq!((span.start, span.end), (4, 5));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn usage_errors_on_allowed_names_are_syntax_errors() {
    for source in ["math.exp()", "max(s)", "math.pi(1)", "s(2)", "max", "min + 1"] {
        let err = compile_payoff(source).unwrap_err();
        assert!(
            matches!(err, PricingError::InvalidSyntax { .. }),
            "{source}: {err:?}"
        );
    }
}

#[test]
fn errors_describe_their_position() {
    let source = "max(s - 100,\n    0) +";
    let err = compile_payoff(source).unwrap_err();
    let text = err.describe(source);
    assert!(text.starts_with("invalid syntax"), "{text}");
    assert!(text.contains("line 2"), "{text}");
}

#[test]
fn arithmetic_faults_follow_ieee() {
    assert_eq!(eval("1 / (s - 100)", 100.0), f64::INFINITY);
    assert!(eval("s % 0", 5.0).is_nan());
    assert!(eval("math.acos(s)", 2.0).is_nan());
    assert_eq!(eval("math.exp(s)", 1e4), f64::INFINITY);
    assert_eq!(eval("math.lgamma(s)", -2.0), f64::INFINITY);
}

#[test]
fn custom_variable_name() {
    let compiler = PayoffCompiler::new().with_variable("spot").unwrap();
    let payoff = compiler.compile("max(spot - 100, 0)").unwrap();
    assert_eq!(payoff.evaluate(150.0), 50.0);
    assert!(matches!(
        compiler.compile("max(s - 100, 0)").unwrap_err(),
        PricingError::UnsafeExpression { .. }
    ));
}

#[test]
fn compiled_payoff_is_usable_as_trait_object() {
    let payoffs: Vec<Box<dyn Payoff>> = vec![
        Box::new(compile_payoff("max(s - 100, 0)").unwrap()),
        Box::new(|s: f64| (100.0 - s).max(0.0)),
    ];
    let values: Vec<f64> = payoffs.iter().map(|p| p.evaluate(90.0)).collect();
    assert_eq!(values, vec![0.0, 10.0]);
}
