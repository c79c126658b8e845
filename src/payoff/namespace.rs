//! Fixed table of names a payoff expression may reference besides its variable.

use std::f64::consts::{E, PI, TAU};
use std::fmt;

use statrs::function::erf::{erf, erfc};
use statrs::function::gamma::{gamma, ln_gamma};

/// Module prefix for the math members.
pub const MATH_MODULE: &str = "math";

/// Callable members of the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFn {
    Max,
    Min,
    Exp,
    Expm1,
    Log,
    Log1p,
    Log2,
    Log10,
    Sqrt,
    Pow,
    Fabs,
    Floor,
    Ceil,
    Trunc,
    Fmod,
    Copysign,
    Hypot,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Erf,
    Erfc,
    Gamma,
    Lgamma,
}

const MATH_FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("exp", BuiltinFn::Exp),
    ("expm1", BuiltinFn::Expm1),
    ("log", BuiltinFn::Log),
    ("log1p", BuiltinFn::Log1p),
    ("log2", BuiltinFn::Log2),
    ("log10", BuiltinFn::Log10),
    ("sqrt", BuiltinFn::Sqrt),
    ("pow", BuiltinFn::Pow),
    ("fabs", BuiltinFn::Fabs),
    ("floor", BuiltinFn::Floor),
    ("ceil", BuiltinFn::Ceil),
    ("trunc", BuiltinFn::Trunc),
    ("fmod", BuiltinFn::Fmod),
    ("copysign", BuiltinFn::Copysign),
    ("hypot", BuiltinFn::Hypot),
    ("sin", BuiltinFn::Sin),
    ("cos", BuiltinFn::Cos),
    ("tan", BuiltinFn::Tan),
    ("asin", BuiltinFn::Asin),
    ("acos", BuiltinFn::Acos),
    ("atan", BuiltinFn::Atan),
    ("atan2", BuiltinFn::Atan2),
    ("sinh", BuiltinFn::Sinh),
    ("cosh", BuiltinFn::Cosh),
    ("tanh", BuiltinFn::Tanh),
    ("erf", BuiltinFn::Erf),
    ("erfc", BuiltinFn::Erfc),
    ("gamma", BuiltinFn::Gamma),
    ("lgamma", BuiltinFn::Lgamma),
];

const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("pi", PI),
    ("e", E),
    ("tau", TAU),
    ("inf", f64::INFINITY),
    ("nan", f64::NAN),
];

/// Accepted argument counts of a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    #[inline]
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exact(k) => n == k,
            Self::Range(lo, hi) => (lo..=hi).contains(&n),
            Self::AtLeast(lo) => n >= lo,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match *self {
            Self::Exact(k) => write!(f, "exactly {k} argument{}", plural(k)),
            Self::Range(lo, hi) => write!(f, "{lo} to {hi} arguments"),
            Self::AtLeast(lo) => write!(f, "at least {lo} argument{}", plural(lo)),
        }
    }
}

/// What a resolved name refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Member {
    Function(BuiltinFn),
    Constant(f64),
    /// The bare `math` module, only usable as a prefix.
    Module,
}

/// Resolves a dotted path against the fixed table (the free variable is
/// resolved by the compiler).
pub fn resolve(path: &[String]) -> Option<Member> {
    match path {
        [name] if name == "max" => Some(Member::Function(BuiltinFn::Max)),
        [name] if name == "min" => Some(Member::Function(BuiltinFn::Min)),
        [name] if name == MATH_MODULE => Some(Member::Module),
        [module, member] if module == MATH_MODULE => MATH_FUNCTIONS
            .iter()
            .find(|(n, _)| n == member)
            .map(|(_, f)| Member::Function(*f))
            .or_else(|| {
                MATH_CONSTANTS
                    .iter()
                    .find(|(n, _)| n == member)
                    .map(|(_, v)| Member::Constant(*v))
            }),
        _ => None,
    }
}

/// Names reserved by the namespace itself.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, "max" | "min" | MATH_MODULE)
}

impl BuiltinFn {
    pub fn name(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Exp => "math.exp",
            Self::Expm1 => "math.expm1",
            Self::Log => "math.log",
            Self::Log1p => "math.log1p",
            Self::Log2 => "math.log2",
            Self::Log10 => "math.log10",
            Self::Sqrt => "math.sqrt",
            Self::Pow => "math.pow",
            Self::Fabs => "math.fabs",
            Self::Floor => "math.floor",
            Self::Ceil => "math.ceil",
            Self::Trunc => "math.trunc",
            Self::Fmod => "math.fmod",
            Self::Copysign => "math.copysign",
            Self::Hypot => "math.hypot",
            Self::Sin => "math.sin",
            Self::Cos => "math.cos",
            Self::Tan => "math.tan",
            Self::Asin => "math.asin",
            Self::Acos => "math.acos",
            Self::Atan => "math.atan",
            Self::Atan2 => "math.atan2",
            Self::Sinh => "math.sinh",
            Self::Cosh => "math.cosh",
            Self::Tanh => "math.tanh",
            Self::Erf => "math.erf",
            Self::Erfc => "math.erfc",
            Self::Gamma => "math.gamma",
            Self::Lgamma => "math.lgamma",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::Max | Self::Min => Arity::AtLeast(2),
            Self::Log => Arity::Range(1, 2),
            Self::Pow | Self::Fmod | Self::Copysign | Self::Atan2 => Arity::Exact(2),
            Self::Hypot => Arity::AtLeast(0),
            _ => Arity::Exact(1),
        }
    }

    /// Applies the function. Domain errors and overflow produce NaN / ±inf.
    ///
    /// `args.len()` must satisfy [`BuiltinFn::arity`]; the compiler checks this.
    pub fn apply(self, args: &[f64]) -> f64 {
        match (self, args) {
            (Self::Max, [first, rest @ ..]) => {
                rest.iter()
                    .fold(*first, |best, &v| if v > best { v } else { best })
            }
            (Self::Min, [first, rest @ ..]) => {
                rest.iter()
                    .fold(*first, |best, &v| if v < best { v } else { best })
            }
            (Self::Log, [x, base]) => x.ln() / base.ln(),
            (Self::Pow, [x, y]) => x.powf(*y),
            (Self::Fmod, [x, y]) => x % y,
            (Self::Copysign, [x, y]) => x.copysign(*y),
            (Self::Atan2, [y, x]) => y.atan2(*x),
            (Self::Hypot, xs) => xs.iter().fold(0.0, |acc: f64, &x| acc.hypot(x)),
            (f, [x]) => f.apply_unary(*x),
            _ => f64::NAN,
        }
    }

    #[inline]
    fn apply_unary(self, x: f64) -> f64 {
        match self {
            Self::Exp => x.exp(),
            Self::Expm1 => x.exp_m1(),
            Self::Log => x.ln(),
            Self::Log1p => x.ln_1p(),
            Self::Log2 => x.log2(),
            Self::Log10 => x.log10(),
            Self::Sqrt => x.sqrt(),
            Self::Fabs => x.abs(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Trunc => x.trunc(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Erf => erf(x),
            Self::Erfc => erfc(x),
            Self::Gamma => gamma_fn(x),
            Self::Lgamma => lgamma_fn(x),
            _ => f64::NAN,
        }
    }
}

/// Gamma with C `tgamma` conventions at the poles.
fn gamma_fn(x: f64) -> f64 {
    if x == 0.0 {
        f64::INFINITY.copysign(x)
    } else if x.is_nan() || x == f64::NEG_INFINITY || (x < 0.0 && x.fract() == 0.0) {
        f64::NAN
    } else if x == f64::INFINITY {
        f64::INFINITY
    } else {
        gamma(x)
    }
}

/// `ln |Γ(x)|`, using reflection below one half. Poles give `+inf` as C `lgamma` does.
fn lgamma_fn(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.is_infinite() || (x <= 0.0 && x.fract() == 0.0) {
        return f64::INFINITY;
    }
    if x < 0.5 {
        (PI / (PI * x).sin().abs()).ln() - ln_gamma(1.0 - x)
    } else {
        ln_gamma(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn resolves_table_members() {
        assert_eq!(resolve(&path(&["max"])), Some(Member::Function(BuiltinFn::Max)));
        assert_eq!(
            resolve(&path(&["math", "erf"])),
            Some(Member::Function(BuiltinFn::Erf))
        );
        assert_eq!(resolve(&path(&["math", "pi"])), Some(Member::Constant(PI)));
        assert_eq!(resolve(&path(&["math"])), Some(Member::Module));
        assert_eq!(resolve(&path(&["math", "system"])), None);
        assert_eq!(resolve(&path(&["math", "exp", "x"])), None);
        assert_eq!(resolve(&path(&["abs"])), None);
        assert_eq!(resolve(&path(&["max", "x"])), None);
    }

    #[test]
    fn every_math_function_round_trips_through_its_name() {
        for (member, f) in MATH_FUNCTIONS {
            assert_eq!(f.name(), format!("math.{member}"));
        }
    }

    #[test]
    fn max_min_keep_first_on_ties_and_nan() {
        assert_eq!(BuiltinFn::Max.apply(&[1.0, 3.0, 2.0]), 3.0);
        assert_eq!(BuiltinFn::Min.apply(&[1.0, 3.0, -2.0]), -2.0);
        assert!(BuiltinFn::Max.apply(&[f64::NAN, 1.0]).is_nan());
        assert_eq!(BuiltinFn::Max.apply(&[1.0, f64::NAN]), 1.0);
        let zero = BuiltinFn::Max.apply(&[-0.0, 0.0]);
        assert!(zero.is_sign_negative());
    }

    #[test]
    fn arity_table() {
        assert!(BuiltinFn::Log.arity().accepts(2));
        assert!(!BuiltinFn::Log.arity().accepts(3));
        assert!(!BuiltinFn::Max.arity().accepts(1));
        assert!(BuiltinFn::Hypot.arity().accepts(0));
        assert_eq!(BuiltinFn::Exp.arity().to_string(), "exactly 1 argument");
        assert_eq!(BuiltinFn::Log.arity().to_string(), "1 to 2 arguments");
    }

    #[test]
    fn math_functions_follow_libm() {
        assert_relative_eq!(BuiltinFn::Log.apply(&[100.0, 10.0]), 2.0, epsilon = 1e-15);
        assert_relative_eq!(BuiltinFn::Hypot.apply(&[3.0, 4.0]), 5.0);
        assert_eq!(BuiltinFn::Hypot.apply(&[]), 0.0);
        assert_eq!(BuiltinFn::Fmod.apply(&[-7.0, 3.0]), -1.0);
        assert_relative_eq!(BuiltinFn::Erf.apply(&[0.5]), 0.520_499_877_813_046_5, epsilon = 1e-12);
        assert_relative_eq!(BuiltinFn::Gamma.apply(&[5.0]), 24.0, epsilon = 1e-10);
        assert_relative_eq!(
            BuiltinFn::Lgamma.apply(&[-0.5]),
            (2.0 * PI.sqrt()).ln(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn domain_errors_are_ieee() {
        assert!(BuiltinFn::Sqrt.apply(&[-1.0]).is_nan());
        assert_eq!(BuiltinFn::Log.apply(&[0.0]), f64::NEG_INFINITY);
        assert!(BuiltinFn::Gamma.apply(&[-2.0]).is_nan());
        assert_eq!(BuiltinFn::Gamma.apply(&[0.0]), f64::INFINITY);
        for pole in [0.0, -0.0, -1.0, -2.0, -1e6] {
            assert_eq!(BuiltinFn::Lgamma.apply(&[pole]), f64::INFINITY, "lgamma({pole})");
        }
        assert!(BuiltinFn::Lgamma.apply(&[-2.5]).is_finite());
    }
}
