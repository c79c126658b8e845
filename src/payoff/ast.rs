//! Abstract syntax tree for payoff expressions.
//!
//! Each node carries a source `Span` for error reporting and its subtree depth,
//! which the parser bounds so later recursive passes cannot exhaust the stack.

use crate::core::Span;

/// Expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    depth: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        let depth = 1 + kind.children().map(Expr::depth).max().unwrap_or(0);
        Self { kind, span, depth }
    }

    /// Height of the subtree rooted here (a leaf has depth 1).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal (e.g. `100`, `1e-3`, `0x10`).
    Number(f64),
    /// `True` / `False`.
    Bool(bool),
    /// Name or dotted name (`s`, `math.exp`).
    Name(Vec<String>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `**`; the other arithmetic operators parse to [`ExprKind::Arith`].
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Left-associative chain of one precedence level (`a - b + c`, `a * b / c`),
    /// flattened so a long sum adds no height.
    Arith {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    /// Comparison chain `a < b <= c`.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    /// `a and b and c` / `a or b or c`, flattened.
    Logical { op: LogicalOp, operands: Vec<Expr> },
    /// `body if test else orelse`.
    Conditional {
        body: Box<Expr>,
        test: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// Call of a (possibly dotted) name with positional arguments.
    Call {
        function: Vec<String>,
        function_span: Span,
        args: Vec<Expr>,
    },
}

impl ExprKind {
    /// Direct child expressions in evaluation order.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Expr> + '_> {
        match self {
            Self::Number(_) | Self::Bool(_) | Self::Name(_) => Box::new(std::iter::empty()),
            Self::Unary { operand, .. } => Box::new(std::iter::once(operand.as_ref())),
            Self::Binary { lhs, rhs, .. } => Box::new([lhs.as_ref(), rhs.as_ref()].into_iter()),
            Self::Arith { first, rest } => Box::new(
                std::iter::once(first.as_ref()).chain(rest.iter().map(|(_, expr)| expr)),
            ),
            Self::Compare { first, rest } => Box::new(
                std::iter::once(first.as_ref()).chain(rest.iter().map(|(_, expr)| expr)),
            ),
            Self::Logical { operands, .. } => Box::new(operands.iter()),
            Self::Conditional { body, test, orelse } => {
                Box::new([test.as_ref(), body.as_ref(), orelse.as_ref()].into_iter())
            }
            Self::Call { args, .. } => Box::new(args.iter()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Joins a dotted path for diagnostics (`["math", "exp"]` -> `math.exp`).
pub fn dotted(path: &[String]) -> String {
    path.join(".")
}
