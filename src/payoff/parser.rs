//! Recursive-descent parser for payoff expressions.
//!
//! Precedence, loosest first: conditional `a if c else b`, `or`, `and`,
//! comparison chains, `+ -`, `* / %`, unary `+ -`, `**` (right-associative,
//! binding tighter than a unary operator on its left), calls and dotted names.

use crate::core::{PricingError, Span};
use crate::payoff::ast::*;
use crate::payoff::lexer::{Token, TokenKind};

/// Maximum nesting of parentheses, unary chains and subtree height. Operator
/// chains of one precedence level are flat, so their length is unbounded.
pub const MAX_DEPTH: usize = 100;

/// Parser state wrapping a token stream.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn current_span(&self) -> Span {
        self.peek().map_or_else(|| self.eof_span(), |t| t.span)
    }

    fn eof_span(&self) -> Span {
        if let Some(last) = self.tokens.last() {
            Span::new(last.span.end, last.span.end)
        } else {
            Span::new(0, 0)
        }
    }

    /// Error for whatever sits at the cursor when `expected` was required.
    fn unexpected(&self, expected: &str) -> PricingError {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Forbidden(what),
                span,
            }) => PricingError::unsafe_expr(
                format!("{what} is not allowed in payoff expressions"),
                *span,
            ),
            Some(tok) => PricingError::syntax(
                format!("expected {expected}, got {}", tok.kind.describe()),
                tok.span,
            ),
            None => PricingError::syntax(
                format!("expected {expected}, got end of expression"),
                self.eof_span(),
            ),
        }
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> Result<Span, PricingError> {
        match self.peek() {
            Some(tok) if &tok.kind == expected => {
                let span = tok.span;
                self.pos += 1;
                Ok(span)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn enter(&mut self) -> Result<(), PricingError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(PricingError::syntax(
                "expression is nested too deeply",
                self.current_span(),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn node(&self, kind: ExprKind, span: Span) -> Result<Expr, PricingError> {
        let expr = Expr::new(kind, span);
        if expr.depth() > MAX_DEPTH {
            return Err(PricingError::syntax("expression is nested too deeply", span));
        }
        Ok(expr)
    }
}

/// Parse a token stream into a single expression.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, PricingError> {
    let mut p = Parser::new(tokens);
    let expr = parse_expr(&mut p)?;
    match p.peek_kind() {
        None => Ok(expr),
        Some(TokenKind::Comma) => Err(PricingError::unsafe_expr(
            "tuple displays are not allowed in payoff expressions",
            p.current_span(),
        )),
        Some(_) => Err(p.unexpected("end of expression")),
    }
}

fn parse_expr(p: &mut Parser) -> Result<Expr, PricingError> {
    p.enter()?;
    let body = parse_or_expr(p)?;
    let expr = if matches!(p.peek_kind(), Some(TokenKind::If)) {
        p.advance();
        let test = parse_or_expr(p)?;
        p.expect(&TokenKind::Else, "'else' in conditional expression")?;
        let orelse = parse_expr(p)?;
        let span = body.span.to(orelse.span);
        p.node(
            ExprKind::Conditional {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            },
            span,
        )?
    } else {
        body
    };
    p.leave();
    Ok(expr)
}

fn parse_or_expr(p: &mut Parser) -> Result<Expr, PricingError> {
    parse_logical(p, LogicalOp::Or)
}

fn parse_and_expr(p: &mut Parser) -> Result<Expr, PricingError> {
    parse_logical(p, LogicalOp::And)
}

fn parse_logical(p: &mut Parser, op: LogicalOp) -> Result<Expr, PricingError> {
    let (token, next): (TokenKind, fn(&mut Parser) -> Result<Expr, PricingError>) = match op {
        LogicalOp::Or => (TokenKind::Or, parse_and_expr),
        LogicalOp::And => (TokenKind::And, parse_comparison),
    };

    let first = next(p)?;
    if p.peek_kind() != Some(&token) {
        return Ok(first);
    }

    let mut operands = vec![first];
    while p.peek_kind() == Some(&token) {
        p.advance();
        operands.push(next(p)?);
    }
    let span = operands[0].span.to(operands[operands.len() - 1].span);
    p.node(ExprKind::Logical { op, operands }, span)
}

fn parse_comparison(p: &mut Parser) -> Result<Expr, PricingError> {
    let first = parse_arith(p)?;
    let mut rest = Vec::new();
    loop {
        let op = match p.peek_kind() {
            Some(TokenKind::EqEq) => CompareOp::Eq,
            Some(TokenKind::Ne) => CompareOp::Ne,
            Some(TokenKind::Lt) => CompareOp::Lt,
            Some(TokenKind::Le) => CompareOp::Le,
            Some(TokenKind::Gt) => CompareOp::Gt,
            Some(TokenKind::Ge) => CompareOp::Ge,
            _ => break,
        };
        p.advance();
        rest.push((op, parse_arith(p)?));
    }

    if rest.is_empty() {
        return Ok(first);
    }
    let span = first.span.to(rest[rest.len() - 1].1.span);
    p.node(
        ExprKind::Compare {
            first: Box::new(first),
            rest,
        },
        span,
    )
}

fn parse_arith(p: &mut Parser) -> Result<Expr, PricingError> {
    parse_chain(p, parse_term, |kind| match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
    })
}

fn parse_term(p: &mut Parser) -> Result<Expr, PricingError> {
    parse_chain(p, parse_factor, |kind| match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        _ => None,
    })
}

/// Left-associative run of `operand (op operand)*` as one flat node.
fn parse_chain(
    p: &mut Parser,
    operand: fn(&mut Parser) -> Result<Expr, PricingError>,
    operator: fn(&TokenKind) -> Option<BinaryOp>,
) -> Result<Expr, PricingError> {
    let first = operand(p)?;
    let mut rest = Vec::new();
    while let Some(op) = p.peek_kind().and_then(operator) {
        p.advance();
        rest.push((op, operand(p)?));
    }

    if rest.is_empty() {
        return Ok(first);
    }
    let span = first.span.to(rest[rest.len() - 1].1.span);
    p.node(
        ExprKind::Arith {
            first: Box::new(first),
            rest,
        },
        span,
    )
}

fn parse_factor(p: &mut Parser) -> Result<Expr, PricingError> {
    let op = match p.peek_kind() {
        Some(TokenKind::Minus) => UnaryOp::Neg,
        Some(TokenKind::Plus) => UnaryOp::Pos,
        _ => return parse_power(p),
    };
    let start = p.current_span();
    p.enter()?;
    p.advance();
    let operand = parse_factor(p)?;
    p.leave();
    let span = start.to(operand.span);
    p.node(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    )
}

fn parse_power(p: &mut Parser) -> Result<Expr, PricingError> {
    let base = parse_postfix(p)?;
    if !matches!(p.peek_kind(), Some(TokenKind::DoubleStar)) {
        return Ok(base);
    }
    p.enter()?;
    p.advance();
    let exponent = parse_factor(p)?;
    p.leave();
    let span = base.span.to(exponent.span);
    p.node(
        ExprKind::Binary {
            op: BinaryOp::Pow,
            lhs: Box::new(base),
            rhs: Box::new(exponent),
        },
        span,
    )
}

fn parse_postfix(p: &mut Parser) -> Result<Expr, PricingError> {
    let expr = match p.peek_kind() {
        Some(TokenKind::Ident(_)) => parse_name_or_call(p)?,
        _ => parse_atom(p)?,
    };

    match p.peek_kind() {
        Some(TokenKind::Dot) => Err(PricingError::unsafe_expr(
            "attribute access is only allowed on names",
            p.current_span(),
        )),
        Some(TokenKind::LParen) => Err(PricingError::unsafe_expr(
            "only names can be called",
            p.current_span(),
        )),
        _ => Ok(expr),
    }
}

fn parse_name_or_call(p: &mut Parser) -> Result<Expr, PricingError> {
    let mut span = p.current_span();
    let mut path = Vec::new();
    loop {
        match p.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                path.push(name.clone());
                span = span.to(p.current_span());
                p.advance();
            }
            _ => return Err(p.unexpected("attribute name")),
        }
        if !matches!(p.peek_kind(), Some(TokenKind::Dot)) {
            break;
        }
        p.advance();
    }

    if !matches!(p.peek_kind(), Some(TokenKind::LParen)) {
        return p.node(ExprKind::Name(path), span);
    }

    p.advance();
    let mut args = Vec::new();
    let close = loop {
        match p.peek_kind() {
            Some(TokenKind::RParen) => break p.current_span(),
            Some(TokenKind::Star | TokenKind::DoubleStar) => {
                return Err(PricingError::unsafe_expr(
                    "argument unpacking is not allowed in payoff expressions",
                    p.current_span(),
                ));
            }
            _ => {}
        }

        let arg = parse_expr(p)?;
        if matches!(arg.kind, ExprKind::Name(_))
            && matches!(p.peek_kind(), Some(TokenKind::Forbidden("assignment")))
        {
            return Err(PricingError::unsafe_expr(
                "keyword arguments are not allowed in payoff expressions",
                arg.span.to(p.current_span()),
            ));
        }
        args.push(arg);

        match p.peek_kind() {
            Some(TokenKind::Comma) => {
                p.advance();
            }
            Some(TokenKind::RParen) => break p.current_span(),
            _ => return Err(p.unexpected("',' or ')' in argument list")),
        }
    };
    p.advance();

    p.node(
        ExprKind::Call {
            function: path,
            function_span: span,
            args,
        },
        span.to(close),
    )
}

fn parse_atom(p: &mut Parser) -> Result<Expr, PricingError> {
    let span = p.current_span();
    match p.peek_kind() {
        Some(TokenKind::Number(n)) => {
            let n = *n;
            p.advance();
            p.node(ExprKind::Number(n), span)
        }
        Some(TokenKind::True) => {
            p.advance();
            p.node(ExprKind::Bool(true), span)
        }
        Some(TokenKind::False) => {
            p.advance();
            p.node(ExprKind::Bool(false), span)
        }
        Some(TokenKind::LParen) => {
            p.advance();
            if matches!(p.peek_kind(), Some(TokenKind::RParen)) {
                return Err(PricingError::unsafe_expr(
                    "tuple displays are not allowed in payoff expressions",
                    span.to(p.current_span()),
                ));
            }
            let inner = parse_expr(p)?;
            if matches!(p.peek_kind(), Some(TokenKind::Comma)) {
                return Err(PricingError::unsafe_expr(
                    "tuple displays are not allowed in payoff expressions",
                    p.current_span(),
                ));
            }
            p.expect(&TokenKind::RParen, "')'")?;
            Ok(inner)
        }
        _ => Err(p.unexpected("expression")),
    }
}
