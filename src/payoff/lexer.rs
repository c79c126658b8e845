//! Lexer for payoff expressions.
//!
//! Whitespace (newlines included) and `#` comments are skipped. Constructs that
//! belong to the wider expression language but are refused by the sandbox
//! (string literals, subscripts, assignments, bitwise operators, statement
//! keywords) are emitted as [`TokenKind::Forbidden`] so the parser can report
//! them as unsafe rather than malformed.

use crate::core::{PricingError, Span};

/// Token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    True,
    False,

    // Identifiers
    Ident(String),

    // Keywords
    If,
    Else,
    And,
    Or,

    // Punctuation
    LParen,
    RParen,
    Comma,
    Dot,
    EqEq,       // ==
    Ne,         // !=
    Lt,         // <
    Le,         // <=
    Gt,         // >
    Ge,         // >=
    Plus,
    Minus,
    Star,
    DoubleStar, // **
    Slash,
    Percent,

    /// Recognized construct outside the sandbox, with a short description.
    Forbidden(&'static str),
}

impl TokenKind {
    /// Short human-readable form used in parser diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::True => "'True'".to_string(),
            Self::False => "'False'".to_string(),
            Self::Ident(name) => format!("name '{name}'"),
            Self::If => "'if'".to_string(),
            Self::Else => "'else'".to_string(),
            Self::And => "'and'".to_string(),
            Self::Or => "'or'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Dot => "'.'".to_string(),
            Self::EqEq => "'=='".to_string(),
            Self::Ne => "'!='".to_string(),
            Self::Lt => "'<'".to_string(),
            Self::Le => "'<='".to_string(),
            Self::Gt => "'>'".to_string(),
            Self::Ge => "'>='".to_string(),
            Self::Plus => "'+'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Star => "'*'".to_string(),
            Self::DoubleStar => "'**'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Percent => "'%'".to_string(),
            Self::Forbidden(what) => (*what).to_string(),
        }
    }
}

/// Keywords of the wider language that the sandbox refuses outright.
const FORBIDDEN_KEYWORDS: &[(&str, &str)] = &[
    ("not", "'not' operator"),
    ("is", "'is' operator"),
    ("in", "'in' operator"),
    ("lambda", "lambda expression"),
    ("import", "import statement"),
    ("from", "'from' keyword"),
    ("for", "comprehension or loop"),
    ("while", "loop"),
    ("def", "function definition"),
    ("class", "class definition"),
    ("return", "'return' statement"),
    ("yield", "'yield' expression"),
    ("await", "'await' expression"),
    ("async", "'async' keyword"),
    ("global", "'global' statement"),
    ("nonlocal", "'nonlocal' statement"),
    ("del", "'del' statement"),
    ("pass", "'pass' statement"),
    ("with", "'with' statement"),
    ("as", "'as' keyword"),
    ("try", "'try' statement"),
    ("except", "'except' clause"),
    ("finally", "'finally' clause"),
    ("raise", "'raise' statement"),
    ("assert", "'assert' statement"),
    ("break", "'break' statement"),
    ("continue", "'continue' statement"),
    ("elif", "'elif' clause"),
];

/// Returns true if `word` is a keyword, accepted or not.
pub(crate) fn is_keyword(word: &str) -> bool {
    matches!(word, "if" | "else" | "and" | "or" | "True" | "False" | "None")
        || FORBIDDEN_KEYWORDS.iter().any(|(kw, _)| *kw == word)
}

/// Tokenize a payoff expression.
pub fn tokenize(source: &str) -> Result<Vec<Token>, PricingError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos];

        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Comment runs to end of line.
        if ch == b'#' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        // Explicit line continuation.
        if ch == b'\\' {
            let rest = &bytes[pos + 1..];
            let skip = match rest {
                [b'\n', ..] => 2,
                [b'\r', b'\n', ..] => 3,
                _ => {
                    return Err(PricingError::syntax(
                        "unexpected character after line continuation",
                        Span::new(pos, pos + 1),
                    ));
                }
            };
            pos += skip;
            continue;
        }

        let start = pos;

        if ch == b'"' || ch == b'\'' {
            let end = lex_string(bytes, pos)?;
            tokens.push(Token {
                kind: TokenKind::Forbidden("string literal"),
                span: Span::new(start, end),
            });
            pos = end;
            continue;
        }

        if ch.is_ascii_digit()
            || (ch == b'.' && pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_digit())
        {
            let (kind, end) = lex_number(source, pos)?;
            tokens.push(Token {
                kind,
                span: Span::new(start, end),
            });
            pos = end;
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            let end = lex_ident_end(bytes, pos);
            let word = &source[pos..end];

            // String prefixes such as r'..', b"..", f'..'.
            if end < bytes.len()
                && (bytes[end] == b'"' || bytes[end] == b'\'')
                && is_string_prefix(word)
            {
                let str_end = lex_string(bytes, end)?;
                tokens.push(Token {
                    kind: TokenKind::Forbidden("string literal"),
                    span: Span::new(start, str_end),
                });
                pos = str_end;
                continue;
            }

            let kind = match word {
                "True" => TokenKind::True,
                "False" => TokenKind::False,
                "if" => TokenKind::If,
                "else" => TokenKind::Else,
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                _ => FORBIDDEN_KEYWORDS
                    .iter()
                    .find(|(kw, _)| *kw == word)
                    .map_or_else(
                        || TokenKind::Ident(word.to_string()),
                        |(_, what)| TokenKind::Forbidden(*what),
                    ),
            };
            tokens.push(Token {
                kind,
                span: Span::new(start, end),
            });
            pos = end;
            continue;
        }

        // Three-character operators.
        if pos + 2 < bytes.len() {
            let kind = match &bytes[pos..pos + 3] {
                b"**=" | b"//=" | b">>=" | b"<<=" => {
                    Some(TokenKind::Forbidden("augmented assignment"))
                }
                b"..." => Some(TokenKind::Forbidden("ellipsis")),
                _ => None,
            };
            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    span: Span::new(start, pos + 3),
                });
                pos += 3;
                continue;
            }
        }

        // Two-character operators.
        if pos + 1 < bytes.len() {
            let kind = match &bytes[pos..pos + 2] {
                b"**" => Some(TokenKind::DoubleStar),
                b"==" => Some(TokenKind::EqEq),
                b"!=" => Some(TokenKind::Ne),
                b"<=" => Some(TokenKind::Le),
                b">=" => Some(TokenKind::Ge),
                b"//" => Some(TokenKind::Forbidden("floor division operator")),
                b"<<" | b">>" => Some(TokenKind::Forbidden("shift operator")),
                b":=" => Some(TokenKind::Forbidden("assignment expression")),
                b"->" => Some(TokenKind::Forbidden("annotation arrow")),
                b"+=" | b"-=" | b"*=" | b"/=" | b"%=" | b"&=" | b"|=" | b"^=" | b"@=" => {
                    Some(TokenKind::Forbidden("augmented assignment"))
                }
                _ => None,
            };
            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    span: Span::new(start, pos + 2),
                });
                pos += 2;
                continue;
            }
        }

        let kind = match ch {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'[' | b']' => TokenKind::Forbidden("subscript or list display"),
            b'{' | b'}' => TokenKind::Forbidden("dict or set display"),
            b'=' => TokenKind::Forbidden("assignment"),
            b':' => TokenKind::Forbidden("':' (slice, annotation or lambda body)"),
            b';' => TokenKind::Forbidden("statement separator"),
            b'&' | b'|' | b'^' | b'~' => TokenKind::Forbidden("bitwise operator"),
            b'@' => TokenKind::Forbidden("matrix multiplication or decorator"),
            _ => {
                let found = source[pos..].chars().next().unwrap_or('?');
                return Err(PricingError::syntax(
                    format!("unexpected character '{found}'"),
                    Span::new(start, start + found.len_utf8()),
                ));
            }
        };
        tokens.push(Token {
            kind,
            span: Span::new(start, pos + 1),
        });
        pos += 1;
    }

    Ok(tokens)
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

/// Returns the byte offset just past the closing quote.
fn lex_string(bytes: &[u8], start: usize) -> Result<usize, PricingError> {
    let quote = bytes[start];
    let triple = bytes.len() >= start + 3 && bytes[start + 1] == quote && bytes[start + 2] == quote;
    let mut pos = if triple { start + 3 } else { start + 1 };

    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b'\\' {
            pos += 2;
            continue;
        }
        if triple {
            if b == quote
                && pos + 2 < bytes.len()
                && bytes[pos + 1] == quote
                && bytes[pos + 2] == quote
            {
                return Ok(pos + 3);
            }
        } else if b == quote {
            return Ok(pos + 1);
        } else if b == b'\n' {
            break;
        }
        pos += 1;
    }

    Err(PricingError::syntax(
        "unterminated string literal",
        Span::new(start, pos.min(bytes.len())),
    ))
}

/// Consumes a run of digits accepted by `is_digit`, allowing single `_`
/// separators between digits.
fn lex_digits(
    source: &str,
    mut pos: usize,
    is_digit: impl Fn(u8) -> bool,
    out: &mut String,
) -> Result<usize, PricingError> {
    let bytes = source.as_bytes();
    while pos < bytes.len() {
        let b = bytes[pos];
        if is_digit(b) {
            out.push(b as char);
            pos += 1;
        } else if b == b'_'
            && pos + 1 < bytes.len()
            && is_digit(bytes[pos + 1])
            && !out.is_empty()
        {
            pos += 1;
        } else if b == b'_' {
            return Err(PricingError::syntax(
                "invalid digit separator",
                Span::new(pos, pos + 1),
            ));
        } else {
            break;
        }
    }
    Ok(pos)
}

fn lex_number(source: &str, start: usize) -> Result<(TokenKind, usize), PricingError> {
    let bytes = source.as_bytes();

    if bytes[start] == b'0' && start + 1 < bytes.len() {
        let radix = match bytes[start + 1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return lex_radix_integer(source, start, radix);
        }
    }

    let mut text = String::new();
    let mut pos = lex_digits(source, start, |b| b.is_ascii_digit(), &mut text)?;
    let mut is_integer = true;

    if pos < bytes.len() && bytes[pos] == b'.' {
        is_integer = false;
        text.push('.');
        let mut fraction = String::new();
        pos = lex_digits(source, pos + 1, |b| b.is_ascii_digit(), &mut fraction)?;
        text.push_str(&fraction);
    }

    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp_pos = pos + 1;
        let mut exponent = String::from("e");
        if exp_pos < bytes.len() && (bytes[exp_pos] == b'+' || bytes[exp_pos] == b'-') {
            exponent.push(bytes[exp_pos] as char);
            exp_pos += 1;
        }
        if exp_pos < bytes.len() && bytes[exp_pos].is_ascii_digit() {
            let mut digits = String::new();
            pos = lex_digits(source, exp_pos, |b| b.is_ascii_digit(), &mut digits)?;
            exponent.push_str(&digits);
            text.push_str(&exponent);
            is_integer = false;
        }
    }

    if pos < bytes.len() && (bytes[pos] == b'j' || bytes[pos] == b'J') {
        return Ok((TokenKind::Forbidden("complex literal"), pos + 1));
    }
    check_literal_end(bytes, start, pos)?;

    if is_integer && text.len() > 1 && text.starts_with('0') && text.bytes().any(|b| b != b'0') {
        return Err(PricingError::syntax(
            "leading zeros in decimal integer literals are not permitted",
            Span::new(start, pos),
        ));
    }

    // A bare "." never reaches here: the caller requires a digit after it.
    let value = text.parse::<f64>().map_err(|_| {
        PricingError::syntax(format!("invalid number literal '{text}'"), Span::new(start, pos))
    })?;
    Ok((TokenKind::Number(value), pos))
}

fn lex_radix_integer(
    source: &str,
    start: usize,
    radix: u32,
) -> Result<(TokenKind, usize), PricingError> {
    let bytes = source.as_bytes();
    let mut digits = String::new();
    // Python allows one separator right after the prefix (`0x_ff`).
    let mut pos = start + 2;
    if pos + 1 < bytes.len() && bytes[pos] == b'_' && (bytes[pos + 1] as char).is_digit(radix) {
        pos += 1;
    }
    pos = lex_digits(source, pos, |b| (b as char).is_digit(radix), &mut digits)?;

    if digits.is_empty() {
        return Err(PricingError::syntax(
            "integer literal has no digits after its base prefix",
            Span::new(start, pos),
        ));
    }
    check_literal_end(bytes, start, pos)?;

    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0_f64, |acc, d| acc.mul_add(f64::from(radix), f64::from(d)));
    Ok((TokenKind::Number(value), pos))
}

/// A literal must not run straight into an identifier character (`3s`, `0x1g`).
fn check_literal_end(bytes: &[u8], start: usize, pos: usize) -> Result<(), PricingError> {
    if pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        return Err(PricingError::syntax(
            "invalid number literal",
            Span::new(start, pos + 1),
        ));
    }
    Ok(())
}

fn lex_ident_end(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        pos += 1;
    }
    pos
}
