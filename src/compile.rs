// SPDX: CC0-1.0

//! Turn normalized text into a callable function of `x`.
//!
//! Evaluation never executes anything but the postfix program built by
//! [`crate::parse`] over the identifiers in [`crate::stdlib`].

use crate::{
    eval::{self, EvalErr, Idents, Program},
    lex::{Lexer, SubStr},
    parse::{self, ParseErr},
    stdlib, Number,
};
use core::fmt;
use std::sync::Arc;

/// Words that stand for a value and so take part in implicit multiplication.
const VALUE_WORDS: &[&str] = &[stdlib::X, "pi", "tau", "e"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Piece {
    Number,
    Value,
    Fun,
    Open,
    Close,
    Other,
}

impl Piece {
    const fn needs_star(prev: Self, next: Self) -> bool {
        use Piece::*;
        matches!(
            (prev, next),
            (Number, Value | Fun | Open)
                | (Close, Number | Value | Fun | Open)
                | (Value, Number | Value | Fun | Open)
        )
    }
}

/// Split a run of letters into value words, if it consists of nothing else.
fn split_value_words(mut letters: &str) -> Option<Vec<&'static str>> {
    let mut ret = Vec::new();
    while !letters.is_empty() {
        let word = VALUE_WORDS
            .iter()
            .copied()
            .filter(|word| letters.starts_with(word))
            .max_by_key(|word| word.len())?;
        ret.push(word);
        letters = &letters[word.len()..];
    }
    Some(ret)
}

/// Comma directly between two digits.
fn is_decimal_comma(chars: &[char], idx: usize) -> bool {
    idx > 0
        && chars[idx - 1].is_ascii_digit()
        && chars.get(idx + 1).is_some_and(|chr| chr.is_ascii_digit())
}

/// Canonical text for the evaluator: decimal commas become periods,
/// whitespace goes, everything is lowercased, implied multiplication is
/// written out and `^` becomes `**`.
pub fn sanitize_expression(normalized: &str) -> String {
    let chars: Vec<char> = normalized.chars().collect();
    let mut text = String::with_capacity(normalized.len());
    for (idx, &chr) in chars.iter().enumerate() {
        if chr == ',' && is_decimal_comma(&chars, idx) {
            text.push('.');
        } else if !chr.is_whitespace() {
            text.extend(chr.to_lowercase());
        }
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = Piece::Other;
    let mut idx = 0;
    while idx < chars.len() {
        let chr = chars[idx];
        let start = idx;
        let piece = if chr.is_ascii_digit() || chr == '.' {
            while idx < chars.len() && (chars[idx].is_ascii_digit() || chars[idx] == '.') {
                idx += 1;
            }
            Piece::Number
        } else if chr.is_ascii_alphabetic() {
            while idx < chars.len() && chars[idx].is_ascii_alphabetic() {
                idx += 1;
            }
            let letters: String = chars[start..idx].iter().collect();
            if let Some(words) = split_value_words(&letters) {
                // `pix` is `pi*x`
                for (n, word) in words.into_iter().enumerate() {
                    if n > 0 || Piece::needs_star(prev, Piece::Value) {
                        out.push('*');
                    }
                    out.push_str(word);
                }
                prev = Piece::Value;
                continue;
            } else {
                // digits after a function name belong to it (`log10`)
                while idx < chars.len() && chars[idx].is_ascii_alphanumeric() {
                    idx += 1;
                }
                Piece::Fun
            }
        } else {
            idx += 1;
            match chr {
                '(' => Piece::Open,
                ')' => Piece::Close,
                _ => Piece::Other,
            }
        };

        if Piece::needs_star(prev, piece) {
            out.push('*');
        }
        out.extend(&chars[start..idx]);
        prev = piece;
    }

    out.replace('^', "**")
}

/// First character outside what automatic sign charts accept: digits, `x`,
/// the four operations, powers, parentheses and the decimal point.
pub fn first_disallowed(sanitized: &str) -> Option<char> {
    sanitized
        .chars()
        .find(|chr| !matches!(chr, '0'..='9' | 'x' | '+' | '-' | '*' | '/' | '(' | ')' | '.'))
}

#[derive(Debug)]
pub enum CompileErr {
    Parse(ParseErr),
    /// The program parsed but cannot run, found by a dry run.
    Eval(EvalErr),
}

impl CompileErr {
    pub fn loc(&self) -> Option<SubStr> {
        match self {
            Self::Parse(err) => Some(err.loc.clone()),
            Self::Eval(err) => err.op.as_ref().map(|op| op.loc.clone()),
        }
    }
}

impl fmt::Display for CompileErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Eval(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CompileErr {}

impl From<ParseErr> for CompileErr {
    fn from(err: ParseErr) -> Self {
        Self::Parse(err)
    }
}

#[derive(Debug)]
pub struct Evaluator {
    src: Arc<String>,
    prog: Program,
    idents: Idents,
}

impl Evaluator {
    pub fn source(&self) -> &str {
        &self.src
    }

    pub fn program(&self) -> &Program {
        &self.prog
    }

    pub fn try_call(&self, x: Number) -> Result<Number, EvalErr> {
        let mut stack = Vec::with_capacity(self.prog.ops.len());
        eval::eval(&self.prog, &self.idents, &[x], &mut stack)
    }

    /// NaN on failure. Callers treat any non-finite result as no value.
    pub fn call(&self, x: Number) -> Number {
        self.try_call(x).unwrap_or(Number::NAN)
    }
}

pub fn compile_evaluator(sanitized: &str) -> Result<Evaluator, CompileErr> {
    let src = Arc::new(sanitized.to_string());
    let idents = stdlib::standard_idents();
    let prog = parse::parse(Lexer::new(&src), &idents)?;
    let evaluator = Evaluator { src, prog, idents };
    if let Err(err) = evaluator.try_call(0.0) {
        return Err(CompileErr::Eval(err));
    }
    Ok(evaluator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_multiplication() {
        assert_eq!(sanitize_expression("2x"), "2*x");
        assert_eq!(sanitize_expression("x2"), "x*2");
        assert_eq!(sanitize_expression("(x-1)(x+1)"), "(x-1)*(x+1)");
        assert_eq!(sanitize_expression("(x)x"), "(x)*x");
        assert_eq!(sanitize_expression("x(x+1)"), "x*(x+1)");
        assert_eq!(sanitize_expression("2sin(x)"), "2*sin(x)");
        assert_eq!(sanitize_expression("2pi x"), "2*pi*x");
        assert_eq!(sanitize_expression("sin(x)"), "sin(x)");
        assert_eq!(sanitize_expression("log10(x)"), "log10(x)");
        assert_eq!(sanitize_expression("xx"), "x*x");
        assert_eq!(sanitize_expression("exp(x)"), "exp(x)");
        assert_eq!(sanitize_expression("tan(2x)"), "tan(2*x)");
    }

    #[test]
    fn text_cleanup() {
        assert_eq!(sanitize_expression(" 2 X ^ 2 "), "2*x**2");
        assert_eq!(sanitize_expression("1,5x"), "1.5*x");
        assert_eq!(sanitize_expression("max(x, 1)"), "max(x,1)");
        assert_eq!(sanitize_expression(""), "");
    }

    #[test]
    fn allow_list() {
        assert_eq!(first_disallowed("(x-1)**2/(x+3.5)"), None);
        assert_eq!(first_disallowed("sin(x)"), Some('s'));
        assert_eq!(first_disallowed("x,1"), Some(','));
    }

    #[test]
    fn evaluator_runs_host_functions() {
        let fun = compile_evaluator(&sanitize_expression("sin(x)")).unwrap();
        assert_eq!(fun.call(0.0), 0.0);
        let fun = compile_evaluator(&sanitize_expression("2x^2-1")).unwrap();
        assert_eq!(fun.call(3.0), 17.0);
        assert!(fun.call(Number::NAN).is_nan());
    }

    #[test]
    fn compile_failures_are_errors() {
        assert!(matches!(
            compile_evaluator("x+*"),
            Err(CompileErr::Eval(_))
        ));
        assert!(matches!(
            compile_evaluator("foo(x)"),
            Err(CompileErr::Parse(_))
        ));
        assert!(matches!(compile_evaluator(""), Err(CompileErr::Eval(_))));
        assert!(matches!(
            compile_evaluator("max()"),
            Err(CompileErr::Eval(_))
        ));
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        let fun = compile_evaluator("1/x").unwrap();
        assert!(!fun.call(0.0).is_finite());
    }
}
