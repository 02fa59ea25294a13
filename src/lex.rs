// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // yes, silly, but atomic operations are cheap for this use case
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    Comma,
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Op(_)
            | Self::Comma
            | Self::OpenParen
            | Self::CloseParen => false,

            // unsupported tokens
            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }

    /// Whether a `-` or `+` after this token is a prefix operator.
    const fn expects_operand(prev: Option<Self>) -> bool {
        match prev {
            None => true,
            Some(Self::Op(_) | Self::Comma | Self::OpenParen) => true,
            Some(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            has_errored: false,
        }
    }

    pub fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    fn tok(&self, typ: TokTyp, idx: usize, len: usize) -> Tok {
        Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), idx, len),
        }
    }

    pub fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '*' => {
                self.cur.next();
                // `**` is the same as `^`
                if let Some((_, '*')) = self.cur.peek() {
                    self.cur.next();
                    return Some(self.tok(TokTyp::Op(OperatorTyp::Exp), idx, 2));
                }
                return Some(self.tok(TokTyp::Op(OperatorTyp::Mul), idx, 1));
            }
            '-' | '+' => {
                let prefix = TokTyp::expects_operand(self.prev);
                let op = match (chr, prefix) {
                    ('-', true) => OperatorTyp::Neg,
                    ('-', false) => OperatorTyp::Sub,
                    (_, true) => OperatorTyp::Pos,
                    (_, false) => OperatorTyp::Add,
                };
                TokTyp::Op(op)
            }
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Exp),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next(); // consume because we only peeked
        Some(self.tok(typ, idx, 1))
    }

    /// Gather a run of characters starting with one matching `first` and
    /// continuing with ones matching `rest`.
    pub fn consume_by<P, Q>(&mut self, typ: TokTyp, first: P, rest: Q) -> Option<Tok>
    where
        P: Fn(char) -> bool,
        Q: Fn(char) -> bool,
    {
        let (idx, chr) = self.cur.peek().copied()?;
        if !first(chr) {
            return None;
        }
        let mut tok = self.tok(typ, idx, 0);
        while let Some((_, chr)) = self.cur.peek().copied() {
            let accept = if tok.loc.is_empty() {
                first(chr)
            } else {
                rest(chr)
            };
            if !accept {
                break;
            }
            tok.loc.shift_right(chr.len_utf8());
            self.cur.next();
        }
        Some(tok)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let ret = if let Some(tok) = self.consume_unambiguous() {
            Ok(tok)
        } else if let Some(tok) = self.consume_by(
            TokTyp::Ident,
            |chr| chr.is_ascii_alphabetic(),
            |chr| chr.is_ascii_alphanumeric(),
        ) {
            // identifiers may carry digits after the first letter (`log10`)
            Ok(tok)
        } else if let Some(tok) = self.consume_by(
            TokTyp::Number,
            |chr| chr.is_ascii_digit() || chr == '.',
            |chr| chr.is_ascii_digit() || chr == '.',
        ) {
            Ok(tok)
        } else {
            self.has_errored = true;
            Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: self.tok(TokTyp::Number, next_idx, next_chr.len_utf8()).loc,
            })
        };

        match ret {
            Ok(tok) if tok.typ.is_unsupported() => {
                self.has_errored = true;
                Some(Err(LexErr {
                    typ: LexErrTyp::Unsupported(tok.typ),
                    loc: tok.loc,
                }))
            }
            Ok(tok) => {
                self.prev = Some(tok.typ);
                Some(Ok(tok))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<(TokTyp, String)> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src)
            .map(|tok| {
                let tok = tok.unwrap();
                (tok.typ, tok.loc.get().to_string())
            })
            .collect()
    }

    #[test]
    fn double_star_is_exponent() {
        let toks = lex("x**2*3");
        let typs: Vec<_> = toks.iter().map(|(typ, _)| *typ).collect();
        assert_eq!(
            typs,
            [
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Exp),
                TokTyp::Number,
                TokTyp::Op(OperatorTyp::Mul),
                TokTyp::Number,
            ]
        );
        assert_eq!(toks[1].1, "**");
    }

    #[test]
    fn prefix_minus_follows_previous_token() {
        let typs: Vec<_> = lex("-x-(-1)*-2").into_iter().map(|(typ, _)| typ).collect();
        assert_eq!(
            typs,
            [
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Sub),
                TokTyp::OpenParen,
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Number,
                TokTyp::CloseParen,
                TokTyp::Op(OperatorTyp::Mul),
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Number,
            ]
        );
    }

    #[test]
    fn identifiers_and_numbers() {
        assert_eq!(
            lex("log10(2.5)"),
            [
                (TokTyp::Ident, "log10".to_string()),
                (TokTyp::OpenParen, "(".to_string()),
                (TokTyp::Number, "2.5".to_string()),
                (TokTyp::CloseParen, ")".to_string()),
            ]
        );
    }

    #[test]
    fn unsupported_and_invalid() {
        let src = Arc::new(String::from("x = 1"));
        let errs: Vec<_> = Lexer::new(&src).filter_map(Result::err).collect();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].typ, LexErrTyp::Unsupported(TokTyp::XEqual));
        assert_eq!(errs[0].loc.start(), 2);

        let src = Arc::new(String::from("2 $ x"));
        let errs: Vec<_> = Lexer::new(&src).filter_map(Result::err).collect();
        assert_eq!(errs[0].typ, LexErrTyp::InvalidChar);
    }
}
