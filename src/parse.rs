// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    UnknownIdent,
    MissingArgList,
    StrayComma,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::UnknownIdent => write!(f, "unknown identifier"),
            Self::MissingArgList => write!(f, "function is missing its argument list"),
            Self::StrayComma => write!(f, "comma outside of an argument list"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}'", self.typ, self.loc)
    }
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Fun,
    OpenParen,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    fn precedence(&self) -> i8 {
        match self.typ {
            ShuntOpTyp::Operator(op) => op.precedence(),
            // a function binds tighter than any operator around its call
            ShuntOpTyp::Fun => i8::MAX,
            ShuntOpTyp::OpenParen => i8::MIN,
        }
    }

    fn into_output(self, argc: usize) -> Result<Operation, ParseErr> {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Fun => OperationTyp::Call(argc),
            ShuntOpTyp::OpenParen => {
                return Err(ParseErr {
                    typ: ParseErrTyp::ParenMismatch,
                    loc: self.loc,
                })
            }
        };
        Ok(Operation { typ, loc: self.loc })
    }
}

/// Argument bookkeeping for one open parenthesis.
#[derive(Clone, Copy, Debug)]
struct Frame {
    commas: usize,
    empty: bool,
}

impl Frame {
    const fn argc(&self) -> usize {
        if self.empty {
            0
        } else {
            self.commas + 1
        }
    }
}

/// Move operators to the output until the innermost open parenthesis.
fn flush_to_paren(ops: &mut Vec<ShuntOp>, out: &mut Vec<Operation>) -> Result<(), ParseErr> {
    while let Some(op) = ops.last() {
        if op.typ == ShuntOpTyp::OpenParen {
            break;
        }
        if let Some(op) = ops.pop() {
            out.push(op.into_output(0)?);
        }
    }
    Ok(())
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let mut out: Vec<Operation> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack
    let mut frames: Vec<Frame> = Vec::new(); // one per open parenthesis
    let mut pending_fun: Option<SubStr> = None; // function still waiting for '('

    for tok in lex {
        let tok = tok?;

        if let Some(loc) = pending_fun.take() {
            if tok.typ != TokTyp::OpenParen {
                return Err(ParseErr {
                    typ: ParseErrTyp::MissingArgList,
                    loc,
                });
            }
        }
        if tok.typ != TokTyp::CloseParen {
            if let Some(frame) = frames.last_mut() {
                frame.empty = false;
            }
        }

        match tok.typ {
            TokTyp::Number => {
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                });
            }

            TokTyp::Ident => match idents.get(&tok.loc.clone().into()) {
                Some(Ident::Const(_) | Ident::Var(_)) => out.push(Operation {
                    typ: OperationTyp::Ident,
                    loc: tok.loc,
                }),
                Some(Ident::Fun(_)) => {
                    pending_fun = Some(tok.loc.clone());
                    ops.push(ShuntOp {
                        typ: ShuntOpTyp::Fun,
                        loc: tok.loc,
                    });
                }
                None => {
                    return Err(ParseErr {
                        typ: ParseErrTyp::UnknownIdent,
                        loc: tok.loc,
                    })
                }
            },

            TokTyp::Op(o1) if o1.is_prefix() => {
                // nothing to its left can belong to a prefix operator
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
            }

            TokTyp::Op(o1) => {
                while let Some(o2) = ops.last() {
                    if (o2.typ != ShuntOpTyp::OpenParen)
                        && ((o2.precedence() > o1.precedence())
                            || ((o1.precedence() == o2.precedence())
                                && (o1.associativity() == Associativity::Left)))
                    {
                        if let Some(o2) = ops.pop() {
                            out.push(o2.into_output(0)?);
                        }
                    } else {
                        break;
                    }
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
            }

            TokTyp::Comma => {
                flush_to_paren(&mut ops, &mut out)?;
                match frames.last_mut() {
                    Some(frame) => frame.commas += 1,
                    None => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::StrayComma,
                            loc: tok.loc,
                        })
                    }
                }
            }

            TokTyp::OpenParen => {
                frames.push(Frame {
                    commas: 0,
                    empty: true,
                });
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
            }

            TokTyp::CloseParen => {
                flush_to_paren(&mut ops, &mut out)?;

                let (Some(_), Some(frame)) = (ops.pop(), frames.pop()) else {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc: tok.loc,
                    });
                };

                // handle functions
                if let Some(ShuntOpTyp::Fun) = ops.last().map(|op| op.typ) {
                    if let Some(op) = ops.pop() {
                        out.push(op.into_output(frame.argc())?);
                    }
                }
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => unreachable!("unsupported token survived until parsing"),
        }
    }

    if let Some(loc) = pending_fun {
        return Err(ParseErr {
            typ: ParseErrTyp::MissingArgList,
            loc,
        });
    }

    while let Some(op) = ops.pop() {
        out.push(op.into_output(0)?);
    }

    Ok(Program::new(out))
}
