// SPDX: CC0-1.0

use crate::{
    chart,
    compile::CompileErr,
    eval::{EvalErrTyp, Ident, IdentKey, Idents, Program},
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::ParseErrTyp,
    solution::Solution,
    Domain, Number,
};
use anyhow::Context;
use core::{fmt, num::ParseFloatError};
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    Solve,
    SetDomain,
    Eval,
    PrintProg,
    Save,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::Solve,
            Self::SetDomain,
            Self::Eval,
            Self::PrintProg,
            Self::Save,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set expression to analyze",
            Self::Solve => "print the sign chart of the expression that has been set",
            Self::SetDomain => "set displayed domain bounds and chart width",
            Self::Eval => "evaluate the expression at some x",
            Self::PrintProg => "print program compiled from the expression (for debugging)",
            Self::Save => "write the sign chart to a new file",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::Solve => "solve",
            Self::SetDomain => "domain",
            Self::Eval => "eval",
            Self::PrintProg => "prog",
            Self::Save => "save",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

/// Domain bound typed at the prompt: a number, or `auto` to clear it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound(pub Option<Number>);

impl core::str::FromStr for Bound {
    type Err = ParseFloatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self(None));
        }
        s.parse().map(|val| Self(Some(val)))
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn expr_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no expression is defined")
}

pub const fn ident_typ(ident: &Ident) -> &'static str {
    match ident {
        Ident::Var(_) => "variable",
        Ident::Const(_) => "constant",
        Ident::Fun(_) => "function",
    }
}

/// Known identifier whose name is closest to `text`, if any is close enough.
pub fn similar_ident<'a>(idents: &'a Idents, text: &str) -> Option<(&'a IdentKey, &'a Ident)> {
    let text = text.to_ascii_lowercase();
    idents
        .iter()
        .map(|(key, ident)| {
            (
                strsim::normalized_damerau_levenshtein(&text, &key.get().to_ascii_lowercase()),
                (key, ident),
            )
        })
        .filter(|(sim, _)| *sim > 0.3)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, found)| found)
}

fn note_similar<W: Write>(mut out: W, idents: &Idents, text: &str) -> io::Result<()> {
    if let Some((key, ident)) = similar_ident(idents, text) {
        writeln!(out, "note: {} '{key}' has a similar name", ident_typ(ident))?;
    }
    Ok(())
}

pub fn report_compile_err<W: Write>(
    mut out: W,
    err: &CompileErr,
    idents: &Idents,
) -> io::Result<()> {
    if let Some(loc) = err.loc() {
        underline(&mut out, &loc)?;
    }

    match err {
        CompileErr::Parse(err) => {
            writeln!(out, "parse error: {}", err.typ)?;
            match &err.typ {
                ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => writeln!(
                    out,
                    "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^,()"
                )?,
                ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
                    TokTyp::XGreater | TokTyp::XLess => writeln!(
                        out,
                        "note: expected an expression but found an inequality"
                    )?,
                    TokTyp::XEqual => writeln!(
                        out,
                        "note: expected an expression but found an equation"
                    )?,
                    TokTyp::XPipe => writeln!(
                        out,
                        "note: use the 'abs' function to compute absolute value"
                    )?,
                    _ => {}
                },
                ParseErrTyp::ParseNum(_) => {
                    writeln!(out, "note: parsing as floating point number")?
                }
                ParseErrTyp::UnknownIdent => note_similar(&mut out, idents, err.loc.get())?,
                ParseErrTyp::MissingArgList => writeln!(
                    out,
                    "note: function arguments go in parentheses, for example 'sin(x)'"
                )?,
                ParseErrTyp::ParenMismatch | ParseErrTyp::StrayComma => {}
            }
        }

        CompileErr::Eval(err) => {
            writeln!(out, "evaluation error: {err}")?;
            match &err.typ {
                EvalErrTyp::StackMismatch { .. } if err.op.is_none() => writeln!(
                    out,
                    "note: exactly 1 final value is expected on the stack after evaluation"
                )?,
                EvalErrTyp::UndefinedIdent { text } => note_similar(&mut out, idents, text.get())?,
                _ => {}
            }
        }
    }
    Ok(())
}

/// Critical points followed by the chart.
pub fn write_solution<W: Write>(
    mut out: W,
    solution: &Solution,
    domain: &Domain,
    width: usize,
) -> io::Result<()> {
    writeln!(out, "f(x) = {}", solution.expression)?;
    writeln!(out, "domain: {domain}")?;
    if solution.points.is_empty() {
        writeln!(out, "no zeros or poles found")?;
    } else {
        writeln!(out, "critical points:")?;
        for point in &solution.points {
            writeln!(out, "  {point}")?;
        }
    }
    writeln!(out)?;
    write!(out, "{}", chart::render(solution, width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile::compile_evaluator, solution::generate_solution, stdlib};

    #[test]
    fn command_names_round_trip() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
        }
        assert_eq!("plot".parse::<Command>(), Err(()));
    }

    #[test]
    fn bounds() {
        assert_eq!("auto".parse::<Bound>(), Ok(Bound(None)));
        assert_eq!("AUTO".parse::<Bound>(), Ok(Bound(None)));
        assert_eq!("-2.5".parse::<Bound>(), Ok(Bound(Some(-2.5))));
        assert!("two".parse::<Bound>().is_err());
    }

    #[test]
    fn similar_names() {
        let idents = stdlib::standard_idents();
        let (key, ident) = similar_ident(&idents, "sqr").unwrap();
        assert_eq!(key.get(), "sqrt");
        assert_eq!(ident_typ(ident), "function");
        assert!(similar_ident(&idents, "qqqqqqqqqq").is_none());
    }

    #[test]
    fn unknown_function_gets_a_hint() {
        let idents = stdlib::standard_idents();
        let err = compile_evaluator("sqr(x)").unwrap_err();
        let mut out = Vec::new();
        report_compile_err(&mut out, &err, &idents).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("sqr(x)\n^^^\n"));
        assert!(text.contains("function 'sqrt' has a similar name"));
    }

    #[test]
    fn solution_report() {
        let solution = generate_solution("(x-1)^2").unwrap();
        let mut out = Vec::new();
        write_solution(&mut out, &solution, &solution.domain, chart::DEFAULT_WIDTH).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("f(x) = (x-1)^2\ndomain: [-1, 3]\n"));
        assert!(text.contains("zero at 1 (multiplicity 2)"));
        assert!(text.trim_end().ends_with('+'));
    }
}
