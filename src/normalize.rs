// SPDX: CC0-1.0

//! Bring LaTeX-like and ASCII-math-like input to one plain-text form.
//!
//! Output is whitespace collapsed and never contains a backslash, so running
//! [`normalize`] on its own output changes nothing.

use crate::group::{brace_group, find_matching, paren_group, split_top_level, Direction};
use regex::Regex;
use std::sync::LazyLock;

static FUNCTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:f\s*\(\s*x\s*\)|y)\s*=\s*").unwrap());

pub fn normalize(raw: &str) -> String {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return text;
    }

    let converted = if text.contains('\\') {
        ascii_to_plain(&latex_to_plain(&text))
    } else {
        ascii_to_plain(&text)
    };

    let mut out = collapse_whitespace(&converted);
    while let Some(prefix) = FUNCTION_PREFIX.find(&out) {
        out = out[prefix.end()..].to_string();
    }
    log::trace!("normalized {raw:?} to {out:?}");
    out
}

/// Non-breaking spaces are whitespace too.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_at(text: &str, idx: usize) -> Option<char> {
    text.get(idx..).and_then(|rest| rest.chars().next())
}

fn skip_whitespace(text: &str, mut idx: usize) -> usize {
    while let Some(chr) = char_at(text, idx) {
        if chr.is_whitespace() {
            idx += chr.len_utf8();
        } else {
            break;
        }
    }
    idx
}

fn is_atom(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|chr| chr.is_ascii_alphanumeric() || chr == '.')
}

// ---------------------------------------------------------------- latex --

fn latex_command(name: &str) -> Option<&'static str> {
    let rep = match name {
        "cdot" | "cdotp" | "times" | "ast" => "*",
        "div" => "/",
        "pm" => "+/-",
        "minus" => "-",
        "degree" => "deg",

        "\\" | "," | ";" | ":" | "!" | " " | "quad" | "qquad" | "thinspace" | "medspace"
        | "thickspace" => " ",

        "{" => "{",
        "}" => "}",

        "alpha" => "alpha",
        "beta" => "beta",
        "gamma" => "gamma",
        "delta" => "delta",
        "epsilon" | "varepsilon" => "epsilon",
        "zeta" => "zeta",
        "eta" => "eta",
        "theta" | "vartheta" => "theta",
        "iota" => "iota",
        "kappa" => "kappa",
        "lambda" => "lambda",
        "mu" => "mu",
        "nu" => "nu",
        "xi" => "xi",
        "pi" | "varpi" => "pi",
        "rho" => "rho",
        "sigma" => "sigma",
        "tau" => "tau",
        "upsilon" => "upsilon",
        "phi" | "varphi" => "phi",
        "chi" => "chi",
        "psi" => "psi",
        "omega" => "omega",

        "log" => "log",
        "ln" => "ln",
        "lg" => "lg",
        "exp" => "exp",
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "arcsin" => "arcsin",
        "arccos" => "arccos",
        "arctan" => "arctan",
        "sinh" => "sinh",
        "cosh" => "cosh",
        "tanh" => "tanh",
        "min" => "min",
        "max" => "max",
        _ => return None,
    };
    Some(rep)
}

/// Name of the command whose backslash sits just before `start`, and the
/// index after it. Letter runs form a name, anything else is a one-character
/// command.
fn read_command(text: &str, start: usize) -> (&str, usize) {
    let rest = &text[start..];
    let letters = rest
        .find(|chr: char| !chr.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if letters > 0 {
        (&rest[..letters], start + letters)
    } else if let Some(chr) = rest.chars().next() {
        (&rest[..chr.len_utf8()], start + chr.len_utf8())
    } else {
        ("", start)
    }
}

/// A command argument: a brace group, a nested command, or one character.
fn read_arg(text: &str, idx: usize) -> (&str, usize) {
    let idx = skip_whitespace(text, idx);
    if let Some(group) = brace_group(text, idx) {
        return (group.content, group.end);
    }
    match char_at(text, idx) {
        Some('\\') => {
            let (_, end) = read_command(text, idx + 1);
            (&text[idx..end], end)
        }
        Some(chr) => (&text[idx..idx + chr.len_utf8()], idx + chr.len_utf8()),
        None => ("", idx),
    }
}

fn read_optional_bracket(text: &str, idx: usize) -> (Option<&str>, usize) {
    let start = skip_whitespace(text, idx);
    match find_matching(text, start, b'[', b']', Direction::Forward) {
        Some(group) => (Some(group.content), group.end),
        None => (None, idx),
    }
}

fn latex_to_plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut idx = 0;

    while let Some(chr) = char_at(text, idx) {
        match chr {
            '\\' => {
                let (name, after) = read_command(text, idx + 1);
                idx = after;
                let lower = name.to_ascii_lowercase();
                match lower.as_str() {
                    "frac" | "dfrac" | "tfrac" => {
                        let (num, after) = read_arg(text, idx);
                        let (den, after) = read_arg(text, after);
                        idx = after;
                        out.push_str(&format!(
                            "({})/({})",
                            latex_to_plain(num).trim(),
                            latex_to_plain(den).trim()
                        ));
                    }

                    "sqrt" => {
                        let (index, after) = read_optional_bracket(text, idx);
                        let (radicand, after) = read_arg(text, after);
                        idx = after;
                        let radicand = latex_to_plain(radicand);
                        match index {
                            Some(index) => out.push_str(&format!(
                                "({})^(1/({}))",
                                radicand.trim(),
                                latex_to_plain(index).trim()
                            )),
                            None => out.push_str(&format!("sqrt({})", radicand.trim())),
                        }
                    }

                    "operatorname" => {
                        let (name, after) = read_arg(text, idx);
                        idx = after;
                        out.push_str(latex_to_plain(name).trim());
                    }

                    "left" | "right" | "bigl" | "bigr" | "big" => {
                        // `\left.` is an invisible delimiter
                        if char_at(text, idx) == Some('.') {
                            idx += 1;
                        }
                    }

                    _ => match latex_command(&lower) {
                        Some(rep) => out.push_str(rep),
                        None if name.chars().all(|chr| chr.is_ascii_alphabetic()) => {
                            out.push_str(name)
                        }
                        // unknown symbol commands would leave a backslash behind
                        None => out.push(' '),
                    },
                }
            }

            '^' | '_' => {
                out.push(chr);
                let group_idx = skip_whitespace(text, idx + 1);
                if let Some(group) = brace_group(text, group_idx) {
                    let inner = latex_to_plain(group.content);
                    let inner = inner.trim();
                    // `x^{2+1}` is `x^(2+1)`, never `x^2+1`
                    if is_atom(inner) {
                        out.push_str(inner);
                    } else {
                        out.push('(');
                        out.push_str(inner);
                        out.push(')');
                    }
                    idx = group.end;
                } else {
                    idx += 1;
                }
            }

            '{' | '}' => idx += 1,

            _ => {
                out.push(chr);
                idx += chr.len_utf8();
            }
        }
    }

    out
}

// ---------------------------------------------------------------- ascii --

fn replace_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for chr in text.chars() {
        match chr {
            '·' | '⋅' | '×' => out.push('*'),
            '÷' => out.push('/'),
            '−' | '–' => out.push('-'),
            'π' => out.push_str("pi"),
            'τ' => out.push_str("tau"),
            '²' => out.push_str("^2"),
            '³' => out.push_str("^3"),
            '{' => out.push('('),
            '}' => out.push(')'),
            _ => out.push(chr),
        }
    }
    out.replace("**", "^")
}

/// Index of the `(` of a `frac(` call starting at `idx`, if there is one.
fn frac_call_at(text: &str, idx: usize) -> Option<usize> {
    let prev_is_letter = text[..idx]
        .chars()
        .next_back()
        .is_some_and(|chr| chr.is_ascii_alphabetic());
    if prev_is_letter {
        return None;
    }
    let name = text.get(idx..idx + 4)?;
    if !name.eq_ignore_ascii_case("frac") {
        return None;
    }
    let paren = skip_whitespace(text, idx + 4);
    (char_at(text, paren) == Some('(')).then_some(paren)
}

fn rewrite_frac_calls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut idx = 0;

    while let Some(chr) = char_at(text, idx) {
        if let Some(group) = frac_call_at(text, idx).and_then(|paren| paren_group(text, paren)) {
            let args = split_top_level(group.content, b',');
            if let [num, den] = args[..] {
                out.push_str(&format!(
                    "({})/({})",
                    rewrite_frac_calls(num.trim()),
                    rewrite_frac_calls(den.trim())
                ));
            } else {
                out.push_str(&format!("({})", rewrite_frac_calls(group.content.trim())));
            }
            idx = group.end;
            continue;
        }
        out.push(chr);
        idx += chr.len_utf8();
    }

    out
}

fn canonicalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| {
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "sqrt" | "pi" | "tau" => out.push_str(&lower),
            _ => out.push_str(word),
        }
        word.clear();
    };

    for chr in text.chars() {
        if chr.is_ascii_alphabetic() {
            word.push(chr);
        } else {
            flush(&mut word, &mut out);
            out.push(chr);
        }
    }
    flush(&mut word, &mut out);
    out
}

fn ascii_to_plain(text: &str) -> String {
    canonicalize_words(&rewrite_frac_calls(&replace_symbols(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \u{a0}  \t"), "");
    }

    #[test]
    fn latex_fraction() {
        assert_eq!(normalize(r"\frac{x-1}{x+2}"), "(x-1)/(x+2)");
        assert_eq!(normalize(r"\dfrac{1}{x}"), "(1)/(x)");
    }

    #[test]
    fn latex_nested_fraction() {
        assert_eq!(normalize(r"\frac{\frac{1}{x}}{2}"), "((1)/(x))/(2)");
    }

    #[test]
    fn latex_single_character_arguments() {
        assert_eq!(normalize(r"\frac12 x"), "(1)/(2) x");
    }

    #[test]
    fn latex_delimiters_and_powers() {
        assert_eq!(normalize(r"\left(x-1\right)^{2}"), "(x-1)^2");
        assert_eq!(normalize(r"\left( x \right)^{-1}"), "( x )^(-1)");
        assert_eq!(normalize(r"x^{2+1}\cdot 3"), "x^(2+1)* 3");
    }

    #[test]
    fn latex_roots_and_names() {
        assert_eq!(normalize(r"\sqrt{x+1}"), "sqrt(x+1)");
        assert_eq!(normalize(r"\sqrt[3]{x}"), "(x)^(1/(3))");
        assert_eq!(normalize(r"\operatorname{sin}(x)"), "sin(x)");
        assert_eq!(normalize(r"2\Pi\times\ln(x)"), "2pi*ln(x)");
    }

    #[test]
    fn latex_unmatched_group_is_tolerated() {
        assert_eq!(normalize(r"\frac{x-1"), "(x-1)/()");
        assert_eq!(normalize(r"\sqrt{x"), "sqrt(x)");
    }

    #[test]
    fn latex_unknown_command_keeps_name() {
        assert_eq!(normalize(r"\foo(x)"), "foo(x)");
    }

    #[test]
    fn latex_symbol_commands_leave_no_backslash() {
        assert_eq!(normalize(r"x\\1"), "x 1");
        assert_eq!(normalize(r"\frac{1}{x}\\"), "(1)/(x)");
        assert_eq!(normalize(r"2\#x"), "2 x");
        assert!(!normalize(r"x\\ \& \%").contains('\\'));
    }

    #[test]
    fn ascii_fraction() {
        assert_eq!(normalize("frac(1, x+1)"), "(1)/(x+1)");
        assert_eq!(normalize("frac(frac(1,2),x)"), "((1)/(2))/(x)");
    }

    #[test]
    fn ascii_symbols() {
        assert_eq!(normalize("2·x − 3÷x"), "2*x - 3/x");
        assert_eq!(normalize("x**2"), "x^2");
        assert_eq!(normalize("SQRT(x) + 2PI + Tau"), "sqrt(x) + 2pi + tau");
        assert_eq!(normalize("x²"), "x^2");
    }

    #[test]
    fn function_prefix() {
        assert_eq!(normalize("f(x) = x - 1"), "x - 1");
        assert_eq!(normalize("F ( x ) =x"), "x");
        assert_eq!(normalize("y = 2x"), "2x");
        assert_eq!(normalize(r"f(x)=\frac{1}{x}"), "(1)/(x)");
    }

    #[test]
    fn idempotent() {
        for input in [
            r"\frac{x-1}{x+2}",
            r"\left(x-1\right)^{2}\cdot\sqrt[3]{x}",
            "f(x) = frac(1, x+1) ** 2",
            "f(x)=f(x)=x",
            "  2 · x   −  PI ",
            "{x+1}^2",
            r"x^{-1} \, \pm 1",
            r"x\\1",
            r"\frac{1}{x}\\",
            r"a\#b",
            "",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }
}
