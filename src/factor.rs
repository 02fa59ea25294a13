// SPDX: CC0-1.0

//! Break a sanitized expression into linear factors.
//!
//! Linearity is checked numerically: a factor is compiled and probed at a
//! handful of points to see whether it lies on a line. Anything that is
//! neither a line through some root nor a constant is left in
//! [`ParsedStructure::unparsed`] for the numeric root finder.

use crate::{
    compile::compile_evaluator,
    group::{is_wrapped, strip_outer_parens, top_level_positions},
    CriticalPoint, Number, PointTyp, Sign,
};
use core::fmt;
use regex::Regex;
use std::sync::LazyLock;

static TRAILING_EXPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)(?:\*\*|\^)\(?(\d+)\)?$").unwrap());

const SLOPE_EPSILON: Number = 1e-9;
const LINEAR_TOLERANCE: Number = 1e-6;
const CONSTANT_TOLERANCE: Number = 1e-6;
const ZERO_SNAP: Number = 1e-10;
const LINEAR_PROBES: [Number; 3] = [-1.0, 2.0, 0.5];

/// Operator that introduces a top-level token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FactorOp {
    Mul,
    Div,
}

impl FactorOp {
    pub const fn symbol(&self) -> char {
        match self {
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    pub const fn point_typ(&self) -> PointTyp {
        match self {
            Self::Mul => PointTyp::Zero,
            Self::Div => PointTyp::Pole,
        }
    }
}

impl fmt::Display for FactorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A `(expr)^n` factor where `expr` is linear in `x`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearFactor {
    pub root: Number,
    pub multiplicity: u32,
    /// Sign of the slope.
    pub sign: Sign,
    pub base_expr: String,
}

impl LinearFactor {
    /// What this factor does to the overall sign far to the right.
    pub fn sign_contribution(&self) -> Sign {
        if self.multiplicity % 2 == 1 {
            self.sign
        } else {
            Sign::Pos
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub factors: Vec<LinearFactor>,
    pub constant_sign: Sign,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Factor {
    pub typ: PointTyp,
    pub value: Number,
    pub multiplicity: u32,
    pub sign: Sign,
    /// Merges repeated factors and labels factor rows.
    pub base_expr: String,
}

impl Factor {
    pub fn sign_contribution(&self) -> Sign {
        if self.multiplicity % 2 == 1 {
            self.sign
        } else {
            Sign::Pos
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unparsed {
    pub operator: FactorOp,
    pub expression: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedStructure {
    pub zeros: Vec<CriticalPoint>,
    pub poles: Vec<CriticalPoint>,
    pub constant_sign: Sign,
    pub factors: Vec<Factor>,
    pub unparsed: Vec<Unparsed>,
}

impl Default for ParsedStructure {
    fn default() -> Self {
        Self {
            zeros: Vec::new(),
            poles: Vec::new(),
            constant_sign: Sign::Pos,
            factors: Vec::new(),
            unparsed: Vec::new(),
        }
    }
}

/// True if `text` has a binary `+` or `-` outside every parenthesis group.
pub fn has_top_level_sum(text: &str) -> bool {
    !top_level_positions(text, |bytes, idx| {
        matches!(bytes[idx], b'+' | b'-')
            && idx > 0
            && !matches!(bytes[idx - 1], b'*' | b'/' | b'^' | b'(' | b'+' | b'-')
    })
    .is_empty()
}

/// A `*` that is not half of `**`.
fn is_single_star(bytes: &[u8], idx: usize) -> bool {
    bytes[idx] == b'*'
        && bytes.get(idx + 1) != Some(&b'*')
        && (idx == 0 || bytes[idx - 1] != b'*')
}

/// Top-level multiplicative tokens with the operator in front of each. The
/// first token counts as multiplied. A sum stays whole.
pub fn split_factors(expr: &str) -> Vec<(FactorOp, &str)> {
    if has_top_level_sum(expr) {
        return vec![(FactorOp::Mul, expr)];
    }

    let mut ret = Vec::new();
    let mut op = FactorOp::Mul;
    let mut last = 0;
    let splits = top_level_positions(expr, |bytes, idx| {
        is_single_star(bytes, idx) || bytes[idx] == b'/'
    });
    for idx in splits {
        ret.push((op, &expr[last..idx]));
        op = if expr.as_bytes()[idx] == b'/' {
            FactorOp::Div
        } else {
            FactorOp::Mul
        };
        last = idx + 1;
    }
    ret.push((op, &expr[last..]));
    ret
}

/// Split `base^n` into base and `n` when the base is a single atom.
fn split_exponent(part: &str) -> (&str, u32) {
    let Some(caps) = TRAILING_EXPONENT.captures(part) else {
        return (part, 1);
    };
    let (Some(base), Some(exp)) = (caps.get(1), caps.get(2)) else {
        return (part, 1);
    };
    let base = base.as_str();
    let atomic = is_wrapped(base)
        || base
            .chars()
            .all(|chr| chr.is_ascii_alphanumeric() || chr == '.');
    match exp.as_str().parse::<u32>() {
        Ok(n) if atomic && n >= 1 => (base, n),
        _ => (part, 1),
    }
}

fn snap_zero(value: Number) -> Number {
    if value.abs() < ZERO_SNAP {
        0.0
    } else {
        value
    }
}

pub fn parse_linear_factor(part: &str) -> Option<LinearFactor> {
    let (base, multiplicity) = split_exponent(part);
    let base = strip_outer_parens(base);
    if !base.contains('x') {
        return None;
    }

    let fun = compile_evaluator(base).ok()?;
    let at_zero = fun.call(0.0);
    let at_one = fun.call(1.0);
    if !at_zero.is_finite() || !at_one.is_finite() {
        return None;
    }

    let slope = at_one - at_zero;
    if slope.abs() < SLOPE_EPSILON {
        return None;
    }
    let intercept = at_zero;

    for t in LINEAR_PROBES {
        let expected = slope * t + intercept;
        let actual = fun.call(t);
        if !actual.is_finite() {
            return None;
        }
        let tolerance = LINEAR_TOLERANCE * (1.0 + expected.abs().max(actual.abs()));
        if (actual - expected).abs() > tolerance {
            return None;
        }
    }

    Some(LinearFactor {
        root: snap_zero(-intercept / slope),
        multiplicity,
        sign: Sign::of(slope),
        base_expr: base.to_string(),
    })
}

/// Value of a part that does not depend on `x`.
pub fn evaluate_constant(part: &str) -> Option<Number> {
    let fun = compile_evaluator(part).ok()?;
    let at_zero = fun.call(0.0);
    let at_one = fun.call(1.0);
    if !at_zero.is_finite() || !at_one.is_finite() {
        return None;
    }
    if (at_zero - at_one).abs() > CONSTANT_TOLERANCE {
        return None;
    }
    Some(snap_zero(at_zero))
}

/// Parse one top-level token as a product of linear factors and constants.
/// `None` means some part was neither.
pub fn parse_product(token: &str) -> Option<Product> {
    let text = strip_outer_parens(token);
    if text.is_empty() {
        return None;
    }

    let parts = if has_top_level_sum(text) {
        vec![text]
    } else {
        let mut parts = Vec::new();
        let mut last = 0;
        for idx in top_level_positions(text, is_single_star) {
            parts.push(&text[last..idx]);
            last = idx + 1;
        }
        parts.push(&text[last..]);
        parts
    };

    let mut product = Product {
        factors: Vec::new(),
        constant_sign: Sign::Pos,
    };
    for part in parts {
        let part = strip_outer_parens(part);
        if let Some(factor) = parse_linear_factor(part) {
            product.constant_sign = product.constant_sign * factor.sign_contribution();
            product.factors.push(factor);
        } else {
            let value = evaluate_constant(part)?;
            product.constant_sign = product.constant_sign * Sign::of(value);
        }
    }
    Some(product)
}

pub fn extract_structure(sanitized: &str) -> ParsedStructure {
    let mut ret = ParsedStructure::default();

    for (operator, token) in split_factors(sanitized) {
        let Some(product) = parse_product(token) else {
            log::warn!("could not factor '{token}', leaving it to the numeric search");
            ret.unparsed.push(Unparsed {
                operator,
                expression: token.to_string(),
            });
            continue;
        };

        ret.constant_sign = ret.constant_sign * product.constant_sign;
        let typ = operator.point_typ();
        for factor in product.factors {
            let point = CriticalPoint {
                value: factor.root,
                typ,
                multiplicity: factor.multiplicity,
                numeric: false,
            };
            match typ {
                PointTyp::Zero => ret.zeros.push(point),
                PointTyp::Pole => ret.poles.push(point),
            }
            ret.factors.push(Factor {
                typ,
                value: factor.root,
                multiplicity: factor.multiplicity,
                sign: factor.sign,
                base_expr: factor.base_expr,
            });
        }
    }

    log::debug!(
        "structure of '{sanitized}': {} zeros, {} poles, constant sign {}, {} unparsed",
        ret.zeros.len(),
        ret.poles.len(),
        ret.constant_sign,
        ret.unparsed.len()
    );
    ret
}
