// SPDX: CC0-1.0

use crate::{
    compile::{compile_evaluator, first_disallowed, sanitize_expression, CompileErr, Evaluator},
    factor::{extract_structure, Factor, ParsedStructure},
    normalize::normalize,
    roots::find_numeric_zeros,
    round_key, CriticalPoint, Domain, DomainOverride, Number, PointKey, PointTyp, Sign,
};
use core::fmt;
use std::collections::HashMap;

const DEFAULT_SINGLE_SPAN: Number = 4.0;
const MARGIN_RATIO: Number = 0.2;
const MIN_MARGIN: Number = 1.0;
const MIN_OVERRIDE_SPAN: Number = 1.0;

const EDGE_EPSILON: Number = 1e-4;
const EDGE_NUDGE: Number = 0.3;
const RETRY_RATIOS: [Number; 4] = [0.25, 0.75, 0.1, 0.9];

#[derive(Clone, Debug, PartialEq)]
pub struct FactorRow {
    pub label: String,
    pub segments: Vec<Sign>,
    pub typ: PointTyp,
    pub value: Number,
    pub multiplicity: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    /// Sorted by value.
    pub points: Vec<CriticalPoint>,
    /// One more than there are points.
    pub segments: Vec<Sign>,
    pub domain: Domain,
    pub expression: String,
    pub factor_rows: Vec<FactorRow>,
}

#[derive(Debug)]
pub enum SolveErr {
    EmptyInput,
    Unparseable,
    DisallowedCharacters { found: char },
    CompileFailure(CompileErr),
}

impl fmt::Display for SolveErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "enter a function expression"),
            Self::Unparseable => write!(f, "could not parse the expression"),
            Self::DisallowedCharacters { found } => write!(
                f,
                "only numbers, x, and the four operations are supported for automatic sign charts (found '{found}')"
            ),
            Self::CompileFailure(err) => {
                write!(f, "could not parse the function expression: {err}")
            }
        }
    }
}

impl std::error::Error for SolveErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CompileFailure(err) => Some(err),
            _ => None,
        }
    }
}

/// Order by value, zeros before poles on ties.
pub fn sort_points(points: &mut [CriticalPoint]) {
    points.sort_by(|a, b| a.value.total_cmp(&b.value).then(a.typ.cmp(&b.typ)));
}

/// Zeros and poles of the structure, one per rounded value with the
/// multiplicities summed.
pub fn build_points(structure: &ParsedStructure) -> Vec<CriticalPoint> {
    let mut ret: Vec<CriticalPoint> = Vec::new();
    let mut index: HashMap<PointKey, usize> = HashMap::new();
    for point in structure.zeros.iter().chain(&structure.poles) {
        if !point.value.is_finite() {
            continue;
        }
        match index.get(&point.key()) {
            Some(&idx) => ret[idx].multiplicity += point.multiplicity,
            None => {
                index.insert(point.key(), ret.len());
                ret.push(*point);
            }
        }
    }
    sort_points(&mut ret);
    ret
}

/// Add numeric points. A point already present keeps its value and takes
/// the larger multiplicity.
pub fn merge_points(mut points: Vec<CriticalPoint>, extra: Vec<CriticalPoint>) -> Vec<CriticalPoint> {
    for point in extra {
        match points.iter_mut().find(|known| known.key() == point.key()) {
            Some(known) => known.multiplicity = known.multiplicity.max(point.multiplicity),
            None => points.push(point),
        }
    }
    sort_points(&mut points);
    points
}

fn margin_for(span: Number) -> Number {
    (span * MARGIN_RATIO).max(MIN_MARGIN)
}

pub fn compute_auto_domain(points: &[CriticalPoint], previous: Option<Domain>) -> Domain {
    let values: Vec<Number> = points
        .iter()
        .map(|point| point.value)
        .filter(|value| value.is_finite())
        .collect();

    match values[..] {
        [] => Domain::DEFAULT,

        [value] => {
            let mut domain = match previous {
                Some(domain) if domain.is_valid() => domain,
                _ => Domain {
                    min: value - DEFAULT_SINGLE_SPAN / 2.0,
                    max: value + DEFAULT_SINGLE_SPAN / 2.0,
                },
            };
            // shift, never resize
            let margin = margin_for(domain.span());
            let shift = if value < domain.min + margin {
                value - (domain.min + margin)
            } else if value > domain.max - margin {
                value - (domain.max - margin)
            } else {
                0.0
            };
            domain.min += shift;
            domain.max += shift;
            domain
        }

        _ => {
            let mut lo = values.iter().copied().fold(Number::INFINITY, Number::min);
            let mut hi = values.iter().copied().fold(Number::NEG_INFINITY, Number::max);
            if hi - lo == 0.0 {
                lo -= 1.0;
                hi += 1.0;
            }
            let margin = margin_for(hi - lo);
            Domain {
                min: lo - margin,
                max: hi + margin,
            }
        }
    }
}

/// The domain to display: user bounds where given, auto bounds elsewhere.
pub fn resolve_domain(user: &DomainOverride, auto: &Domain) -> Domain {
    let min = user.min.filter(|val| val.is_finite()).unwrap_or(auto.min);
    let max = user.max.filter(|val| val.is_finite()).unwrap_or(auto.max);
    if max > min {
        return Domain { min, max };
    }
    let center = (min + max) / 2.0;
    let half = (max - min).abs().max(MIN_OVERRIDE_SPAN) / 2.0;
    Domain {
        min: center - half,
        max: center + half,
    }
}

/// A point inside the interval between two boundaries, which may be infinite.
pub fn choose_sample(left: Number, right: Number) -> Number {
    match (left.is_finite(), right.is_finite()) {
        (false, false) => 0.0,
        (true, false) => left + 1.0,
        (false, true) => right - 1.0,
        (true, true) => {
            let gap = right - left;
            let mid = left + gap / 2.0;
            if mid - left < EDGE_EPSILON {
                left + gap * EDGE_NUDGE
            } else if right - mid < EDGE_EPSILON {
                right - gap * EDGE_NUDGE
            } else {
                mid
            }
        }
    }
}

/// `domain.min`, the point values, `domain.max`.
pub fn boundaries(points: &[CriticalPoint], domain: &Domain) -> Vec<Number> {
    let mut ret = Vec::with_capacity(points.len() + 2);
    ret.push(domain.min);
    ret.extend(points.iter().map(|point| point.value));
    ret.push(domain.max);
    ret
}

fn sample_sign<F>(f: &F, left: Number, right: Number, prev: Option<Sign>) -> Sign
where
    F: Fn(Number) -> Number,
{
    let value = f(choose_sample(left, right));
    if value.is_finite() {
        return Sign::of(value);
    }
    if left.is_finite() && right.is_finite() {
        for ratio in RETRY_RATIOS {
            let value = f(left + (right - left) * ratio);
            if value.is_finite() {
                return Sign::of(value);
            }
        }
    }
    prev.unwrap_or(Sign::Pos)
}

/// Sign of `f` on each interval between sorted points.
pub fn compute_segments<F>(f: F, points: &[CriticalPoint], domain: &Domain) -> Vec<Sign>
where
    F: Fn(Number) -> Number,
{
    let bounds = boundaries(points, domain);
    let mut ret: Vec<Sign> = Vec::with_capacity(bounds.len() - 1);
    for pair in bounds.windows(2) {
        let sign = sample_sign(&f, pair[0], pair[1], ret.last().copied());
        ret.push(sign);
    }
    ret
}

fn display_expr(text: &str) -> String {
    text.replace("**", "^")
}

/// `x - 2`, `x + 3` or `x`.
fn linear_label(value: Number) -> String {
    let value = round_key(value);
    if value == 0.0 {
        String::from("x")
    } else if value > 0.0 {
        format!("x - {value}")
    } else {
        format!("x + {}", -value)
    }
}

fn row_segments(bounds: &[Number], value: Number, multiplicity: u32, sign: Sign) -> Vec<Sign> {
    bounds
        .windows(2)
        .map(|pair| {
            if multiplicity % 2 == 0 {
                sign
            } else {
                sign * Sign::of(choose_sample(pair[0], pair[1]) - value)
            }
        })
        .collect()
}

/// One row per distinct linear factor, merged by expression text.
pub fn build_linear_factor_rows(
    factors: &[Factor],
    points: &[CriticalPoint],
    domain: &Domain,
) -> Vec<FactorRow> {
    #[derive(PartialEq, Eq, Hash)]
    enum RowKey<'a> {
        Expr(PointTyp, &'a str),
        Value(PointKey),
    }

    struct Merged<'a> {
        factor: &'a Factor,
        multiplicity: u32,
        sign: Sign,
    }

    let mut merged: Vec<Merged> = Vec::new();
    let mut index: HashMap<RowKey, usize> = HashMap::new();
    for factor in factors.iter().filter(|factor| factor.value.is_finite()) {
        let key = if factor.base_expr.is_empty() {
            RowKey::Value(PointKey::new(factor.typ, factor.value))
        } else {
            RowKey::Expr(factor.typ, &factor.base_expr)
        };
        match index.get(&key) {
            Some(&idx) => {
                merged[idx].multiplicity += factor.multiplicity;
                merged[idx].sign = merged[idx].sign * factor.sign_contribution();
            }
            None => {
                index.insert(key, merged.len());
                merged.push(Merged {
                    factor,
                    multiplicity: factor.multiplicity,
                    sign: factor.sign_contribution(),
                });
            }
        }
    }

    let bounds = boundaries(points, domain);
    merged
        .into_iter()
        .map(|row| {
            let base = display_expr(&row.factor.base_expr);
            let label = match row.multiplicity {
                1 => base,
                n => format!("({base})^{n}"),
            };
            FactorRow {
                label,
                segments: row_segments(&bounds, row.factor.value, row.multiplicity, row.sign),
                typ: row.factor.typ,
                value: row.factor.value,
                multiplicity: row.multiplicity,
            }
        })
        .collect()
}

/// One row per zero, from its position alone.
pub fn build_fallback_factor_rows(points: &[CriticalPoint], domain: &Domain) -> Vec<FactorRow> {
    let bounds = boundaries(points, domain);
    points
        .iter()
        .filter(|point| point.typ == PointTyp::Zero)
        .map(|point| FactorRow {
            label: match point.multiplicity {
                1 => linear_label(point.value),
                n => format!("({})^{n}", linear_label(point.value)),
            },
            segments: row_segments(&bounds, point.value, point.multiplicity, Sign::Pos),
            typ: point.typ,
            value: point.value,
            multiplicity: point.multiplicity,
        })
        .collect()
}

/// Symbolic rows topped up with position-only rows. Empty unless there are
/// at least two.
pub fn build_factor_rows(
    factors: &[Factor],
    points: &[CriticalPoint],
    domain: &Domain,
) -> Vec<FactorRow> {
    let mut seen: Vec<PointKey> = Vec::new();
    let mut rows = Vec::new();
    let candidates = build_linear_factor_rows(factors, points, domain)
        .into_iter()
        .chain(build_fallback_factor_rows(points, domain));
    for row in candidates {
        let key = PointKey::new(row.typ, row.value);
        if !seen.contains(&key) {
            seen.push(key);
            rows.push(row);
        }
    }
    if rows.len() < 2 {
        return Vec::new();
    }
    rows.sort_by(|a, b| a.value.total_cmp(&b.value).then(a.typ.cmp(&b.typ)));
    rows
}

/// Sign chart of an already sanitized expression. Does not check the
/// auto-generation allow-list.
pub fn analyze(sanitized: &str, fun: &Evaluator, previous: Option<Domain>) -> Solution {
    let structure = extract_structure(sanitized);
    let mut points = build_points(&structure);

    if points.is_empty() || !structure.unparsed.is_empty() {
        let numeric = find_numeric_zeros(|x| fun.call(x), &points);
        points = merge_points(points, numeric);
    }

    let domain = compute_auto_domain(&points, previous);
    let segments = compute_segments(|x| fun.call(x), &points, &domain);
    let factor_rows = build_factor_rows(&structure.factors, &points, &domain);
    log::debug!(
        "'{sanitized}': {} points on {domain}, {} factor rows",
        points.len(),
        factor_rows.len()
    );

    Solution {
        points,
        segments,
        domain,
        expression: sanitized.to_string(),
        factor_rows,
    }
}

pub fn generate_solution(raw: &str) -> Result<Solution, SolveErr> {
    generate_solution_with(raw, None)
}

/// Like [`generate_solution`], reusing the span of `previous` when there
/// is a single critical point.
pub fn generate_solution_with(raw: &str, previous: Option<Domain>) -> Result<Solution, SolveErr> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(SolveErr::EmptyInput);
    }
    let sanitized = sanitize_expression(&normalized);
    if sanitized.is_empty() {
        return Err(SolveErr::Unparseable);
    }
    if let Some(found) = first_disallowed(&sanitized) {
        return Err(SolveErr::DisallowedCharacters { found });
    }
    let fun = compile_evaluator(&sanitized).map_err(SolveErr::CompileFailure)?;
    log::debug!("solving '{normalized}' as '{sanitized}'");

    let mut solution = analyze(&sanitized, &fun, previous);
    solution.expression = normalized;
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::extract_structure;
    use approx::assert_abs_diff_eq;

    #[test]
    fn points_merge_by_rounded_value() {
        let structure = extract_structure("(x-2)*(x-2.0000001)/(x+1)");
        let points = build_points(&structure);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], CriticalPoint::pole(-1.0, 1));
        assert_eq!(points[1].typ, PointTyp::Zero);
        assert_eq!(points[1].multiplicity, 2);
    }

    #[test]
    fn numeric_merge_takes_larger_multiplicity() {
        let mut numeric = CriticalPoint::zero(1.0, 2);
        numeric.numeric = true;
        let merged = merge_points(
            vec![CriticalPoint::zero(1.0, 1)],
            vec![numeric, CriticalPoint::zero(-3.0, 1)],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, -3.0);
        assert_eq!(merged[1].multiplicity, 2);
        assert!(!merged[1].numeric);
    }

    #[test]
    fn auto_domain_without_points() {
        assert_eq!(compute_auto_domain(&[], None), Domain::DEFAULT);
    }

    #[test]
    fn auto_domain_single_point() {
        let domain = compute_auto_domain(&[CriticalPoint::zero(1.0, 1)], None);
        assert_eq!(domain, Domain { min: -1.0, max: 3.0 });

        // inside the previous window with room to spare
        let previous = Domain {
            min: -10.0,
            max: 10.0,
        };
        let domain = compute_auto_domain(&[CriticalPoint::zero(1.0, 1)], Some(previous));
        assert_eq!(domain, previous);

        // too close to the right edge: shifted, same span
        let domain = compute_auto_domain(&[CriticalPoint::zero(9.5, 1)], Some(previous));
        assert_abs_diff_eq!(domain.span(), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(domain.max, 13.5, epsilon = 1e-12);

        // an invalid previous domain is ignored
        let degenerate = Domain { min: 2.0, max: 2.0 };
        let domain = compute_auto_domain(&[CriticalPoint::zero(0.0, 1)], Some(degenerate));
        assert_eq!(domain, Domain { min: -2.0, max: 2.0 });
    }

    #[test]
    fn auto_domain_several_points() {
        let points = [CriticalPoint::zero(-2.0, 1), CriticalPoint::pole(3.0, 1)];
        let domain = compute_auto_domain(&points, None);
        assert_eq!(domain, Domain { min: -3.0, max: 4.0 });

        let points = [CriticalPoint::zero(-20.0, 1), CriticalPoint::zero(20.0, 1)];
        let domain = compute_auto_domain(&points, None);
        assert_eq!(domain, Domain { min: -28.0, max: 28.0 });

        let points = [CriticalPoint::zero(5.0, 1), CriticalPoint::pole(5.0, 1)];
        let domain = compute_auto_domain(&points, None);
        assert_eq!(domain, Domain { min: 3.0, max: 7.0 });
    }

    #[test]
    fn override_resolution() {
        let auto = Domain { min: -4.0, max: 6.0 };
        let user = DomainOverride {
            min: Some(0.0),
            max: None,
        };
        assert_eq!(resolve_domain(&user, &auto), Domain { min: 0.0, max: 6.0 });

        let user = DomainOverride {
            min: Some(5.0),
            max: Some(1.0),
        };
        assert_eq!(resolve_domain(&user, &auto), Domain { min: 1.0, max: 5.0 });

        let user = DomainOverride {
            min: Some(2.0),
            max: Some(2.0),
        };
        assert_eq!(resolve_domain(&user, &auto), Domain { min: 1.5, max: 2.5 });

        let user = DomainOverride {
            min: Some(Number::NAN),
            max: None,
        };
        assert_eq!(resolve_domain(&user, &auto), auto);
    }

    #[test]
    fn sample_choice() {
        assert_eq!(choose_sample(0.0, 2.0), 1.0);
        assert_eq!(choose_sample(Number::NEG_INFINITY, 2.0), 1.0);
        assert_eq!(choose_sample(2.0, Number::INFINITY), 3.0);
        assert_eq!(choose_sample(Number::NEG_INFINITY, Number::INFINITY), 0.0);
        let sample = choose_sample(1.0, 1.0001);
        assert!(sample > 1.0 && sample < 1.0001);
    }

    #[test]
    fn segments_carry_sign_over_undefined_intervals() {
        let points = [CriticalPoint::zero(0.0, 1)];
        let domain = Domain { min: -2.0, max: 2.0 };
        // undefined left of zero
        let segments = compute_segments(|x: Number| x.sqrt() - 0.5, &points, &domain);
        assert_eq!(segments, [Sign::Pos, Sign::Pos]);
        let segments = compute_segments(|x: Number| -x.sqrt(), &points, &domain);
        assert_eq!(segments, [Sign::Pos, Sign::Neg]);
    }

    #[test]
    fn factor_row_follows_slope() {
        let structure = extract_structure("(2-x)*(x+1)");
        let points = build_points(&structure);
        let domain = compute_auto_domain(&points, None);
        let rows = build_factor_rows(&structure.factors, &points, &domain);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "x+1");
        assert_eq!(rows[0].segments, [Sign::Neg, Sign::Pos, Sign::Pos]);
        assert_eq!(rows[1].label, "2-x");
        assert_eq!(rows[1].segments, [Sign::Pos, Sign::Pos, Sign::Neg]);
    }

    #[test]
    fn repeated_factor_rows_merge() {
        let structure = extract_structure("(x-2)*(x-2)*x");
        let points = build_points(&structure);
        let domain = compute_auto_domain(&points, None);
        let rows = build_factor_rows(&structure.factors, &points, &domain);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].label, "(x-2)^2");
        assert_eq!(rows[1].multiplicity, 2);
        assert!(rows[1].segments.iter().all(|sign| *sign == Sign::Pos));
    }

    #[test]
    fn single_row_is_not_shown() {
        let structure = extract_structure("x-1");
        let points = build_points(&structure);
        let domain = compute_auto_domain(&points, None);
        assert!(build_factor_rows(&structure.factors, &points, &domain).is_empty());
    }

    #[test]
    fn fallback_rows_from_positions() {
        let mut points = vec![CriticalPoint::zero(-1.5, 1), CriticalPoint::zero(2.0, 2)];
        points.push(CriticalPoint::pole(4.0, 1));
        let domain = Domain { min: -5.0, max: 5.0 };
        let rows = build_fallback_factor_rows(&points, &domain);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "x + 1.5");
        assert_eq!(
            rows[0].segments,
            [Sign::Neg, Sign::Pos, Sign::Pos, Sign::Pos]
        );
        assert_eq!(rows[1].label, "(x - 2)^2");
        assert!(rows[1].segments.iter().all(|sign| *sign == Sign::Pos));
    }

    #[test]
    fn errors() {
        assert!(matches!(generate_solution(""), Err(SolveErr::EmptyInput)));
        assert!(matches!(
            generate_solution("x^2 + pi"),
            Err(SolveErr::DisallowedCharacters { found: 'p' })
        ));
        assert!(matches!(
            generate_solution("x+"),
            Err(SolveErr::CompileFailure(_))
        ));
        assert!(matches!(
            generate_solution("()"),
            Err(SolveErr::CompileFailure(_))
        ));
    }
}
