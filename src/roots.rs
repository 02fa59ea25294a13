// SPDX: CC0-1.0

//! Numeric search for zeros the factor parser could not see.
//!
//! Sign changes between samples are bisected. Zeros of even multiplicity
//! never change sign, so samples that come close to zero get a closer look:
//! first symmetric probes around the sample, then a scan for a local minimum
//! of `|f|` that reaches zero.

use crate::{round_key, CriticalPoint, Number, PointKey, PointTyp, Sign};
use std::collections::HashSet;

/// Half-widths of the symmetric intervals scanned by default.
pub const SEARCH_RANGES: [Number; 3] = [10.0, 25.0, 50.0];
const EXTRA_RANGE_PAD: Number = 5.0;
const EXTRA_RANGE_CAP: Number = 100.0;

/// Samples per range, ends included.
pub const SAMPLES: usize = 601;

const NEAR_ZERO: Number = 1e-3;
const FLAT_DERIVATIVE: Number = 1e-4;
const TOUCH_FLOOR: Number = 1e-4;
const STATIONARY_OFFSETS: [Number; 4] = [1e-3, 5e-3, 1e-2, 5e-2];
const MINIMUM_WINDOWS: [Number; 4] = [0.5, 0.25, 0.1, 0.05];
const WINDOW_SAMPLES: usize = 101;

const BISECT_ITERATIONS: usize = 60;
const BISECT_VALUE_TOLERANCE: Number = 1e-7;
const BISECT_WIDTH_TOLERANCE: Number = 1e-6;

/// Closer than this to a known zero counts as the same zero.
const SEEN_DISTANCE: Number = 1e-5;

/// Ranges to scan given the points already known.
pub fn search_ranges(existing: &[CriticalPoint]) -> Vec<Number> {
    let mut ranges = SEARCH_RANGES.to_vec();
    let largest = existing
        .iter()
        .map(|point| point.value.abs())
        .filter(|value| value.is_finite())
        .fold(0.0, Number::max);
    let extra = (largest + EXTRA_RANGE_PAD).min(EXTRA_RANGE_CAP);
    if extra > SEARCH_RANGES[SEARCH_RANGES.len() - 1] {
        ranges.push(extra);
    }
    ranges
}

struct Seen {
    keys: HashSet<PointKey>,
    values: Vec<Number>,
}

impl Seen {
    fn new(existing: &[CriticalPoint]) -> Self {
        let zeros = existing.iter().filter(|point| point.typ == PointTyp::Zero);
        Self {
            keys: zeros.clone().map(CriticalPoint::key).collect(),
            values: zeros.map(|point| point.value).collect(),
        }
    }

    /// False if the value was seen before.
    fn insert(&mut self, value: Number) -> bool {
        let key = PointKey::new(PointTyp::Zero, value);
        if self.keys.contains(&key)
            || self
                .values
                .iter()
                .any(|seen| (seen - value).abs() < SEEN_DISTANCE)
        {
            return false;
        }
        self.keys.insert(key);
        self.values.push(value);
        true
    }
}

fn sample_at(range: Number, idx: usize) -> Number {
    // multiply before dividing so grid points land on integers exactly
    -range + 2.0 * range * idx as Number / (SAMPLES - 1) as Number
}

/// Zeros of `f` that are not already among `existing`, in discovery order.
/// Every finite sample of the first range is exactly zero, and there is at
/// least one.
fn vanishes_everywhere<F: Fn(Number) -> Number>(f: &F) -> bool {
    let mut any = false;
    for idx in 0..SAMPLES {
        let y = f(sample_at(SEARCH_RANGES[0], idx));
        if !y.is_finite() {
            continue;
        }
        if y != 0.0 {
            return false;
        }
        any = true;
    }
    any
}

pub fn find_numeric_zeros<F>(f: F, existing: &[CriticalPoint]) -> Vec<CriticalPoint>
where
    F: Fn(Number) -> Number,
{
    if vanishes_everywhere(&f) {
        log::debug!("function is zero on every sample, skipping numeric search");
        return Vec::new();
    }

    let mut seen = Seen::new(existing);
    let mut found = Vec::new();
    let mut record = |value: Number, multiplicity: u32| {
        let value = round_key(value);
        if seen.insert(value) {
            log::trace!("numeric zero at {value} (multiplicity {multiplicity})");
            found.push(CriticalPoint {
                value,
                typ: PointTyp::Zero,
                multiplicity,
                numeric: true,
            });
        }
    };

    for range in search_ranges(existing) {
        let mut prev: Option<(Number, Number)> = None;
        for idx in 0..SAMPLES {
            let x = sample_at(range, idx);
            let y = f(x);
            if !y.is_finite() {
                prev = None;
                continue;
            }

            if y == 0.0 {
                record(x, touch_multiplicity(&f, x));
            } else if y.abs() < NEAR_ZERO {
                if let Some((root, multiplicity)) = check_stationary_zero(&f, x, y) {
                    record(root, multiplicity);
                }
            }

            if let Some((prev_x, prev_y)) = prev {
                if prev_y != 0.0 && y != 0.0 && Sign::of(prev_y) != Sign::of(y) {
                    if let Some(root) = bisect(&f, prev_x, x) {
                        record(root, 1);
                    }
                }
            }
            prev = Some((x, y));
        }
    }

    log::debug!("numeric search found {} new zeros", found.len());
    found
}

/// 2 if `f` keeps its sign on both sides of the exact zero at `x`.
fn touch_multiplicity<F>(f: &F, x: Number) -> u32
where
    F: Fn(Number) -> Number,
{
    let h = STATIONARY_OFFSETS[0];
    let (left, right) = (f(x - h), f(x + h));
    let touches = left.is_finite()
        && right.is_finite()
        && left != 0.0
        && right != 0.0
        && Sign::of(left) == Sign::of(right);
    if touches {
        2
    } else {
        1
    }
}

/// Closer look at a sample `y = f(x)` that is small but not zero.
pub fn check_stationary_zero<F>(f: &F, x: Number, y: Number) -> Option<(Number, u32)>
where
    F: Fn(Number) -> Number,
{
    for h in STATIONARY_OFFSETS {
        let (left_x, right_x) = (x - h, x + h);
        let (left, right) = (f(left_x), f(right_x));
        if !left.is_finite() || !right.is_finite() {
            continue;
        }

        // ties go left
        if left == 0.0 {
            return Some((left_x, 1));
        }
        if right == 0.0 {
            return Some((right_x, 1));
        }

        if Sign::of(left) != Sign::of(right) {
            if let Some(root) = bisect(f, left_x, right_x) {
                return Some((root, 1));
            }
            continue;
        }

        let derivative = (right - left) / (2.0 * h);
        if derivative.abs() < FLAT_DERIVATIVE
            && left.abs() >= y.abs()
            && right.abs() >= y.abs()
            && y.abs() < TOUCH_FLOOR
        {
            return Some((x, 2));
        }
    }

    if y.abs() < NEAR_ZERO {
        local_minimum(f, x).map(|root| (root, 2))
    } else {
        None
    }
}

/// A local minimum of `|f|` near `x` that dips to zero.
fn local_minimum<F>(f: &F, x: Number) -> Option<Number>
where
    F: Fn(Number) -> Number,
{
    for width in MINIMUM_WINDOWS {
        let edge_left = f(x - width).abs();
        let edge_right = f(x + width).abs();
        if !edge_left.is_finite() || !edge_right.is_finite() {
            continue;
        }

        let step = 2.0 * width / (WINDOW_SAMPLES - 1) as Number;
        let lowest = (0..WINDOW_SAMPLES)
            .map(|idx| x - width + step * idx as Number)
            .map(|t| (t, f(t).abs()))
            .filter(|(_, value)| value.is_finite())
            .min_by(|(_, a), (_, b)| a.total_cmp(b));
        let Some((at, value)) = lowest else {
            continue;
        };

        if value < edge_left - NEAR_ZERO && value < edge_right - NEAR_ZERO && value < TOUCH_FLOOR
        {
            return Some(polish_minimum(f, at, step));
        }
    }
    None
}

/// Ternary search for the minimum of `|f|` within `radius` of `center`.
fn polish_minimum<F>(f: &F, center: Number, radius: Number) -> Number
where
    F: Fn(Number) -> Number,
{
    let (mut lo, mut hi) = (center - radius, center + radius);
    for _ in 0..BISECT_ITERATIONS {
        let third = (hi - lo) / 3.0;
        let (a, b) = (lo + third, hi - third);
        let (fa, fb) = (f(a).abs(), f(b).abs());
        if !fa.is_finite() || !fb.is_finite() {
            break;
        }
        if fa <= fb {
            hi = b;
        } else {
            lo = a;
        }
    }
    (lo + hi) / 2.0
}

/// Refine a sign change between `a` and `b`. `None` when the bracket turns
/// out to hold a pole rather than a zero.
pub fn bisect<F>(f: &F, a: Number, b: Number) -> Option<Number>
where
    F: Fn(Number) -> Number,
{
    let (mut lo, mut hi) = (a.min(b), a.max(b));
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if !f_lo.is_finite() || !f_hi.is_finite() {
        return None;
    }
    if f_lo == 0.0 {
        return Some(lo);
    }
    if f_hi == 0.0 {
        return Some(hi);
    }
    let limit = f_lo.abs().max(f_hi.abs());

    for _ in 0..BISECT_ITERATIONS {
        let mut mid = (lo + hi) / 2.0;
        let mut f_mid = f(mid);
        if !f_mid.is_finite() {
            // nudge the midpoint inward until something evaluates
            let nudged = [0.25, 0.75]
                .into_iter()
                .map(|ratio| lo + (hi - lo) * ratio)
                .map(|t| (t, f(t)))
                .find(|(_, value)| value.is_finite());
            match nudged {
                Some((t, value)) => (mid, f_mid) = (t, value),
                None => return None,
            }
        }

        if f_mid.abs() < BISECT_VALUE_TOLERANCE || hi - lo < BISECT_WIDTH_TOLERANCE {
            return (f_mid.abs() <= limit).then_some(mid);
        }
        if Sign::of(f_mid) == Sign::of(f_lo) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    let mid = (lo + hi) / 2.0;
    (f(mid).abs() <= limit).then_some(mid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use core::f64::consts::PI;

    fn values(points: &[CriticalPoint]) -> Vec<Number> {
        let mut ret: Vec<_> = points.iter().map(|point| point.value).collect();
        ret.sort_by(Number::total_cmp);
        ret
    }

    #[test]
    fn ranges_grow_with_known_points() {
        assert_eq!(search_ranges(&[]), [10.0, 25.0, 50.0]);
        assert_eq!(
            search_ranges(&[CriticalPoint::zero(70.0, 1)]),
            [10.0, 25.0, 50.0, 75.0]
        );
        assert_eq!(
            search_ranges(&[CriticalPoint::pole(-400.0, 1)]),
            [10.0, 25.0, 50.0, 100.0]
        );
        assert_eq!(search_ranges(&[CriticalPoint::zero(40.0, 1)]), SEARCH_RANGES);
    }

    #[test]
    fn grid_hits_every_integer() {
        assert_eq!(sample_at(10.0, 330), 1.0);
        assert_eq!(sample_at(10.0, 300), 0.0);
        assert_eq!(sample_at(25.0, 600), 25.0);
    }

    #[test]
    fn simple_crossings() {
        let zeros = find_numeric_zeros(|x| x * x * x - 2.0 * x, &[]);
        let found = values(&zeros);
        assert_eq!(found.len(), 3);
        assert_abs_diff_eq!(found[0], -(2.0 as Number).sqrt(), epsilon = 1e-5);
        assert_abs_diff_eq!(found[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(found[2], (2.0 as Number).sqrt(), epsilon = 1e-5);
        assert!(zeros.iter().all(|point| point.numeric && point.multiplicity == 1));
    }

    #[test]
    fn double_root_on_grid() {
        let zeros = find_numeric_zeros(|x| (x - 1.0) * (x - 1.0), &[]);
        assert_eq!(zeros.len(), 1);
        assert_eq!(zeros[0].value, 1.0);
        assert_eq!(zeros[0].multiplicity, 2);
    }

    #[test]
    fn double_root_between_samples() {
        let zeros = find_numeric_zeros(|x| (x - PI) * (x - PI), &[]);
        assert_eq!(zeros.len(), 1);
        assert_abs_diff_eq!(zeros[0].value, PI, epsilon = 1e-5);
        assert_eq!(zeros[0].multiplicity, 2);
    }

    #[test]
    fn plateau_above_zero_is_not_a_root() {
        assert!(find_numeric_zeros(|x| x * x + 5e-4, &[]).is_empty());
        assert!(find_numeric_zeros(|x| x * x + 1.0, &[]).is_empty());
    }

    #[test]
    fn known_zeros_are_skipped() {
        let existing = [CriticalPoint::zero(2.0, 1)];
        let zeros = find_numeric_zeros(|x| (x - 2.0) * (x + 1.0), &existing);
        assert_eq!(values(&zeros), [-1.0]);
    }

    #[test]
    fn poles_are_not_zeros() {
        assert!(find_numeric_zeros(|x| 1.0 / (x - 0.01), &[]).is_empty());
        assert!(find_numeric_zeros(|x| 1.0 / x, &[]).is_empty());
    }

    #[test]
    fn undefined_regions_are_skipped() {
        let zeros = find_numeric_zeros(|x| x.sqrt() - 1.0, &[]);
        assert_eq!(values(&zeros), [1.0]);
    }

    #[test]
    fn stationary_flat_near_grid_point() {
        let f = |x: Number| (x - 0.1) * (x - 0.1);
        let x = sample_at(10.0, 303);
        let (root, multiplicity) = check_stationary_zero(&f, x, f(x)).unwrap();
        assert_abs_diff_eq!(root, 0.1, epsilon = 1e-9);
        assert_eq!(multiplicity, 2);
    }

    #[test]
    fn stationary_check_bisects_a_nearby_crossing() {
        let f = |x: Number| x - 4e-4;
        let (root, multiplicity) = check_stationary_zero(&f, 0.0, f(0.0)).unwrap();
        assert_abs_diff_eq!(root, 4e-4, epsilon = 1e-6);
        assert_eq!(multiplicity, 1);
    }

    #[test]
    fn stationary_check_rejects_a_plateau() {
        let f = |x: Number| x * x + 5e-4;
        assert!(check_stationary_zero(&f, 0.0, f(0.0)).is_none());
    }

    #[test]
    fn identically_zero_is_skipped() {
        assert!(find_numeric_zeros(|_| 0.0, &[]).is_empty());
        assert!(find_numeric_zeros(|x| x - x, &[]).is_empty());
        assert!(!vanishes_everywhere(&|x: Number| if x == 0.0 { 0.0 } else { x }));
        assert!(!vanishes_everywhere(&|_| Number::NAN));
    }

    #[test]
    fn bisect_converges() {
        let root = bisect(&|x: Number| x.sin(), 3.0, 3.3).unwrap();
        assert_abs_diff_eq!(root, PI, epsilon = 1e-6);
        assert!(bisect(&|x: Number| 1.0 / x, -0.1, 0.2).is_none());
    }
}
