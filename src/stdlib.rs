// SPDX: CC0-1.0

use crate::{eval::*, Number};
use core::f64::consts;
use std::collections::HashMap; // assumes Number = f64

/// The only variable an expression may use.
pub const X: &str = "x";

pub fn standard_idents() -> Idents {
    let mut ret = HashMap::new();

    ret.insert(X.into(), Ident::Var(0));

    ret.insert("pi".into(), Ident::Const(consts::PI));
    ret.insert("tau".into(), Ident::Const(consts::TAU));
    ret.insert("e".into(), Ident::Const(consts::E));

    let one = Arity::exactly(1);
    let two = Arity::exactly(2);

    ret.insert("abs".into(), Ident::Fun(Fun::new(one, abs)));
    ret.insert("sqrt".into(), Ident::Fun(Fun::new(one, sqrt)));
    ret.insert("cbrt".into(), Ident::Fun(Fun::new(one, cbrt)));
    ret.insert("pow".into(), Ident::Fun(Fun::new(two, pow)));
    ret.insert("hypot".into(), Ident::Fun(Fun::new(Arity::at_least(1), hypot)));

    // logarithms; `log` with one argument is natural, like the host math library
    ret.insert("exp".into(), Ident::Fun(Fun::new(one, exp)));
    ret.insert("ln".into(), Ident::Fun(Fun::new(one, ln)));
    ret.insert("log".into(), Ident::Fun(Fun::new(Arity::between(1, 2), log)));
    ret.insert("lg".into(), Ident::Fun(Fun::new(one, log10)));
    ret.insert("log10".into(), Ident::Fun(Fun::new(one, log10)));
    ret.insert("log2".into(), Ident::Fun(Fun::new(one, log2)));

    // trig
    ret.insert("sin".into(), Ident::Fun(Fun::new(one, sin)));
    ret.insert("cos".into(), Ident::Fun(Fun::new(one, cos)));
    ret.insert("tan".into(), Ident::Fun(Fun::new(one, tan)));
    ret.insert("asin".into(), Ident::Fun(Fun::new(one, arcsin)));
    ret.insert("acos".into(), Ident::Fun(Fun::new(one, arccos)));
    ret.insert("atan".into(), Ident::Fun(Fun::new(one, arctan)));
    ret.insert("arcsin".into(), Ident::Fun(Fun::new(one, arcsin)));
    ret.insert("arccos".into(), Ident::Fun(Fun::new(one, arccos)));
    ret.insert("arctan".into(), Ident::Fun(Fun::new(one, arctan)));
    ret.insert("atan2".into(), Ident::Fun(Fun::new(two, atan2)));
    ret.insert("sinh".into(), Ident::Fun(Fun::new(one, sinh)));
    ret.insert("cosh".into(), Ident::Fun(Fun::new(one, cosh)));
    ret.insert("tanh".into(), Ident::Fun(Fun::new(one, tanh)));

    // rounding
    ret.insert("floor".into(), Ident::Fun(Fun::new(one, floor)));
    ret.insert("ceil".into(), Ident::Fun(Fun::new(one, ceil)));
    ret.insert("round".into(), Ident::Fun(Fun::new(one, round)));
    ret.insert("trunc".into(), Ident::Fun(Fun::new(one, trunc)));
    ret.insert("sign".into(), Ident::Fun(Fun::new(one, sign)));

    ret.insert("min".into(), Ident::Fun(Fun::new(Arity::at_least(1), min)));
    ret.insert("max".into(), Ident::Fun(Fun::new(Arity::at_least(1), max)));
    ret
}

#[track_caller]
fn expect_n<const N: usize>(args: &[Number]) -> [Number; N] {
    assert_eq!(args.len(), N);
    args[..N].try_into().unwrap()
}

pub fn neg(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    -x
}

pub fn pos(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x
}

pub fn add(args: &[Number]) -> Number {
    let [x, y] = expect_n::<2>(args);
    x + y
}

pub fn sub(args: &[Number]) -> Number {
    let [x, y] = expect_n::<2>(args);
    x - y
}

pub fn mul(args: &[Number]) -> Number {
    let [x, y] = expect_n::<2>(args);
    x * y
}

pub fn div(args: &[Number]) -> Number {
    let [x, y] = expect_n::<2>(args);
    x / y
}

pub fn pow(args: &[Number]) -> Number {
    let [x, exp] = expect_n::<2>(args);
    x.powf(exp)
}

pub fn abs(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.abs()
}

pub fn sqrt(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.sqrt()
}

pub fn cbrt(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.cbrt()
}

pub fn hypot(args: &[Number]) -> Number {
    args.iter().map(|x| x * x).sum::<Number>().sqrt()
}

pub fn exp(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.exp()
}

pub fn ln(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.ln()
}

pub fn log(args: &[Number]) -> Number {
    match *args {
        [x] => x.ln(),
        [x, base] => x.log(base),
        _ => Number::NAN,
    }
}

pub fn log10(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.log10()
}

pub fn log2(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.log2()
}

pub fn sin(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.sin()
}

pub fn cos(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.cos()
}

pub fn tan(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.tan()
}

pub fn arcsin(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.asin()
}

pub fn arccos(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.acos()
}

pub fn arctan(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.atan()
}

pub fn atan2(args: &[Number]) -> Number {
    let [y, x] = expect_n::<2>(args);
    y.atan2(x)
}

pub fn sinh(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.sinh()
}

pub fn cosh(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.cosh()
}

pub fn tanh(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.tanh()
}

pub fn floor(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.floor()
}

pub fn ceil(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.ceil()
}

/// Halves round up, towards positive infinity.
pub fn round(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    (x + 0.5).floor()
}

pub fn trunc(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    x.trunc()
}

/// Unlike `f64::signum`, zero maps to zero.
pub fn sign(args: &[Number]) -> Number {
    let [x] = expect_n::<1>(args);
    if x == 0.0 || x.is_nan() {
        x
    } else {
        x.signum()
    }
}

pub fn min(args: &[Number]) -> Number {
    args.iter().copied().fold(Number::INFINITY, |acc, x| {
        if acc.is_nan() || x.is_nan() {
            Number::NAN
        } else {
            acc.min(x)
        }
    })
}

pub fn max(args: &[Number]) -> Number {
    args.iter().copied().fold(Number::NEG_INFINITY, |acc, x| {
        if acc.is_nan() || x.is_nan() {
            Number::NAN
        } else {
            acc.max(x)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_like_rounding_and_sign() {
        assert_eq!(round(&[2.5]), 3.0);
        assert_eq!(round(&[-2.5]), -2.0);
        assert_eq!(sign(&[0.0]), 0.0);
        assert_eq!(sign(&[-3.0]), -1.0);
    }

    #[test]
    fn variadic_extrema_propagate_nan() {
        assert_eq!(min(&[3.0, -1.0, 2.0]), -1.0);
        assert_eq!(max(&[3.0, -1.0, 2.0]), 3.0);
        assert!(max(&[1.0, Number::NAN]).is_nan());
    }

    #[test]
    fn log_bases() {
        assert!((log(&[consts::E]) - 1.0).abs() < 1e-12);
        assert!((log(&[8.0, 2.0]) - 3.0).abs() < 1e-12);
        assert!((log10(&[1000.0]) - 3.0).abs() < 1e-12);
    }
}
