// SPDX: CC0-1.0

use approx::assert_abs_diff_eq;
use fortegn::{
    compile::{compile_evaluator, sanitize_expression},
    normalize::normalize,
    solution::{analyze, generate_solution, SolveErr},
    PointTyp, Sign,
};

const EXPRESSIONS: &[&str] = &[
    "x-1",
    "(x-1)^2",
    "(x-2)*(x-2)",
    "(x+1)(x-2)/(x-3)",
    "(2-x)^3*(x+4)^2",
    "x^3-2x",
    "1/x",
    "x^2+1",
    "2",
    "-3(x+1,5)/(x-2)^2",
];

#[test]
fn normalization_is_idempotent() {
    let inputs = [
        r"\frac{x-1}{x+2}",
        r"f(x) = \left(x-1\right)^{2}\cdot\sqrt{x}",
        r"y = \dfrac{\pi}{2} - x",
        "2x² − 3·x",
        "  (x - 1)(x + 2)  ",
        "x**2 / 4",
        "frac(1, x)",
        r"x\\1",
        r"\frac{1}{x}\\",
        "",
    ];
    for input in inputs {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "input {input:?}");
    }
}

#[test]
fn one_more_segment_than_points() {
    for expr in EXPRESSIONS {
        let solution = generate_solution(expr).unwrap();
        assert_eq!(solution.segments.len(), solution.points.len() + 1, "{expr}");
        for row in &solution.factor_rows {
            assert_eq!(row.segments.len(), solution.points.len() + 1, "{expr}");
        }
    }
}

#[test]
fn points_are_sorted() {
    for expr in EXPRESSIONS {
        let solution = generate_solution(expr).unwrap();
        assert!(
            solution
                .points
                .windows(2)
                .all(|pair| pair[0].value <= pair[1].value),
            "{expr}"
        );
        assert!(solution.domain.is_valid(), "{expr}");
        assert!(
            solution
                .points
                .iter()
                .all(|point| solution.domain.contains(point.value)),
            "{expr}"
        );
    }
}

#[test]
fn repeated_factor_merges() {
    let solution = generate_solution("(x-2)*(x-2)").unwrap();
    assert_eq!(solution.points.len(), 1);
    assert_eq!(solution.points[0].value, 2.0);
    assert_eq!(solution.points[0].typ, PointTyp::Zero);
    assert_eq!(solution.points[0].multiplicity, 2);
}

#[test]
fn simple_crossing() {
    let solution = generate_solution("x-1").unwrap();
    assert_eq!(solution.points.len(), 1);
    assert_eq!(solution.points[0].value, 1.0);
    assert_eq!(solution.points[0].typ, PointTyp::Zero);
    assert_eq!(solution.points[0].multiplicity, 1);
    assert_eq!(solution.segments, [Sign::Neg, Sign::Pos]);
    assert!(solution.domain.min < 1.0 && 1.0 < solution.domain.max);
}

#[test]
fn allow_list_only_gates_auto_generation() {
    assert!(matches!(
        generate_solution("sin(x)"),
        Err(SolveErr::DisallowedCharacters { found: 's' })
    ));
    let fun = compile_evaluator(&sanitize_expression("sin(x)")).unwrap();
    assert_abs_diff_eq!(fun.call(1.0), 1.0_f64.sin());
}

#[test]
fn double_root_keeps_sign() {
    let solution = generate_solution("(x-1)^2").unwrap();
    assert_eq!(solution.points.len(), 1);
    assert_eq!(solution.points[0].value, 1.0);
    assert_eq!(solution.points[0].multiplicity, 2);
    assert_eq!(solution.segments[0], solution.segments[1]);
}

#[test]
fn numeric_fallback_merges_with_symbolic_roots() {
    let sanitized = sanitize_expression(&normalize("sin(x)*(x-2)"));
    let fun = compile_evaluator(&sanitized).unwrap();
    let solution = analyze(&sanitized, &fun, None);

    assert!(solution
        .points
        .iter()
        .any(|point| point.typ == PointTyp::Zero && point.value.abs() < 1e-6 && point.numeric));
    let symbolic: Vec<_> = solution
        .points
        .iter()
        .filter(|point| point.value == 2.0)
        .collect();
    assert_eq!(symbolic.len(), 1);
    assert!(!symbolic[0].numeric);
    assert_eq!(solution.segments.len(), solution.points.len() + 1);
}

#[test]
fn identically_zero_has_no_points() {
    for expr in ["0", "x-x"] {
        let solution = generate_solution(expr).unwrap();
        assert!(solution.points.is_empty(), "{expr}");
        assert_eq!(solution.segments.len(), 1, "{expr}");
    }
}

#[test]
fn empty_input() {
    assert!(matches!(generate_solution(""), Err(SolveErr::EmptyInput)));
    assert!(matches!(generate_solution("   "), Err(SolveErr::EmptyInput)));
}
