// SPDX: CC0-1.0

//! Plain text sign chart.
//!
//! ```text
//! x         -1     2
//! x+1    -  0   +     +
//! 2-x    +      +  0  -
//! f(x)   -  0   +  0  -
//! ```

use crate::{
    round_key,
    solution::{FactorRow, Solution},
    CriticalPoint, PointKey, PointTyp, Sign,
};

pub const DEFAULT_WIDTH: usize = 5;
pub const MIN_WIDTH: usize = 3;

const VALUE_LABEL: &str = "x";
const FUNCTION_LABEL: &str = "f(x)";

fn marker(typ: PointTyp) -> &'static str {
    match typ {
        PointTyp::Zero => "0",
        PointTyp::Pole => "|",
    }
}

struct Layout {
    label: usize,
    segment: usize,
    points: Vec<usize>,
}

impl Layout {
    fn line(&self, label: &str, segments: &[&str], marks: &[&str]) -> String {
        let mut out = format!("{label:<width$} ", width = self.label);
        for (idx, segment) in segments.iter().enumerate() {
            out.push_str(&format!("{segment:^width$}", width = self.segment));
            if let (Some(mark), Some(width)) = (marks.get(idx), self.points.get(idx)) {
                out.push_str(&format!("{mark:^width$}", width = *width));
            }
        }
        let len = out.trim_end().len();
        out.truncate(len);
        out.push('\n');
        out
    }
}

fn symbols(signs: &[Sign]) -> Vec<&'static str> {
    signs
        .iter()
        .map(|sign| match sign {
            Sign::Neg => "-",
            Sign::Pos => "+",
        })
        .collect()
}

fn row_marks(row: &FactorRow, points: &[CriticalPoint]) -> Vec<&'static str> {
    let own = PointKey::new(row.typ, row.value);
    points
        .iter()
        .map(|point| if point.key() == own { marker(row.typ) } else { "" })
        .collect()
}

pub fn render(solution: &Solution, width: usize) -> String {
    let values: Vec<String> = solution
        .points
        .iter()
        .map(|point| round_key(point.value).to_string())
        .collect();

    let label = solution
        .factor_rows
        .iter()
        .map(|row| row.label.len())
        .chain([VALUE_LABEL.len(), FUNCTION_LABEL.len()])
        .max()
        .unwrap_or_default();
    let layout = Layout {
        label,
        segment: width.max(MIN_WIDTH),
        points: values.iter().map(|text| text.len().max(1)).collect(),
    };

    let blank = vec![""; solution.segments.len()];
    let header: Vec<&str> = values.iter().map(String::as_str).collect();
    let mut out = layout.line(VALUE_LABEL, &blank, &header);

    for row in &solution.factor_rows {
        let segments = symbols(&row.segments);
        out.push_str(&layout.line(&row.label, &segments, &row_marks(row, &solution.points)));
    }

    let segments = symbols(&solution.segments);
    let marks: Vec<&str> = solution
        .points
        .iter()
        .map(|point| marker(point.typ))
        .collect();
    out.push_str(&layout.line(FUNCTION_LABEL, &segments, &marks));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::generate_solution;

    fn column_of(line: &str, needle: char) -> Option<usize> {
        line.find(needle)
    }

    #[test]
    fn single_zero() {
        let solution = generate_solution("x-1").unwrap();
        let chart = render(&solution, DEFAULT_WIDTH);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("x "));
        assert!(lines[1].starts_with("f(x) "));
        assert_eq!(column_of(lines[0], '1'), column_of(lines[1], '0'));
        assert!(column_of(lines[1], '-') < column_of(lines[1], '0'));
        assert!(column_of(lines[1], '+') > column_of(lines[1], '0'));
    }

    #[test]
    fn factor_rows_mark_their_own_point() {
        let solution = generate_solution("(x+1)(2-x)").unwrap();
        let chart = render(&solution, DEFAULT_WIDTH);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("x+1"));
        assert!(lines[2].starts_with("2-x"));
        assert_eq!(lines[1].matches('0').count(), 1);
        assert_eq!(lines[2].matches('0').count(), 1);
        assert!(column_of(lines[1], '0') < column_of(lines[2], '0'));
        assert_eq!(lines[3].matches('0').count(), 2);
        assert_eq!(
            lines[3].split_whitespace().collect::<Vec<_>>(),
            ["f(x)", "-", "0", "+", "0", "-"]
        );
    }

    #[test]
    fn poles_are_bars() {
        let solution = generate_solution("1/(x-3)").unwrap();
        let chart = render(&solution, 3);
        let last = chart.lines().last().unwrap();
        assert_eq!(
            last.split_whitespace().collect::<Vec<_>>(),
            ["f(x)", "-", "|", "+"]
        );
    }
}
