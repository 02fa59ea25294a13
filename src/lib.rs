// SPDX: CC0-1.0

pub mod chart;
pub mod compile;
pub mod eval;
pub mod factor;
pub mod group;
pub mod lex;
pub mod normalize;
pub mod parse;
pub mod roots;
pub mod shell;
pub mod solution;
pub mod stdlib;

use core::{fmt, ops::Mul};

pub type Number = f64;

/// Scale used when rounding critical point values into dedup keys.
const KEY_SCALE: Number = 1e6;

/// Round to the 6 decimal digits used for comparing critical points.
pub fn round_key(value: Number) -> Number {
    let rounded = (value * KEY_SCALE).round() / KEY_SCALE;
    // fold -0.0 into 0.0 so both print and hash the same
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sign {
    Neg,
    Pos,
}

impl Sign {
    /// Zero counts as positive.
    pub fn of(value: Number) -> Self {
        if value >= 0.0 {
            Self::Pos
        } else {
            Self::Neg
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Self::Neg => '-',
            Self::Pos => '+',
        }
    }
}

impl Mul for Sign {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        if self == rhs {
            Self::Pos
        } else {
            Self::Neg
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointTyp {
    Zero,
    Pole,
}

impl PointTyp {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Pole => "pole",
        }
    }
}

impl fmt::Display for PointTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dedup key of a critical point: its type plus its value scaled to integer
/// millionths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointKey {
    pub typ: PointTyp,
    micros: i64,
}

impl PointKey {
    pub fn new(typ: PointTyp, value: Number) -> Self {
        Self {
            typ,
            micros: (round_key(value) * KEY_SCALE).round() as i64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CriticalPoint {
    pub value: Number,
    pub typ: PointTyp,
    pub multiplicity: u32,
    /// Found by the numeric scan rather than by factor parsing.
    pub numeric: bool,
}

impl CriticalPoint {
    pub const fn zero(value: Number, multiplicity: u32) -> Self {
        Self {
            value,
            typ: PointTyp::Zero,
            multiplicity,
            numeric: false,
        }
    }

    pub const fn pole(value: Number, multiplicity: u32) -> Self {
        Self {
            value,
            typ: PointTyp::Pole,
            multiplicity,
            numeric: false,
        }
    }

    pub fn key(&self) -> PointKey {
        PointKey::new(self.typ, self.value)
    }
}

impl fmt::Display for CriticalPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.typ, round_key(self.value))?;
        if self.multiplicity != 1 {
            write!(f, " (multiplicity {})", self.multiplicity)?;
        }
        if self.numeric {
            write!(f, " [numeric]")?;
        }
        Ok(())
    }
}

/// Always finite with `max > min`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    pub min: Number,
    pub max: Number,
}

impl Domain {
    pub const DEFAULT: Domain = Domain {
        min: -5.0,
        max: 5.0,
    };

    pub fn span(&self) -> Number {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }

    pub fn contains(&self, value: Number) -> bool {
        self.min < value && value < self.max
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", round_key(self.min), round_key(self.max))
    }
}

/// User supplied bounds. A missing bound falls back to the auto domain.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DomainOverride {
    pub min: Option<Number>,
    pub max: Option<Number>,
}

impl DomainOverride {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

impl fmt::Display for DomainOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |bound: Option<Number>| match bound {
            Some(val) => val.to_string(),
            None => String::from("auto"),
        };
        write!(f, "[{}, {}]", show(self.min), show(self.max))
    }
}
