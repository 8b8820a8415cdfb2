use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use lasso::{Rodeo, Spur};

use crate::error::ELError;

/// A rational number, always normalized: gcd(num, den) == 1, den > 0.
/// `ELValue::rat` collapses a denominator of 1 down to `Int`, so a stored
/// `Rat` always has den > 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i64,
    den: i64,
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    if a == 0 { 1 } else { a }
}

impl Rational {
    pub fn new(num: i64, den: i64) -> Result<Rational, ELError> {
        Rational::make(num as i128, den as i128)
    }

    fn make(num: i128, den: i128) -> Result<Rational, ELError> {
        if den == 0 {
            return Err(ELError::consistency("division by zero"));
        }
        let negative = (num < 0) != (den < 0);
        let (mut n, mut d) = (num.unsigned_abs(), den.unsigned_abs());
        let g = gcd(n, d);
        n /= g;
        d /= g;
        let mut n = i64::try_from(n).map_err(|_| ELError::consistency("rational overflow"))?;
        let d = i64::try_from(d).map_err(|_| ELError::consistency("rational overflow"))?;
        if negative {
            n = -n;
        }
        Ok(Rational { num: n, den: d })
    }

    pub fn num(&self) -> i64 {
        self.num
    }

    pub fn den(&self) -> i64 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn add(&self, other: &Rational) -> Result<Rational, ELError> {
        Rational::make(
            self.num as i128 * other.den as i128 + other.num as i128 * self.den as i128,
            self.den as i128 * other.den as i128,
        )
    }

    pub fn sub(&self, other: &Rational) -> Result<Rational, ELError> {
        Rational::make(
            self.num as i128 * other.den as i128 - other.num as i128 * self.den as i128,
            self.den as i128 * other.den as i128,
        )
    }

    pub fn mul(&self, other: &Rational) -> Result<Rational, ELError> {
        Rational::make(
            self.num as i128 * other.num as i128,
            self.den as i128 * other.den as i128,
        )
    }

    pub fn div(&self, other: &Rational) -> Result<Rational, ELError> {
        Rational::make(
            self.num as i128 * other.den as i128,
            self.den as i128 * other.num as i128,
        )
    }

    /// Floored remainder, matching the reference semantics for `%`.
    pub fn rem(&self, other: &Rational) -> Result<Rational, ELError> {
        let q = self.div(other)?;
        let floor = q.floor();
        let prod = other.mul(&Rational { num: floor, den: 1 })?;
        self.sub(&prod)
    }

    pub fn pow(&self, exp: i64) -> Result<Rational, ELError> {
        let e = u32::try_from(exp.unsigned_abs())
            .map_err(|_| ELError::consistency("exponent out of range"))?;
        let n = (self.num as i128)
            .checked_pow(e)
            .ok_or_else(|| ELError::consistency("rational overflow"))?;
        let d = (self.den as i128)
            .checked_pow(e)
            .ok_or_else(|| ELError::consistency("rational overflow"))?;
        if exp < 0 {
            Rational::make(d, n)
        } else {
            Rational::make(n, d)
        }
    }

    fn floor(&self) -> i64 {
        let q = self.num / self.den;
        if self.num % self.den != 0 && self.num < 0 {
            q - 1
        } else {
            q
        }
    }

    fn cmp_rat(&self, other: &Rational) -> Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

/// An atomic EL value. Leaf and intermediate trie values, list elements,
/// comparison and arithmetic operands.
#[derive(Debug, Clone)]
pub enum ELValue {
    Sym(Spur),
    Str(Spur),
    Int(i64),
    Rat(Rational),
    Float(f64),
    List(Vec<ELValue>),
}

impl PartialEq for ELValue {
    fn eq(&self, other: &Self) -> bool {
        use ELValue::*;
        match (self, other) {
            (Sym(a), Sym(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Rat(a), Rat(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (List(a), List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ELValue {}

impl Hash for ELValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use ELValue::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Sym(s) | Str(s) => s.hash(state),
            Int(i) => i.hash(state),
            Rat(r) => r.hash(state),
            Float(f) => f.to_bits().hash(state),
            List(items) => items.hash(state),
        }
    }
}

impl ELValue {
    /// Rational constructor that collapses whole results to `Int`.
    pub fn rat(num: i64, den: i64) -> Result<ELValue, ELError> {
        let r = Rational::new(num, den)?;
        if r.den == 1 {
            Ok(ELValue::Int(r.num))
        } else {
            Ok(ELValue::Rat(r))
        }
    }

    pub fn from_rational(r: Rational) -> ELValue {
        if r.den == 1 {
            ELValue::Int(r.num)
        } else {
            ELValue::Rat(r)
        }
    }

    pub fn sym(rodeo: &mut Rodeo, name: &str) -> ELValue {
        ELValue::Sym(rodeo.get_or_intern(name))
    }

    pub fn string(rodeo: &mut Rodeo, text: &str) -> ELValue {
        ELValue::Str(rodeo.get_or_intern(text))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ELValue::Int(_) | ELValue::Rat(_) | ELValue::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ELValue::Int(i) => Some(*i as f64),
            ELValue::Rat(r) => Some(r.as_f64()),
            ELValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric ordering across the int/rational/float variants.
    /// `None` when either side is not a number.
    pub fn num_cmp(&self, other: &ELValue) -> Option<Ordering> {
        use ELValue::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Rat(a), Rat(b)) => Some(a.cmp_rat(b)),
            (Int(a), Rat(b)) => Some(Rational { num: *a, den: 1 }.cmp_rat(b)),
            (Rat(a), Int(b)) => Some(a.cmp_rat(&Rational { num: *b, den: 1 })),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64().unwrap().partial_cmp(&b.as_f64().unwrap())
            }
            _ => None,
        }
    }

    /// Surface rendering: floats print with `d` in place of the decimal
    /// point (`1.5` -> `1d5`), strings keep their quotes.
    pub fn render(&self, rodeo: &Rodeo) -> String {
        match self {
            ELValue::Sym(s) => rodeo.resolve(s).to_string(),
            ELValue::Str(s) => format!("\"{}\"", rodeo.resolve(s)),
            ELValue::Int(i) => i.to_string(),
            ELValue::Rat(r) => format!("{}/{}", r.num, r.den),
            ELValue::Float(f) => {
                let s = f.to_string();
                if s.contains('.') {
                    s.replace('.', "d")
                } else {
                    format!("{s}d0")
                }
            }
            ELValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.render(rodeo)).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }

    /// Rendering for output interpolation: strings lose their quotes.
    pub fn bare_text(&self, rodeo: &Rodeo) -> String {
        match self {
            ELValue::Str(s) => rodeo.resolve(s).to_string(),
            other => other.render(rodeo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_normalizes() {
        let r = Rational::new(4, 6).unwrap();
        assert_eq!((r.num(), r.den()), (2, 3));
        let r = Rational::new(2, -4).unwrap();
        assert_eq!((r.num(), r.den()), (-1, 2));
    }

    #[test]
    fn whole_rational_collapses_to_int() {
        assert_eq!(ELValue::rat(4, 2).unwrap(), ELValue::Int(2));
        assert_eq!(ELValue::rat(0, 5).unwrap(), ELValue::Int(0));
        assert!(matches!(ELValue::rat(1, 5).unwrap(), ELValue::Rat(_)));
    }

    #[test]
    fn zero_denominator_is_an_error() {
        assert!(Rational::new(1, 0).is_err());
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(ELValue::Float(1.5), ELValue::Float(1.5));
        assert_ne!(ELValue::Float(1.5), ELValue::Float(1.25));
        assert_ne!(ELValue::Float(2.0), ELValue::Int(2));
    }

    #[test]
    fn numeric_ordering_crosses_variants() {
        let half = ELValue::rat(1, 2).unwrap();
        assert_eq!(half.num_cmp(&ELValue::Int(1)), Some(Ordering::Less));
        assert_eq!(ELValue::Int(2).num_cmp(&ELValue::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(
            ELValue::rat(2, 4).unwrap().num_cmp(&ELValue::rat(1, 2).unwrap()),
            Some(Ordering::Equal)
        );
        let mut rodeo = Rodeo::new();
        let s = ELValue::sym(&mut rodeo, "blah");
        assert_eq!(s.num_cmp(&ELValue::Int(1)), None);
    }

    #[test]
    fn rendering_uses_surface_forms() {
        let mut rodeo = Rodeo::new();
        assert_eq!(ELValue::Float(1.5).render(&rodeo), "1d5");
        assert_eq!(ELValue::Float(2.0).render(&rodeo), "2d0");
        assert_eq!(ELValue::rat(1, 5).unwrap().render(&rodeo), "1/5");
        let s = ELValue::string(&mut rodeo, "hi");
        assert_eq!(s.render(&rodeo), "\"hi\"");
        assert_eq!(s.bare_text(&rodeo), "hi");
    }

    #[test]
    fn floored_remainder() {
        let a = Rational::new(7, 2).unwrap();
        let b = Rational::new(1, 1).unwrap();
        assert_eq!(a.rem(&b).unwrap(), Rational::new(1, 2).unwrap());
    }
}
