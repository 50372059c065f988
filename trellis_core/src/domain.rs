// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed, growable domain accumulators.
//!
//! A channel's scale must cover every value the contributing views encode.
//! Each [`DomainArray`] accumulates those values with semantics that depend on
//! the data type: quantitative domains track a `[min, max]` interval, ordinal
//! and nominal domains collect unique values in first-seen order, and
//! piecewise domains are immutable multi-stop sequences (e.g. a diverging
//! midpoint).
//!
//! Domains of different types never merge; attempting to do so is an error
//! rather than a silent coercion.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashSet;

/// A scalar data value that can participate in a domain.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// A numeric value.
    Number(f64),
    /// A string value.
    String(String),
    /// A boolean value.
    Boolean(bool),
}

impl Scalar {
    /// Returns the numeric value, if this scalar is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// A hashable key for first-seen-order deduplication.
    fn key(&self) -> ScalarKey {
        match self {
            Self::Number(n) => ScalarKey::Number(n.to_bits()),
            Self::String(s) => ScalarKey::String(s.clone()),
            Self::Boolean(b) => ScalarKey::Boolean(*b),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(String::from(value))
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ScalarKey {
    Number(u64),
    String(String),
    Boolean(bool),
}

/// The data type of a channel's domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomainType {
    /// A continuous numeric interval.
    Quantitative,
    /// Ordered discrete values.
    Ordinal,
    /// Unordered discrete values (categories).
    Nominal,
    /// An immutable multi-stop numeric domain.
    Piecewise,
}

impl DomainType {
    /// The spec-facing name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quantitative => "quantitative",
            Self::Ordinal => "ordinal",
            Self::Nominal => "nominal",
            Self::Piecewise => "piecewise",
        }
    }
}

/// Errors raised by domain construction and merging.
#[derive(Clone, Debug, PartialEq)]
pub enum DomainError {
    /// Two domains of different types were merged.
    TypeMismatch {
        /// The type of the receiving domain.
        expected: DomainType,
        /// The type of the incoming domain.
        actual: DomainType,
    },
    /// A piecewise domain's stops were not strictly monotonic.
    NotMonotonic(Vec<f64>),
    /// A piecewise domain was extended with a value it does not contain.
    PiecewiseImmutable,
}

impl core::fmt::Display for DomainError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TypeMismatch { expected, actual } => write!(
                f,
                "cannot combine different types of domains: {} and {}",
                expected.as_str(),
                actual.as_str()
            ),
            Self::NotMonotonic(stops) => write!(
                f,
                "piecewise domain must be strictly increasing or decreasing: {stops:?}"
            ),
            Self::PiecewiseImmutable => {
                write!(f, "piecewise domains are immutable and cannot be unioned")
            }
        }
    }
}

impl core::error::Error for DomainError {}

/// A typed, growable ordered sequence of domain values.
#[derive(Clone, Debug)]
pub enum DomainArray {
    /// A `[min, max]` interval, empty until the first finite value arrives.
    Quantitative(Option<(f64, f64)>),
    /// Unique values in first-seen order.
    Ordinal(DiscreteDomain),
    /// Unique values in first-seen order, without intrinsic order semantics.
    Nominal(DiscreteDomain),
    /// An immutable sequence of strictly monotonic numeric stops.
    Piecewise(Vec<f64>),
}

/// The backing store for ordinal/nominal domains.
#[derive(Clone, Debug, Default)]
pub struct DiscreteDomain {
    values: Vec<Scalar>,
    seen: HashSet<ScalarKey>,
}

impl DiscreteDomain {
    fn extend(&mut self, value: Scalar) {
        let key = value.key();
        if self.seen.insert(key) {
            self.values.push(value);
        }
    }

    /// The collected values in first-seen order.
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }
}

/// Creates an empty domain accumulator of the given type.
///
/// Piecewise domains cannot be created empty; use
/// [`DomainArray::piecewise`] with explicit stops instead.
pub fn create_domain(ty: DomainType) -> DomainArray {
    match ty {
        DomainType::Quantitative => DomainArray::Quantitative(None),
        DomainType::Ordinal => DomainArray::Ordinal(DiscreteDomain::default()),
        DomainType::Nominal => DomainArray::Nominal(DiscreteDomain::default()),
        DomainType::Piecewise => DomainArray::Piecewise(Vec::new()),
    }
}

impl DomainArray {
    /// Creates a piecewise domain from its stops.
    ///
    /// Every successive pair must have the same sign of difference; anything
    /// else (including repeated values) is rejected.
    pub fn piecewise(stops: Vec<f64>) -> Result<Self, DomainError> {
        let mut sum = 0.0_f64;
        for pair in stops.windows(2) {
            // f64::signum maps 0.0 to 1.0, which would let repeated stops
            // through; a zero (or NaN) step must contribute nothing.
            sum += match pair[1] - pair[0] {
                step if step > 0.0 => 1.0,
                step if step < 0.0 => -1.0,
                _ => 0.0,
            };
        }
        // Strict monotonicity: all steps share one sign and none is zero.
        if stops.len() > 1 && sum.abs() != (stops.len() - 1) as f64 {
            return Err(DomainError::NotMonotonic(stops));
        }
        Ok(Self::Piecewise(stops))
    }

    /// The type tag of this domain.
    pub fn domain_type(&self) -> DomainType {
        match self {
            Self::Quantitative(_) => DomainType::Quantitative,
            Self::Ordinal(_) => DomainType::Ordinal,
            Self::Nominal(_) => DomainType::Nominal,
            Self::Piecewise(_) => DomainType::Piecewise,
        }
    }

    /// Returns true if no values have been accumulated yet.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Quantitative(interval) => interval.is_none(),
            Self::Ordinal(d) | Self::Nominal(d) => d.values.is_empty(),
            Self::Piecewise(stops) => stops.is_empty(),
        }
    }

    /// Extends the domain with a single value.
    ///
    /// Quantitative domains widen their interval and ignore non-finite
    /// values. Ordinal/nominal domains ignore duplicates. Piecewise domains
    /// only accept values they already contain.
    pub fn extend(&mut self, value: Scalar) -> Result<(), DomainError> {
        match self {
            Self::Quantitative(interval) => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                if !n.is_finite() {
                    return Ok(());
                }
                *interval = Some(match *interval {
                    Some((min, max)) => (min.min(n), max.max(n)),
                    None => (n, n),
                });
                Ok(())
            }
            Self::Ordinal(domain) | Self::Nominal(domain) => {
                if let Scalar::Number(n) = &value
                    && n.is_nan()
                {
                    return Ok(());
                }
                domain.extend(value);
                Ok(())
            }
            Self::Piecewise(stops) => {
                if value.as_f64().is_some_and(|n| stops.contains(&n)) {
                    Ok(())
                } else {
                    Err(DomainError::PiecewiseImmutable)
                }
            }
        }
    }

    /// Extends the domain with an optional value, skipping `None`.
    pub fn extend_opt(&mut self, value: Option<Scalar>) -> Result<(), DomainError> {
        match value {
            Some(value) => self.extend(value),
            None => Ok(()),
        }
    }

    /// Extends the domain with a sequence of optional values.
    ///
    /// Missing values are skipped, matching [`DomainArray::extend_opt`].
    pub fn extend_values<I>(&mut self, values: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = Option<Scalar>>,
    {
        for value in values {
            self.extend_opt(value)?;
        }
        Ok(())
    }

    /// Merges another domain of the same type into this one.
    pub fn extend_all(&mut self, other: &Self) -> Result<(), DomainError> {
        if other.domain_type() != self.domain_type() {
            return Err(DomainError::TypeMismatch {
                expected: self.domain_type(),
                actual: other.domain_type(),
            });
        }
        for value in other.iter() {
            self.extend(value)?;
        }
        Ok(())
    }

    /// Iterates the accumulated values in order.
    ///
    /// A quantitative domain yields its `[min, max]` pair.
    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        let values: Vec<Scalar> = match self {
            Self::Quantitative(None) => Vec::new(),
            Self::Quantitative(Some((min, max))) => {
                alloc::vec![Scalar::Number(*min), Scalar::Number(*max)]
            }
            Self::Ordinal(d) | Self::Nominal(d) => d.values.clone(),
            Self::Piecewise(stops) => stops.iter().map(|&s| Scalar::Number(s)).collect(),
        };
        values.into_iter()
    }

    /// The number of values in the domain (2 for a non-empty interval).
    pub fn len(&self) -> usize {
        match self {
            Self::Quantitative(None) => 0,
            Self::Quantitative(Some(_)) => 2,
            Self::Ordinal(d) | Self::Nominal(d) => d.values.len(),
            Self::Piecewise(stops) => stops.len(),
        }
    }

    /// The `[min, max]` interval of a quantitative domain, if any.
    pub fn interval(&self) -> Option<(f64, f64)> {
        match self {
            Self::Quantitative(interval) => *interval,
            Self::Piecewise(stops) => match (stops.first(), stops.last()) {
                (Some(&a), Some(&b)) => Some((a.min(b), a.max(b))),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    #[test]
    fn quantitative_tracks_min_and_max() {
        let mut d = create_domain(DomainType::Quantitative);
        for v in [2.0, 1.0, f64::NAN, 5.0, 4.0] {
            d.extend(Scalar::Number(v)).unwrap();
        }
        d.extend_opt(None).unwrap();
        assert_eq!(d.interval(), Some((1.0, 5.0)));
    }

    #[test]
    fn extend_values_skips_missing_entries() {
        let mut d = create_domain(DomainType::Quantitative);
        d.extend_values([
            Some(Scalar::Number(2.0)),
            Some(Scalar::Number(1.0)),
            None,
            None,
            Some(Scalar::Number(5.0)),
            Some(Scalar::Number(4.0)),
        ])
        .unwrap();
        assert_eq!(d.interval(), Some((1.0, 5.0)));
    }

    #[test]
    fn quantitative_stays_empty_without_finite_input() {
        let mut d = create_domain(DomainType::Quantitative);
        d.extend(Scalar::Number(f64::NAN)).unwrap();
        d.extend(Scalar::Number(f64::INFINITY)).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.interval(), None);
    }

    #[test]
    fn ordinal_preserves_first_seen_order() {
        let mut d = create_domain(DomainType::Ordinal);
        for v in ["a", "b", "c", "b", "d"] {
            d.extend(Scalar::from(v)).unwrap();
        }
        let values: Vec<Scalar> = d.iter().collect();
        assert_eq!(
            values,
            vec![
                Scalar::from("a"),
                Scalar::from("b"),
                Scalar::from("c"),
                Scalar::from("d")
            ]
        );
    }

    #[test]
    fn cross_type_merge_is_an_error() {
        let mut q = create_domain(DomainType::Quantitative);
        let n = create_domain(DomainType::Nominal);
        assert_eq!(
            q.extend_all(&n),
            Err(DomainError::TypeMismatch {
                expected: DomainType::Quantitative,
                actual: DomainType::Nominal,
            })
        );
    }

    #[test]
    fn same_type_merge_unions_intervals() {
        let mut a = create_domain(DomainType::Quantitative);
        a.extend(Scalar::Number(1.0)).unwrap();
        a.extend(Scalar::Number(2.0)).unwrap();

        let mut b = create_domain(DomainType::Quantitative);
        b.extend(Scalar::Number(4.0)).unwrap();
        b.extend(Scalar::Number(5.0)).unwrap();

        a.extend_all(&b).unwrap();
        assert_eq!(a.interval(), Some((1.0, 5.0)));
    }

    #[test]
    fn piecewise_requires_strict_monotonicity() {
        assert!(DomainArray::piecewise(vec![-1.0, 0.0, 1.0]).is_ok());
        assert!(DomainArray::piecewise(vec![3.0, 2.0, 1.0]).is_ok());
        assert!(matches!(
            DomainArray::piecewise(vec![2.0, 1.0, 3.0]),
            Err(DomainError::NotMonotonic(_))
        ));
        assert!(matches!(
            DomainArray::piecewise(vec![1.0, 2.0, 2.0, 3.0]),
            Err(DomainError::NotMonotonic(_))
        ));
        assert!(matches!(
            DomainArray::piecewise(vec![2.0, 2.0]),
            Err(DomainError::NotMonotonic(_))
        ));
    }

    #[test]
    fn piecewise_rejects_new_values() {
        let mut d = DomainArray::piecewise(vec![-1.0, 0.0, 1.0]).unwrap();
        assert_eq!(d.extend(Scalar::Number(0.0)), Ok(()));
        assert_eq!(
            d.extend(Scalar::Number(0.5)),
            Err(DomainError::PiecewiseImmutable)
        );
    }
}
