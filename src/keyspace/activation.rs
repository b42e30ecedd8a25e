//! Sparse activation vectors over feature bindings and chunk identities.
//!
//! Absent keys carry weight 0 under every operation. Every stored weight is
//! finite: operations that would introduce NaN or ±Inf fail with
//! [`RecallError::InvalidActivation`] instead of coercing to zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};
use crate::keyspace::family::Atom;

/// A dimension → value binding, written `dim ** val`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Feature {
    pub dim: Atom,
    pub val: Atom,
}

impl Feature {
    pub fn new(dim: Atom, val: Atom) -> Self {
        Self { dim, val }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ** {}", self.dim, self.val)
    }
}

/// Address of one activation entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Feature(Feature),
    Chunk(String),
}

impl Key {
    pub fn chunk(name: &str) -> Self {
        Key::Chunk(name.to_string())
    }

    pub fn feature(dim: &Atom, val: &Atom) -> Self {
        Key::Feature(Feature::new(dim.clone(), val.clone()))
    }

    pub fn as_chunk(&self) -> Option<&str> {
        match self {
            Key::Chunk(name) => Some(name),
            Key::Feature(_) => None,
        }
    }

    pub fn as_feature(&self) -> Option<&Feature> {
        match self {
            Key::Feature(feature) => Some(feature),
            Key::Chunk(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Feature(feature) => write!(f, "{}", feature),
            Key::Chunk(name) => write!(f, "chunk:{}", name),
        }
    }
}

/// Elementwise combination applied across several vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Combine {
    #[default]
    Sum,
    Max,
}

/// Sparse key → weight mapping.
#[derive(Clone, Debug, Default)]
pub struct ActivationVector {
    weights: BTreeMap<Key, f64>,
}

impl ActivationVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Key, f64)>,
    {
        let mut v = Self::new();
        for (key, weight) in pairs {
            v.accumulate(key, weight)?;
        }
        Ok(v)
    }

    /// `{chunk_name: weight}` shorthand used for chunk cues.
    pub fn from_chunks<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self::from_pairs(pairs.into_iter().map(|(name, w)| (Key::chunk(name), w)))
    }

    pub fn single(key: Key, weight: f64) -> Result<Self> {
        Self::from_pairs([(key, weight)])
    }

    /// Weight at `key`, 0 when absent.
    pub fn get(&self, key: &Key) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    pub fn get_chunk(&self, name: &str) -> f64 {
        self.get(&Key::chunk(name))
    }

    pub fn set(&mut self, key: Key, weight: f64) -> Result<()> {
        ensure_finite(&key, weight)?;
        self.weights.insert(key, weight);
        Ok(())
    }

    /// Add `weight` onto the entry at `key`.
    pub fn accumulate(&mut self, key: Key, weight: f64) -> Result<()> {
        let next = self.get(&key) + weight;
        self.set(key, next)
    }

    pub fn remove(&mut self, key: &Key) -> Option<f64> {
        self.weights.remove(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.weights.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, f64)> {
        self.weights.iter().map(|(k, &w)| (k, w))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.weights.keys()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// True when every entry is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.weights.values().all(|&w| w == 0.0)
    }

    pub fn scale(&self, factor: f64) -> Result<Self> {
        let mut out = Self::new();
        for (key, w) in self.iter() {
            out.set(key.clone(), w * factor)?;
        }
        Ok(out)
    }

    pub fn add(&self, other: &ActivationVector) -> Result<Self> {
        let mut out = self.clone();
        for (key, w) in other.iter() {
            out.accumulate(key.clone(), w)?;
        }
        Ok(out)
    }

    /// Elementwise negation. Finite weights stay finite, so this never fails.
    pub fn negate(&self) -> Self {
        Self {
            weights: self.weights.iter().map(|(k, &w)| (k.clone(), -w)).collect(),
        }
    }

    /// Sum of any number of vectors; the empty sum is the zero vector.
    pub fn sum<'a, I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ActivationVector>,
    {
        let mut out = Self::new();
        for v in vectors {
            for (key, w) in v.iter() {
                out.accumulate(key.clone(), w)?;
            }
        }
        Ok(out)
    }

    /// Elementwise maximum over the union of keys, absent keys counting as 0.
    pub fn max<'a, I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ActivationVector>,
    {
        let vectors: Vec<&ActivationVector> = vectors.into_iter().collect();
        let mut out = Self::new();
        for v in &vectors {
            for key in v.keys() {
                if out.contains(key) {
                    continue;
                }
                let best = vectors
                    .iter()
                    .map(|u| u.get(key))
                    .fold(f64::NEG_INFINITY, f64::max);
                out.set(key.clone(), best)?;
            }
        }
        Ok(out)
    }

    pub fn combine<'a, I>(vectors: I, op: Combine) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ActivationVector>,
    {
        match op {
            Combine::Sum => Self::sum(vectors),
            Combine::Max => Self::max(vectors),
        }
    }

    /// Keep only entries whose key satisfies `keep`.
    pub fn restrict<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Key) -> bool,
    {
        Self {
            weights: self
                .weights
                .iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, &w)| (k.clone(), w))
                .collect(),
        }
    }

    /// Chunk entries only.
    pub fn chunks(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter().filter_map(|(k, w)| k.as_chunk().map(|name| (name, w)))
    }

    /// Highest-weighted entry; the first in key order wins ties.
    pub fn strongest(&self) -> Option<(&Key, f64)> {
        let mut best: Option<(&Key, f64)> = None;
        for (key, w) in self.iter() {
            match best {
                Some((_, bw)) if w <= bw => {}
                _ => best = Some((key, w)),
            }
        }
        best
    }
}

impl PartialEq for ActivationVector {
    /// Equal when every key in either vector carries the same weight,
    /// so an explicit zero equals an absent key.
    fn eq(&self, other: &Self) -> bool {
        self.keys()
            .chain(other.keys())
            .all(|k| self.get(k) == other.get(k))
    }
}

impl fmt::Display for ActivationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, w)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.4}", key, w)?;
        }
        write!(f, "}}")
    }
}

fn ensure_finite(key: &Key, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RecallError::InvalidActivation {
            key: key.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::family::{Dimension, Family, KeySpace};

    fn ks() -> KeySpace {
        KeySpace::new(
            Family::new("m")
                .with_dimension(Dimension::digits("number"))
                .with_dimension(Dimension::new("value", ["value"])),
        )
        .unwrap()
    }

    fn digit(ks: &KeySpace, d: u8) -> Key {
        Key::feature(
            &ks.resolve("value.value").unwrap(),
            &ks.resolve(&format!("number._{}", d)).unwrap(),
        )
    }

    #[test]
    fn test_absent_key_is_zero() {
        let v = ActivationVector::new();
        assert_eq!(v.get(&Key::chunk("missing")), 0.0);
        assert!(v.is_zero());
    }

    #[test]
    fn test_scale_and_add() {
        let ks = ks();
        let a = ActivationVector::from_pairs([(digit(&ks, 1), 1.0), (digit(&ks, 2), 2.0)]).unwrap();
        let b = ActivationVector::single(digit(&ks, 2), 0.5).unwrap();
        let c = a.scale(2.0).unwrap().add(&b).unwrap();
        assert_eq!(c.get(&digit(&ks, 1)), 2.0);
        assert_eq!(c.get(&digit(&ks, 2)), 4.5);
    }

    #[test]
    fn test_negate_twice_is_identity() {
        let v = ActivationVector::from_chunks([("a", 1.5), ("b", -0.25)]).unwrap();
        assert_eq!(v.negate().negate(), v);
        assert_eq!(v.negate().get_chunk("a"), -1.5);
    }

    #[test]
    fn test_explicit_zero_equals_absent() {
        let a = ActivationVector::from_chunks([("a", 0.0)]).unwrap();
        assert_eq!(a, ActivationVector::new());
    }

    #[test]
    fn test_nan_rejected() {
        let err = ActivationVector::from_chunks([("a", f64::NAN)]).unwrap_err();
        assert!(matches!(err, RecallError::InvalidActivation { .. }));
    }

    #[test]
    fn test_overflow_rejected() {
        let v = ActivationVector::from_chunks([("a", f64::MAX)]).unwrap();
        assert!(v.add(&v).is_err());
        assert!(v.scale(f64::INFINITY).is_err());
    }

    #[test]
    fn test_max_combine_counts_absent_as_zero() {
        let a = ActivationVector::from_chunks([("a", -1.0), ("b", 2.0)]).unwrap();
        let b = ActivationVector::from_chunks([("b", 3.0)]).unwrap();
        let m = ActivationVector::combine([&a, &b], Combine::Max).unwrap();
        assert_eq!(m.get_chunk("a"), 0.0);
        assert_eq!(m.get_chunk("b"), 3.0);
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let s = ActivationVector::sum(std::iter::empty()).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_strongest_prefers_first_on_tie() {
        let v = ActivationVector::from_chunks([("b", 1.0), ("a", 1.0), ("c", 0.5)]).unwrap();
        let (key, w) = v.strongest().unwrap();
        assert_eq!(key, &Key::chunk("a"));
        assert_eq!(w, 1.0);
    }

    #[test]
    fn test_feature_display() {
        let ks = ks();
        assert_eq!(digit(&ks, 7).to_string(), "value.value ** number._7");
    }
}
