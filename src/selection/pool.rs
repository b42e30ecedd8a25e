//! Evidence pool: combines named activation sources into one vector.
//!
//! Each source is a vector plus a per-source [`Transform`]; the pool output
//! is the configured [`Combine`] over the evidence sources, minus every
//! [`Transform::Negate`] source. Subtraction happens after combination so
//! inhibition lowers the aggregate under `Max` as well as `Sum`. Sources are
//! replaced wholesale by name, so a reader never sees a half-updated source.

use crate::error::Result;
use crate::keyspace::{ActivationVector, Combine};

/// Per-source transform applied before combination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transform {
    Identity,
    /// Used for inhibition: the source is subtracted after the other
    /// sources are combined.
    Negate,
    Scale(f64),
}

impl Transform {
    pub fn apply(&self, v: &ActivationVector) -> Result<ActivationVector> {
        match *self {
            Transform::Identity => Ok(v.clone()),
            Transform::Negate => Ok(v.negate()),
            Transform::Scale(factor) => v.scale(factor),
        }
    }
}

#[derive(Clone, Debug)]
struct Source {
    vector: ActivationVector,
    transform: Transform,
}

#[derive(Clone, Debug, Default)]
pub struct Pool {
    /// Sources in first-registration order.
    sources: Vec<(String, Source)>,
    combine: Combine,
}

impl Pool {
    pub fn new(combine: Combine) -> Self {
        Self {
            sources: Vec::new(),
            combine,
        }
    }

    /// Add or replace the source `name`.
    pub fn set_source(&mut self, name: &str, vector: ActivationVector, transform: Transform) {
        let source = Source { vector, transform };
        match self.sources.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = source,
            None => self.sources.push((name.to_string(), source)),
        }
    }

    pub fn remove_source(&mut self, name: &str) -> Option<ActivationVector> {
        let pos = self.sources.iter().position(|(n, _)| n == name)?;
        Some(self.sources.remove(pos).1.vector)
    }

    /// Raw (untransformed) vector of a source.
    pub fn source(&self, name: &str) -> Option<&ActivationVector> {
        self.sources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| &s.vector)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(n, _)| n.as_str())
    }

    pub fn combine(&self) -> Combine {
        self.combine
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    /// Combination of the evidence sources, minus the negated sources.
    pub fn aggregate(&self) -> Result<ActivationVector> {
        let evidence = self
            .sources
            .iter()
            .filter(|(_, s)| s.transform != Transform::Negate)
            .map(|(_, s)| s.transform.apply(&s.vector))
            .collect::<Result<Vec<_>>>()?;
        let mut out = ActivationVector::combine(evidence.iter(), self.combine)?;
        for (_, s) in self.sources.iter().filter(|(_, s)| s.transform == Transform::Negate) {
            out = out.add(&s.vector.negate())?;
        }
        Ok(out)
    }
}
