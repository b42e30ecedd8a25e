//! Chunks: named, immutable bundles of weighted bindings.
//!
//! A chunk's vector is Σ coefficient · binding, where a binding is either a
//! `dim ** val` feature or a reference to another chunk. References are
//! lookup keys (`Key::Chunk(name)`), never owned copies, so many chunks can
//! share one sub-chunk. Each chunk carries its lineage (every chunk name it
//! reaches through references) which lets construction reject cycles before
//! the chunk ever reaches a store.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::config::NIL_CHUNK;
use crate::error::{RecallError, Result};
use crate::keyspace::{ActivationVector, Atom, Feature, Key};

/// Identity is the name: two chunks are the same entity iff their names match.
#[derive(Clone, Debug)]
pub struct Chunk {
    name: String,
    vector: ActivationVector,
    lineage: BTreeSet<String>,
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Chunk {}

impl Hash for Chunk {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Chunk {
    /// The sentinel denoting "no winner".
    pub fn nil() -> Self {
        Self {
            name: NIL_CHUNK.to_string(),
            vector: ActivationVector::new(),
            lineage: BTreeSet::new(),
        }
    }

    pub fn builder(name: &str) -> ChunkBuilder {
        ChunkBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> Key {
        Key::chunk(&self.name)
    }

    /// Direct bindings as declared.
    pub fn vector(&self) -> &ActivationVector {
        &self.vector
    }

    pub fn is_nil(&self) -> bool {
        self.name == NIL_CHUNK
    }

    /// Names of directly referenced chunks.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.vector.keys().filter_map(Key::as_chunk)
    }

    /// Direct feature bindings with their coefficients.
    pub fn features(&self) -> impl Iterator<Item = (&Feature, f64)> {
        self.vector
            .iter()
            .filter_map(|(k, w)| k.as_feature().map(|f| (f, w)))
    }

    /// Every chunk name reachable through references.
    pub fn lineage(&self) -> &BTreeSet<String> {
        &self.lineage
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for (key, w) in self.vector.iter() {
            write!(f, "\n    {:+.3} {}", w, key)?;
        }
        Ok(())
    }
}

/// One `(coefficient, target)` term of a chunk definition.
#[derive(Clone, Debug)]
pub enum Term {
    Chunk {
        name: String,
        lineage: BTreeSet<String>,
    },
    Feature(Feature),
}

/// Compositional chunk construction.
#[derive(Clone, Debug)]
pub struct ChunkBuilder {
    name: String,
    terms: Vec<(f64, Term)>,
}

impl ChunkBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            terms: Vec::new(),
        }
    }

    /// Bind to another chunk with weight `coefficient`.
    pub fn chunk(mut self, coefficient: f64, target: &Chunk) -> Self {
        self.terms.push((
            coefficient,
            Term::Chunk {
                name: target.name.clone(),
                lineage: target.lineage.clone(),
            },
        ));
        self
    }

    /// Bind `dim ** val` with weight `coefficient`.
    pub fn feature(mut self, coefficient: f64, dim: &Atom, val: &Atom) -> Self {
        self.terms
            .push((coefficient, Term::Feature(Feature::new(dim.clone(), val.clone()))));
        self
    }

    pub fn term(mut self, coefficient: f64, term: Term) -> Self {
        self.terms.push((coefficient, term));
        self
    }

    pub fn build(self) -> Result<Chunk> {
        if self.name.is_empty() {
            return Err(RecallError::InvalidChunk("chunk name must not be empty".into()));
        }
        if self.name == NIL_CHUNK {
            return Err(RecallError::InvalidChunk(format!(
                "{:?} is reserved for the empty selection",
                NIL_CHUNK
            )));
        }

        let mut vector = ActivationVector::new();
        let mut lineage = BTreeSet::new();
        for (coefficient, term) in self.terms {
            match term {
                Term::Chunk { name, lineage: inherited } => {
                    if name == self.name {
                        return Err(RecallError::CyclicChunkDefinition(format!(
                            "{} -> {}",
                            self.name, name
                        )));
                    }
                    if name == NIL_CHUNK {
                        return Err(RecallError::InvalidChunk(format!(
                            "{} cannot reference the nil chunk",
                            self.name
                        )));
                    }
                    if inherited.contains(&self.name) {
                        return Err(RecallError::CyclicChunkDefinition(format!(
                            "{} -> {} -> .. -> {}",
                            self.name, name, self.name
                        )));
                    }
                    vector.accumulate(Key::Chunk(name.clone()), coefficient)?;
                    lineage.insert(name);
                    lineage.extend(inherited);
                }
                Term::Feature(feature) => {
                    vector.accumulate(Key::Feature(feature), coefficient)?;
                }
            }
        }

        Ok(Chunk {
            name: self.name,
            vector,
            lineage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyspace::{Dimension, Family, KeySpace};

    fn ks() -> KeySpace {
        KeySpace::new(
            Family::new("memory")
                .with_dimension(Dimension::digits("number"))
                .with_dimension(Dimension::new("list", ["list"]))
                .with_dimension(Dimension::new("group", ["group"])),
        )
        .unwrap()
    }

    fn list_chunk(ks: &KeySpace, name: &str) -> Chunk {
        Chunk::builder(name)
            .feature(1.0, &ks.resolve("list.list").unwrap(), &ks.resolve("number._0").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_weighted_sum_of_terms() {
        let ks = ks();
        let list = list_chunk(&ks, "list_0");
        let group = ks.resolve("group.group").unwrap();
        let one = ks.resolve("number._1").unwrap();
        let g = Chunk::builder("g_1")
            .chunk(1.3, &list)
            .feature(0.7, &group, &one)
            .build()
            .unwrap();

        assert_eq!(g.vector().get_chunk("list_0"), 1.3);
        assert_eq!(g.vector().get(&Key::feature(&group, &one)), 0.7);
        assert_eq!(g.references().collect::<Vec<_>>(), vec!["list_0"]);
        assert_eq!(g.features().count(), 1);
        assert!(g.lineage().contains("list_0"));
    }

    #[test]
    fn test_repeated_term_accumulates() {
        let ks = ks();
        let list = list_chunk(&ks, "list_0");
        let c = Chunk::builder("c")
            .chunk(0.5, &list)
            .chunk(0.25, &list)
            .build()
            .unwrap();
        assert_eq!(c.vector().get_chunk("list_0"), 0.75);
    }

    #[test]
    fn test_identity_is_by_name() {
        let ks = ks();
        let list = list_chunk(&ks, "list_0");
        let a = Chunk::builder("g_1").chunk(1.0, &list).build().unwrap();
        let b = Chunk::builder("g_1")
            .feature(0.4, &ks.resolve("group.group").unwrap(), &ks.resolve("number._2").unwrap())
            .build()
            .unwrap();
        let c = Chunk::builder("g_2").chunk(1.0, &list).build().unwrap();
        assert_ne!(a.vector(), b.vector());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Chunk::nil(), Chunk::nil());
    }

    #[test]
    fn test_shared_subchunk_lineage() {
        let ks = ks();
        let list = list_chunk(&ks, "list_0");
        let g1 = Chunk::builder("g_1").chunk(1.0, &list).build().unwrap();
        let g2 = Chunk::builder("g_2").chunk(1.0, &list).build().unwrap();
        let v = Chunk::builder("v").chunk(1.0, &g1).chunk(1.0, &g2).build().unwrap();
        let lineage: Vec<&str> = v.lineage().iter().map(String::as_str).collect();
        assert_eq!(lineage, vec!["g_1", "g_2", "list_0"]);
    }

    #[test]
    fn test_self_reference_rejected() {
        let ks = ks();
        let x = list_chunk(&ks, "x");
        let err = Chunk::builder("x").chunk(1.0, &x).build().unwrap_err();
        assert!(matches!(err, RecallError::CyclicChunkDefinition(_)));
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let ks = ks();
        let x = list_chunk(&ks, "x");
        let y = Chunk::builder("y").chunk(1.0, &x).build().unwrap();
        let err = Chunk::builder("x").chunk(1.0, &y).build().unwrap_err();
        assert_eq!(
            err,
            RecallError::CyclicChunkDefinition("x -> y -> .. -> x".into())
        );
    }

    #[test]
    fn test_reserved_and_empty_names() {
        assert!(matches!(
            Chunk::builder(NIL_CHUNK).build(),
            Err(RecallError::InvalidChunk(_))
        ));
        assert!(matches!(
            Chunk::builder("").build(),
            Err(RecallError::InvalidChunk(_))
        ));
        let nil = Chunk::nil();
        assert!(nil.is_nil());
        assert!(matches!(
            Chunk::builder("a").chunk(1.0, &nil).build(),
            Err(RecallError::InvalidChunk(_))
        ));
    }

    #[test]
    fn test_nan_coefficient_rejected() {
        let ks = ks();
        let list = list_chunk(&ks, "list_0");
        let err = Chunk::builder("c").chunk(f64::NAN, &list).build().unwrap_err();
        assert!(matches!(err, RecallError::InvalidActivation { .. }));
    }

    #[test]
    fn test_display_lists_bindings() {
        let ks = ks();
        let list = list_chunk(&ks, "list_0");
        let text = list.to_string();
        assert!(text.starts_with("list_0:"));
        assert!(text.contains("list.list ** number._0"));
    }
}
