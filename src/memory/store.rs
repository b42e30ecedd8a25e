//! Associative chunk store: compiled chunks plus bottom-up / top-down weights.
//!
//! Chunks live in an arena indexed by registration slot; names map to slots.
//! Compiling a chunk expands its references into the referenced chunks'
//! compiled bindings (scaled by the term coefficient), keeps the expansion
//! as the chunk's top-down projection and writes one bottom-up weight per
//! expanded key.
//!
//! Re-declaration policy: compiling a chunk under a name that is already
//! registered retracts that chunk's previous bottom-up contributions and
//! replaces its projection. Different chunks sharing a key add up during
//! propagation; the same chunk never counts twice.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::NIL_CHUNK;
use crate::error::{RecallError, Result};
use crate::keyspace::{ActivationVector, Key, KeySpace};
use crate::memory::chunk::Chunk;

pub struct AssociativeStore {
    keyspace: KeySpace,

    /// Compiled chunks in registration order.
    chunks: Vec<Chunk>,

    /// Expanded projection per slot (parallel to `chunks`).
    top_down: Vec<ActivationVector>,

    index: HashMap<String, usize>,

    /// key → slot → weight.
    bottom_up: BTreeMap<Key, BTreeMap<usize, f64>>,

    nil: Chunk,

    dirty: bool,
}

impl AssociativeStore {
    /// Empty store over `keyspace`.
    pub fn new(keyspace: KeySpace) -> Self {
        Self {
            keyspace,
            chunks: Vec::new(),
            top_down: Vec::new(),
            index: HashMap::new(),
            bottom_up: BTreeMap::new(),
            nil: Chunk::nil(),
            dirty: false,
        }
    }

    /// Keyspace every compiled feature resolves against.
    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    /// Register a chunk. Validation (unknown atoms, uncompiled references,
    /// cycles through re-declared names) happens before any mutation.
    pub fn compile(&mut self, chunk: Chunk) -> Result<()> {
        for key in chunk.vector().keys() {
            match key {
                Key::Feature(_) => self.check_key(key)?,
                Key::Chunk(name) => {
                    if !self.index.contains_key(name) {
                        return Err(RecallError::UnknownAddress(format!("chunk:{}", name)));
                    }
                }
            }
        }
        self.check_acyclic(&chunk)?;

        let mut expansion = chunk.vector().clone();
        for (key, coefficient) in chunk.vector().iter() {
            if let Some(name) = key.as_chunk() {
                let slot = self.index[name];
                expansion = expansion.add(&self.top_down[slot].scale(coefficient)?)?;
            }
        }

        let slot = match self.index.get(chunk.name()) {
            Some(&slot) => {
                self.retract(slot);
                slot
            }
            None => {
                let slot = self.chunks.len();
                self.index.insert(chunk.name().to_string(), slot);
                self.chunks.push(Chunk::nil());
                self.top_down.push(ActivationVector::new());
                slot
            }
        };

        for (key, weight) in expansion.iter() {
            self.bottom_up
                .entry(key.clone())
                .or_default()
                .insert(slot, weight);
        }

        tracing::debug!(
            chunk = chunk.name(),
            slot,
            bindings = expansion.len(),
            "compiled chunk"
        );
        self.chunks[slot] = chunk;
        self.top_down[slot] = expansion;
        self.dirty = true;
        Ok(())
    }

    fn retract(&mut self, slot: usize) {
        for key in self.top_down[slot].keys() {
            if let Some(row) = self.bottom_up.get_mut(key) {
                row.remove(&slot);
                if row.is_empty() {
                    self.bottom_up.remove(key);
                }
            }
        }
    }

    /// Depth-first visit over the reference graph with `chunk` standing in
    /// for any compiled chunk of the same name.
    fn check_acyclic(&self, chunk: &Chunk) -> Result<()> {
        let mut visiting: Vec<&str> = Vec::new();
        let mut done: BTreeSet<&str> = BTreeSet::new();
        self.visit(chunk.name(), chunk, &mut visiting, &mut done)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        incoming: &'a Chunk,
        visiting: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(pos) = visiting.iter().position(|&n| n == name) {
            let mut path: Vec<&str> = visiting[pos..].to_vec();
            path.push(name);
            return Err(RecallError::CyclicChunkDefinition(path.join(" -> ")));
        }
        let node = if name == incoming.name() {
            incoming
        } else {
            match self.index.get(name) {
                Some(&slot) => &self.chunks[slot],
                None => return Ok(()),
            }
        };
        visiting.push(name);
        for child in node.references() {
            self.visit(child, incoming, visiting, done)?;
        }
        visiting.pop();
        done.insert(name);
        Ok(())
    }

    fn check_key(&self, key: &Key) -> Result<()> {
        match key {
            Key::Feature(feature) => {
                for atom in [&feature.dim, &feature.val] {
                    if !self.keyspace.contains(atom.address()) {
                        return Err(RecallError::UnknownAddress(atom.address().to_string()));
                    }
                }
                Ok(())
            }
            Key::Chunk(name) => {
                if name == NIL_CHUNK || self.index.contains_key(name) {
                    Ok(())
                } else {
                    Err(RecallError::UnknownAddress(key.to_string()))
                }
            }
        }
    }

    /// Cue → chunk scores. Every compiled chunk appears in the result, so an
    /// empty cue yields an all-zero mapping.
    pub fn propagate_bottom_up(&self, cue: &ActivationVector) -> Result<ActivationVector> {
        for key in cue.keys() {
            self.check_key(key)?;
        }
        let mut scores = vec![0.0f64; self.chunks.len()];
        for (key, w) in cue.iter() {
            if w == 0.0 {
                continue;
            }
            if let Some(row) = self.bottom_up.get(key) {
                for (&slot, &bw) in row {
                    scores[slot] += w * bw;
                }
            }
        }
        ActivationVector::from_pairs(
            self.chunks
                .iter()
                .zip(scores)
                .map(|(chunk, s)| (chunk.key(), s)),
        )
    }

    /// A chunk's compiled bindings, verbatim.
    pub fn propagate_top_down(&self, name: &str) -> Result<ActivationVector> {
        if name == NIL_CHUNK {
            return Ok(ActivationVector::new());
        }
        self.index
            .get(name)
            .map(|&slot| self.top_down[slot].clone())
            .ok_or_else(|| RecallError::UnknownAddress(format!("chunk:{}", name)))
    }

    /// Σ w · top_down(chunk) over the chunk entries of `cue`.
    pub fn reinstate(&self, cue: &ActivationVector) -> Result<ActivationVector> {
        let mut out = ActivationVector::new();
        for (key, w) in cue.iter() {
            self.check_key(key)?;
            if let Some(name) = key.as_chunk() {
                out = out.add(&self.propagate_top_down(name)?.scale(w)?)?;
            }
        }
        Ok(out)
    }

    /// Bottom-up weight from `key` to the chunk `name`.
    pub fn association(&self, key: &Key, name: &str) -> f64 {
        self.index
            .get(name)
            .and_then(|slot| self.bottom_up.get(key).and_then(|row| row.get(slot)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Resolve a chunk key (including the nil sentinel) to its chunk.
    pub fn crawl(&self, key: &Key) -> Option<&Chunk> {
        let name = key.as_chunk()?;
        if name == NIL_CHUNK {
            return Some(&self.nil);
        }
        self.get(name)
    }

    /// Compiled chunk by name.
    pub fn get(&self, name: &str) -> Option<&Chunk> {
        self.index.get(name).map(|&slot| &self.chunks[slot])
    }

    /// The nil sentinel.
    pub fn nil(&self) -> &Chunk {
        &self.nil
    }

    /// Whether `name` has been compiled.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Chunk names in registration order.
    pub fn chunk_names(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(Chunk::name)
    }

    /// Number of compiled chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True before the first compile.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Set by `compile`, cleared by `take_dirty`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning its previous value.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Resolve `address` back to the chunk it names, if any.
pub fn ks_crawl<'a>(store: &'a AssociativeStore, address: &Key) -> Option<&'a Chunk> {
    store.crawl(address)
}
