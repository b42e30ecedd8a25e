//! Family tree of dimensions and atoms.
//!
//! A keyspace is declared once as a tree of [`Family`] nodes whose leaves are
//! [`Dimension`]s of discrete atoms, then compiled into a [`KeySpace`]. Atom
//! addresses are dotted paths below the root family, e.g. `number._3` or
//! `context.slot.first`. The compiled keyspace is never mutated.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{RecallError, Result};

/// A single resolved atom. Only a [`KeySpace`] hands these out, so holding an
/// `Atom` means its address was declared.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    address: String,
}

impl Atom {
    /// Full dotted address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Last path segment, e.g. `_3` for `number._3`.
    pub fn name(&self) -> &str {
        self.address
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.address)
    }

    /// Path of the owning dimension, e.g. `number` for `number._3`.
    pub fn dimension(&self) -> &str {
        self.address
            .rsplit_once('.')
            .map(|(dim, _)| dim)
            .unwrap_or("")
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.address)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// A named discrete domain of atoms.
#[derive(Clone, Debug)]
pub struct Dimension {
    pub name: String,
    pub atoms: Vec<String>,
}

impl Dimension {
    /// Dimension holding `atoms` in declaration order.
    pub fn new<I, S>(name: &str, atoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            atoms: atoms.into_iter().map(Into::into).collect(),
        }
    }

    /// The ten digit atoms `_0 .. _9`.
    pub fn digits(name: &str) -> Self {
        Self::new(name, (0..10).map(|d| format!("_{}", d)))
    }
}

/// A namespace node: dimensions plus nested sub-families.
#[derive(Clone, Debug)]
pub struct Family {
    pub name: String,
    pub dimensions: Vec<Dimension>,
    pub families: Vec<Family>,
}

impl Family {
    /// Empty family.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dimensions: Vec::new(),
            families: Vec::new(),
        }
    }

    /// Add a dimension to this family.
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Nest a sub-family; its dimensions are addressed under its own name.
    pub fn with_family(mut self, family: Family) -> Self {
        self.families.push(family);
        self
    }
}

/// Compiled, immutable keyspace.
#[derive(Clone, Debug)]
pub struct KeySpace {
    root: String,
    atoms: BTreeSet<String>,
    /// Dimension path → atom addresses in declaration order.
    dimensions: BTreeMap<String, Vec<String>>,
}

impl KeySpace {
    /// Compile a family tree. Fails on malformed segment names or when two
    /// declarations produce the same address.
    pub fn new(root: Family) -> Result<Self> {
        let mut ks = Self {
            root: root.name.clone(),
            atoms: BTreeSet::new(),
            dimensions: BTreeMap::new(),
        };
        ks.collect(&root, "")?;
        Ok(ks)
    }

    fn collect(&mut self, family: &Family, prefix: &str) -> Result<()> {
        for dim in &family.dimensions {
            check_segment(&dim.name)?;
            let dim_path = join(prefix, &dim.name);
            if self.dimensions.contains_key(&dim_path) {
                return Err(RecallError::DuplicateAddress(dim_path));
            }
            let mut addresses = Vec::with_capacity(dim.atoms.len());
            for atom in &dim.atoms {
                check_segment(atom)?;
                let address = join(&dim_path, atom);
                if !self.atoms.insert(address.clone()) {
                    return Err(RecallError::DuplicateAddress(address));
                }
                addresses.push(address);
            }
            self.dimensions.insert(dim_path, addresses);
        }
        for sub in &family.families {
            check_segment(&sub.name)?;
            self.collect(sub, &join(prefix, &sub.name))?;
        }
        Ok(())
    }

    /// Root family name.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Resolve a dotted path to an atom.
    pub fn resolve(&self, path: &str) -> Result<Atom> {
        if self.atoms.contains(path) {
            Ok(Atom {
                address: path.to_string(),
            })
        } else {
            Err(RecallError::UnknownAddress(path.to_string()))
        }
    }

    /// Whether `path` resolves to an atom.
    pub fn contains(&self, path: &str) -> bool {
        self.atoms.contains(path)
    }

    /// Atoms of a dimension, in declaration order.
    pub fn atoms_of(&self, dimension: &str) -> Result<Vec<Atom>> {
        self.dimensions
            .get(dimension)
            .map(|addrs| {
                addrs
                    .iter()
                    .map(|a| Atom { address: a.clone() })
                    .collect()
            })
            .ok_or_else(|| RecallError::UnknownAddress(dimension.to_string()))
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// True when no atom was declared.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn check_segment(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('.') {
        return Err(RecallError::InvalidConfig(format!(
            "keyspace segment {:?} must be non-empty and dot-free",
            name
        )));
    }
    Ok(())
}
