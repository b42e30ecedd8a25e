//! Digit-list stimuli and their chunk encodings.
//!
//! Two encodings are supported:
//! - **Chunked**: one list chunk, one group chunk per `group_size` digits and
//!   one value chunk per digit. Group weights decay with group index and value
//!   weights trade group binding for digit binding with position in the group.
//! - **Ungrouped**: one `digit_i` chunk per position, bound only to its digit.

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};
use crate::keyspace::{ActivationVector, Atom, Dimension, Family, Key, KeySpace};
use crate::memory::Chunk;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Chunked,
    Ungrouped,
}

/// The `memory` keyspace: `number._0.._9`, `value.value`, `group.group`, `list.list`.
pub fn memory_keyspace() -> Result<KeySpace> {
    KeySpace::new(
        Family::new("memory")
            .with_dimension(Dimension::digits("number"))
            .with_dimension(Dimension::new("value", ["value"]))
            .with_dimension(Dimension::new("group", ["group"]))
            .with_dimension(Dimension::new("list", ["list"])),
    )
}

/// Parse `"0123"` into digits. Empty or non-digit input is rejected.
pub fn parse_sequence(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Err(RecallError::InvalidConfig("empty digit sequence".into()));
    }
    text.chars()
        .map(|c| {
            c.to_digit(10).map(|d| d as u8).ok_or_else(|| {
                RecallError::InvalidConfig(format!("{:?} is not a digit sequence", text))
            })
        })
        .collect()
}

/// Digit carried by a chunk's `value.value ** number._d` binding.
pub fn recalled_digit(chunk: &Chunk) -> Option<u8> {
    chunk
        .features()
        .filter(|(_, w)| *w > 0.0)
        .find(|(f, _)| f.dim.address() == "value.value" && f.val.dimension() == "number")
        .and_then(|(f, _)| f.val.name().strip_prefix('_')?.parse().ok())
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn number(ks: &KeySpace, n: usize) -> Result<Atom> {
    ks.resolve(&format!("number._{}", n))
}

/// One study list and the chunks that encode it, in compile order.
#[derive(Clone, Debug)]
pub struct Stimulus {
    pub digits: Vec<u8>,
    pub encoding: Encoding,
    pub chunks: Vec<Chunk>,
}

impl Stimulus {
    /// Chunked encoding of list number `list_index` (0..=9).
    pub fn chunked(
        ks: &KeySpace,
        digits: &[u8],
        list_index: usize,
        group_size: usize,
    ) -> Result<Self> {
        if group_size == 0 {
            return Err(RecallError::InvalidConfig("group size must be positive".into()));
        }
        let list_atom = ks.resolve("list.list")?;
        let group_atom = ks.resolve("group.group")?;
        let value_atom = ks.resolve("value.value")?;

        let list = Chunk::builder(&format!("list_{}", list_index))
            .feature(1.0, &list_atom, &number(ks, list_index)?)
            .build()?;
        let mut chunks = vec![list.clone()];

        let groups: Vec<&[u8]> = digits.chunks(group_size).collect();
        for i in 1..=groups.len() {
            let x = round1(1.3 - 0.1 * (i - 1) as f64);
            let y = round1(2.0 - x);
            chunks.push(
                Chunk::builder(&format!("g_{}_list{}", i, list_index))
                    .chunk(x, &list)
                    .feature(y, &group_atom, &number(ks, i)?)
                    .build()?,
            );
        }

        let mut idx = 0;
        for (g, members) in groups.iter().enumerate() {
            let i = g + 1;
            for (count, &digit) in members.iter().enumerate() {
                let y = round1(1.1 - 0.1 * (count as f64 - 1.0));
                let z = round1(2.0 - y);
                chunks.push(
                    Chunk::builder(&format!("v_{}_g{}_list{}", idx, i, list_index))
                        .chunk(1.0, &list)
                        .feature(y, &group_atom, &number(ks, i)?)
                        .feature(z, &value_atom, &number(ks, digit as usize)?)
                        .build()?,
                );
                idx += 1;
            }
        }

        Ok(Self {
            digits: digits.to_vec(),
            encoding: Encoding::Chunked,
            chunks,
        })
    }

    pub fn ungrouped(ks: &KeySpace, digits: &[u8]) -> Result<Self> {
        let value_atom = ks.resolve("value.value")?;
        let chunks = digits
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                Chunk::builder(&format!("digit_{}", i))
                    .feature(1.0, &value_atom, &number(ks, d as usize)?)
                    .build()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            digits: digits.to_vec(),
            encoding: Encoding::Ungrouped,
            chunks,
        })
    }

    pub fn encode(
        ks: &KeySpace,
        digits: &[u8],
        encoding: Encoding,
        list_index: usize,
        group_size: usize,
    ) -> Result<Self> {
        match encoding {
            Encoding::Chunked => Self::chunked(ks, digits, list_index, group_size),
            Encoding::Ungrouped => Self::ungrouped(ks, digits),
        }
    }

    /// The list chunk of a chunked stimulus.
    pub fn list_chunk(&self) -> Option<&Chunk> {
        match self.encoding {
            Encoding::Chunked => self.chunks.first(),
            Encoding::Ungrouped => None,
        }
    }

    /// Per-position cue for ungrouped recall: `value.value ** number._d`.
    pub fn value_cue(ks: &KeySpace, digit: u8) -> Result<ActivationVector> {
        let value_atom = ks.resolve("value.value")?;
        ActivationVector::single(Key::feature(&value_atom, &number(ks, digit as usize)?), 1.0)
    }

    /// Digits as text, e.g. `"123"`.
    pub fn text(&self) -> String {
        self.digits.iter().map(|d| char::from(b'0' + d)).collect()
    }
}
