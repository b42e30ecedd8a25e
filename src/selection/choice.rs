//! Choice: picks one chunk (or nil) from pooled activation.
//!
//! Three policies:
//! 1. **Deterministic**: argmax over candidates scoring above the nil baseline (0)
//! 2. **Boltzmann**: sample ∝ exp(score / sd) over candidates plus nil at score 0
//! 3. **NoisyArgmax**: add N(0, sd) to every candidate and to nil, take the argmax
//!
//! Randomness always comes from a caller-supplied RNG so runs are reproducible.

use ndarray::Array1;
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::NIL_CHUNK;
use crate::error::{RecallError, Result};
use crate::keyspace::{ActivationVector, Key};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    #[default]
    Deterministic,
    Boltzmann,
    NoisyArgmax,
}

/// Outcome of a selection. `Nil` is a regular outcome, not a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Chunk(String),
    Nil,
}

impl Selection {
    pub fn is_nil(&self) -> bool {
        matches!(self, Selection::Nil)
    }

    pub fn chunk_name(&self) -> Option<&str> {
        match self {
            Selection::Chunk(name) => Some(name),
            Selection::Nil => None,
        }
    }

    pub fn key(&self) -> Key {
        Key::chunk(self.chunk_name().unwrap_or(NIL_CHUNK))
    }
}

/// Noise scale check shared by [`select`] and [`Choice::new`].
pub fn check_sd(sd: f64) -> Result<()> {
    if !sd.is_finite() || sd < 0.0 {
        return Err(RecallError::InvalidConfig(format!(
            "selection sd must be finite and non-negative, got {}",
            sd
        )));
    }
    Ok(())
}

/// Softmax of `scores / sd`, shifted by the max for stability.
///
/// Fails with `InvalidActivation` when the scaled scores overflow or the
/// normaliser is not a positive finite number.
pub fn softmax(scores: &Array1<f64>, sd: f64) -> Result<Array1<f64>> {
    let scaled = scores.mapv(|s| s / sd);
    let max = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp = scaled.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(RecallError::InvalidActivation {
            key: format!("softmax(sd = {})", sd),
            value: sum,
        });
    }
    Ok(exp / sum)
}

/// First index holding the maximum, or `None` for an empty slice.
fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Select from `candidates` (in registration order) given chunk scores.
pub fn select<R: Rng + ?Sized>(
    activation: &ActivationVector,
    candidates: &[&str],
    policy: SelectionPolicy,
    sd: f64,
    rng: &mut R,
) -> Result<Selection> {
    check_sd(sd)?;
    if candidates.is_empty() {
        return Ok(Selection::Nil);
    }
    let scores: Vec<f64> = candidates.iter().map(|c| activation.get_chunk(c)).collect();

    let winner = match policy {
        _ if sd == 0.0 => deterministic(&scores),
        SelectionPolicy::Deterministic => deterministic(&scores),
        SelectionPolicy::Boltzmann => boltzmann(&scores, sd, rng)?,
        SelectionPolicy::NoisyArgmax => noisy_argmax(&scores, sd, rng)?,
    };
    Ok(match winner {
        Some(i) => Selection::Chunk(candidates[i].to_string()),
        None => Selection::Nil,
    })
}

fn deterministic(scores: &[f64]) -> Option<usize> {
    first_argmax(scores).filter(|&i| scores[i] > 0.0)
}

/// Nil sits at index `scores.len()` with baseline 0.
fn boltzmann<R: Rng + ?Sized>(scores: &[f64], sd: f64, rng: &mut R) -> Result<Option<usize>> {
    let mut logits = scores.to_vec();
    logits.push(0.0);
    let probs = softmax(&Array1::from_vec(logits), sd)?;
    let dist = WeightedIndex::new(probs.iter()).map_err(|e| RecallError::InvalidActivation {
        key: format!("softmax({})", e),
        value: f64::NAN,
    })?;
    let i = dist.sample(rng);
    Ok((i < scores.len()).then_some(i))
}

fn noisy_argmax<R: Rng + ?Sized>(scores: &[f64], sd: f64, rng: &mut R) -> Result<Option<usize>> {
    let noise = Normal::new(0.0, sd).map_err(|e| RecallError::InvalidConfig(e.to_string()))?;
    let mut noisy: Vec<f64> = scores.iter().map(|s| s + noise.sample(rng)).collect();
    noisy.push(noise.sample(rng));
    Ok(first_argmax(&noisy).filter(|&i| i < scores.len()))
}

/// Running counts of selections.
#[derive(Clone, Debug, Default)]
pub struct ChoiceStats {
    pub selections: u64,
    pub nil_selections: u64,
}

impl ChoiceStats {
    pub fn nil_rate(&self) -> f64 {
        if self.selections == 0 {
            0.0
        } else {
            self.nil_selections as f64 / self.selections as f64
        }
    }
}

/// Selection component: policy, noise scale and the most recent outcome.
#[derive(Clone, Debug)]
pub struct Choice {
    policy: SelectionPolicy,
    sd: f64,
    last: Selection,
    pub stats: ChoiceStats,
}

impl Choice {
    pub fn new(policy: SelectionPolicy, sd: f64) -> Result<Self> {
        check_sd(sd)?;
        Ok(Self {
            policy,
            sd,
            last: Selection::Nil,
            stats: ChoiceStats::default(),
        })
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }

    pub fn select<R: Rng + ?Sized>(
        &mut self,
        activation: &ActivationVector,
        candidates: &[&str],
        rng: &mut R,
    ) -> Result<Selection> {
        let selection = select(activation, candidates, self.policy, self.sd, rng)?;
        self.stats.selections += 1;
        if selection.is_nil() {
            self.stats.nil_selections += 1;
        }
        tracing::debug!(
            policy = ?self.policy,
            candidates = candidates.len(),
            winner = selection.chunk_name().unwrap_or(NIL_CHUNK),
            "selection made"
        );
        self.last = selection.clone();
        Ok(selection)
    }

    /// Most recent outcome.
    pub fn last(&self) -> &Selection {
        &self.last
    }

    /// Most recent outcome as a one-hot vector over chunk keys (empty for nil).
    pub fn poll(&self) -> ActivationVector {
        match &self.last {
            Selection::Chunk(name) => {
                ActivationVector::from_chunks([(name.as_str(), 1.0)]).unwrap_or_default()
            }
            Selection::Nil => ActivationVector::new(),
        }
    }
}
