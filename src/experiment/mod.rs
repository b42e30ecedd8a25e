//! Serial-recall experiment driver.
//!
//! This module provides:
//! - Digit-list stimuli with chunked and ungrouped encodings
//! - Study / recall sessions over a [`Participant`]
//! - Recall scoring and batch summaries
//! - Batch runner: one participant per list, lists run in parallel (rayon)
//! - Shared runner: one participant studies every list, then recalls each

pub mod scoring;
pub mod session;
pub mod stimuli;

use anyhow::{bail, Context};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_GROUP_SIZE;
use crate::error::{RecallError, Result};
use crate::runtime::{Participant, ParticipantConfig};

pub use scoring::{score, Summary, TrialScore};
pub use session::{recall, study, RecallRun};
pub use stimuli::{memory_keyspace, parse_sequence, recalled_digit, Encoding, Stimulus};

/// Experiment configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub encoding: Encoding,

    /// Digits per group chunk (chunked encoding only).
    pub group_size: usize,

    pub participant: ParticipantConfig,

    /// Recall cycle bound; `None` bounds by the number of compiled chunks.
    pub max_cycles: Option<usize>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Chunked,
            group_size: DEFAULT_GROUP_SIZE,
            participant: ParticipantConfig::default(),
            max_cycles: None,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(RecallError::InvalidConfig("group size must be positive".into()));
        }
        self.participant.validate()
    }
}

/// One scored trial.
#[derive(Clone, Debug, Serialize)]
pub struct TrialReport {
    /// 1-based trial number.
    pub trial: usize,
    pub stimulus: String,
    pub response: String,
    pub selections: Vec<String>,
    pub cycles: usize,
    pub score: TrialScore,
}

impl TrialReport {
    fn new(index: usize, stimulus: &Stimulus, run: RecallRun) -> Self {
        let text = stimulus.text();
        let score = score(&text, &run.response);
        Self {
            trial: index + 1,
            stimulus: text,
            response: run.response,
            selections: run.selections,
            cycles: run.cycles,
            score,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchReport {
    pub config: ExperimentConfig,
    pub trials: Vec<TrialReport>,
    pub summary: Summary,
}

impl BatchReport {
    fn new(config: &ExperimentConfig, trials: Vec<TrialReport>) -> Self {
        let summary = Summary::from_scores(trials.iter().map(|t| &t.score));
        Self {
            config: config.clone(),
            trials,
            summary,
        }
    }
}

/// Study and recall `sequence` with a fresh participant seeded `seed + index`.
pub fn run_trial(index: usize, sequence: &str, config: &ExperimentConfig) -> Result<TrialReport> {
    config.validate()?;
    let digits = parse_sequence(sequence)?;
    let ks = memory_keyspace()?;
    let participant_config = ParticipantConfig {
        seed: config.participant.seed.wrapping_add(index as u64),
        ..config.participant.clone()
    };
    let mut participant =
        Participant::new(&format!("participant_{}", index), ks.clone(), participant_config)?;

    let stimulus = Stimulus::encode(&ks, &digits, config.encoding, 0, config.group_size)?;
    study(&mut participant, &stimulus)?;
    let run = recall(&mut participant, &stimulus, config.max_cycles)?;
    Ok(TrialReport::new(index, &stimulus, run))
}

/// Independent participants, one per sequence, run in parallel.
pub fn run_batch(sequences: &[String], config: &ExperimentConfig) -> anyhow::Result<BatchReport> {
    if sequences.is_empty() {
        bail!("no sequences to run");
    }
    config.validate().context("invalid experiment config")?;

    let trials = sequences
        .par_iter()
        .enumerate()
        .map(|(i, seq)| {
            run_trial(i, seq, config).with_context(|| format!("trial {} ({})", i + 1, seq))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let report = BatchReport::new(config, trials);
    tracing::info!(
        trials = report.summary.trials,
        ordered = report.summary.mean_ordered_rate,
        digits = report.summary.mean_digit_rate,
        "batch complete"
    );
    Ok(report)
}

/// One participant for every sequence.
///
/// Chunked lists are all studied first (list `i` bound to `number._i`, so at
/// most ten lists) and then recalled in order; ungrouped lists are studied
/// and recalled one at a time, each study re-declaring the `digit_i` chunks.
/// Trial state is reset between recalls; knowledge is kept.
pub fn run_shared(sequences: &[String], config: &ExperimentConfig) -> anyhow::Result<BatchReport> {
    if sequences.is_empty() {
        bail!("no sequences to run");
    }
    config.validate().context("invalid experiment config")?;

    let ks = memory_keyspace()?;
    let mut participant = Participant::new("participant", ks.clone(), config.participant.clone())?;

    let stimuli = sequences
        .iter()
        .enumerate()
        .map(|(i, seq)| {
            let digits = parse_sequence(seq)?;
            Stimulus::encode(&ks, &digits, config.encoding, i, config.group_size)
        })
        .collect::<Result<Vec<_>>>()
        .context("encoding stimuli")?;

    let mut trials = Vec::with_capacity(stimuli.len());
    match config.encoding {
        Encoding::Chunked => {
            for stimulus in &stimuli {
                study(&mut participant, stimulus)?;
            }
            for (i, stimulus) in stimuli.iter().enumerate() {
                participant.reset_trial();
                let run = recall(&mut participant, stimulus, config.max_cycles)
                    .with_context(|| format!("trial {}", i + 1))?;
                trials.push(TrialReport::new(i, stimulus, run));
            }
        }
        Encoding::Ungrouped => {
            for (i, stimulus) in stimuli.iter().enumerate() {
                participant.reset_trial();
                study(&mut participant, stimulus)?;
                let run = recall(&mut participant, stimulus, config.max_cycles)
                    .with_context(|| format!("trial {}", i + 1))?;
                trials.push(TrialReport::new(i, stimulus, run));
            }
        }
    }

    let report = BatchReport::new(config, trials);
    tracing::info!(
        trials = report.summary.trials,
        ordered = report.summary.mean_ordered_rate,
        digits = report.summary.mean_digit_rate,
        "shared run complete"
    );
    Ok(report)
}
