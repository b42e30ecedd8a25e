//! Participant: one agent wiring store, pool and choice onto the event queue.
//!
//! Per cue:
//! 1. `send` latches the cue and enqueues INPUT_RECEIVED
//! 2. INPUT_RECEIVED: bottom-up propagation (optionally after top-down
//!    reinstatement) writes retrieval and inhibition sources into the pool
//! 3. PROPAGATION_DONE: the pool is aggregated and the choice selects
//! 4. SELECTION_MADE: inhibition of return is applied to the winner
//!
//! The follow-up events come from the pure [`transition`] function; the
//! participant only performs each event's side effect.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::{
    BOTTOM_UP_SOURCE, DEFAULT_INHIBITION_GAIN, DEFAULT_SD, DEFAULT_SEED, INHIBITION_SOURCE,
};
use crate::error::{RecallError, Result};
use crate::keyspace::{ActivationVector, Combine, Key, KeySpace};
use crate::memory::{AssociativeStore, Chunk};
use crate::runtime::scheduler::{Event, EventKind, Scheduler};
use crate::selection::{Choice, Pool, Selection, SelectionPolicy, Transform};

/// How an incoming cue reaches the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CueRoute {
    /// cue → bottom-up.
    #[default]
    BottomUp,
    /// cue ⊕ top-down(cue) → bottom-up.
    Reinstate,
}

/// Participant configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    pub policy: SelectionPolicy,

    /// Selection noise scale.
    pub sd: f64,

    /// Seed for the participant's private RNG.
    pub seed: u64,

    pub cue_route: CueRoute,

    /// Pool combination function.
    pub combine: Combine,

    /// Inhibit each winner automatically on SELECTION_MADE.
    pub inhibition_of_return: bool,

    /// Gain for automatic inhibition; 1.0 cancels the winner's retrieval score.
    pub inhibition_gain: f64,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Deterministic,
            sd: DEFAULT_SD,
            seed: DEFAULT_SEED,
            cue_route: CueRoute::BottomUp,
            combine: Combine::Sum,
            inhibition_of_return: true,
            inhibition_gain: DEFAULT_INHIBITION_GAIN,
        }
    }
}

impl ParticipantConfig {
    /// Reject configurations the participant cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.sd.is_finite() || self.sd < 0.0 {
            return Err(RecallError::InvalidConfig(format!(
                "sd must be finite and non-negative, got {}",
                self.sd
            )));
        }
        if !self.inhibition_gain.is_finite() {
            return Err(RecallError::InvalidConfig(format!(
                "inhibition gain must be finite, got {}",
                self.inhibition_gain
            )));
        }
        Ok(())
    }
}

/// Where the participant is within one cue's settling cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Scores are pooled; a selection is pending.
    Propagated,
    /// A selection was made; inhibition of return is pending.
    Selected,
}

/// Pure state transition: the phase after `event` and the events it triggers.
pub fn transition(phase: Phase, event: EventKind) -> (Phase, Vec<EventKind>) {
    match event {
        EventKind::InputReceived => (Phase::Propagated, vec![EventKind::PropagationDone]),
        EventKind::PropagationDone => (Phase::Selected, vec![EventKind::SelectionMade]),
        EventKind::SelectionMade => (Phase::Idle, Vec::new()),
        EventKind::StoreUpdated => (phase, Vec::new()),
    }
}

pub struct Participant {
    pub name: String,
    config: ParticipantConfig,
    store: AssociativeStore,
    pool: Pool,
    choice: Choice,
    scheduler: Scheduler,
    rng: StdRng,
    phase: Phase,

    /// Latched cue from the input channel.
    input: ActivationVector,

    /// Last bottom-up scores.
    scores: ActivationVector,

    /// Inhibited chunk → gain.
    inhibition: BTreeMap<String, f64>,

    /// Legal candidates; `None` means every compiled chunk.
    allowed: Option<BTreeSet<String>>,
}

impl Participant {
    /// Participant with an empty store over `keyspace`.
    pub fn new(name: &str, keyspace: KeySpace, config: ParticipantConfig) -> Result<Self> {
        config.validate()?;
        let choice = Choice::new(config.policy, config.sd)?;
        Ok(Self {
            name: name.to_string(),
            store: AssociativeStore::new(keyspace),
            pool: Pool::new(config.combine),
            choice,
            scheduler: Scheduler::new(),
            rng: StdRng::seed_from_u64(config.seed),
            phase: Phase::Idle,
            input: ActivationVector::new(),
            scores: ActivationVector::new(),
            inhibition: BTreeMap::new(),
            allowed: None,
            config,
        })
    }

    /// Study-phase insertion; schedules a store update.
    pub fn compile(&mut self, chunk: Chunk) -> Result<()> {
        self.store.compile(chunk)?;
        self.scheduler.schedule(EventKind::StoreUpdated, 0);
        Ok(())
    }

    /// Latch `cue` on the input channel and schedule its propagation.
    pub fn send(&mut self, cue: ActivationVector) {
        tracing::debug!(participant = %self.name, cue = %cue, "cue sent");
        self.input = cue;
        self.scheduler.schedule(EventKind::InputReceived, 0);
    }

    /// `send` for a `{chunk_name: weight}` cue.
    pub fn send_chunks(&mut self, cue: &[(&str, f64)]) -> Result<()> {
        let cue = ActivationVector::from_chunks(cue.iter().copied())?;
        self.send(cue);
        Ok(())
    }

    /// Inhibit `name` with `gain` (1.0 cancels its retrieval score).
    pub fn inhibit(&mut self, name: &str, gain: f64) -> Result<()> {
        if !self.store.contains(name) {
            return Err(RecallError::UnknownAddress(format!("chunk:{}", name)));
        }
        if !gain.is_finite() {
            return Err(RecallError::InvalidActivation {
                key: format!("chunk:{}", name),
                value: gain,
            });
        }
        self.inhibition.insert(name.to_string(), gain);
        self.refresh_inhibition()
    }

    /// Inhibit every chunk entry of `v`, using its weight as the gain.
    /// Feature entries carry no chunk identity and are skipped.
    pub fn inhibit_vector(&mut self, v: &ActivationVector) -> Result<()> {
        for (name, gain) in v.chunks() {
            self.inhibit(name, gain)?;
        }
        Ok(())
    }

    /// Drop the inhibition on `name`.
    pub fn release(&mut self, name: &str) -> Result<()> {
        self.inhibition.remove(name);
        self.refresh_inhibition()
    }

    /// Drop every inhibition.
    pub fn clear_inhibition(&mut self) -> Result<()> {
        self.inhibition.clear();
        self.refresh_inhibition()
    }

    /// Current gain on `name`, 0 when uninhibited.
    pub fn inhibition_gain(&self, name: &str) -> f64 {
        self.inhibition.get(name).copied().unwrap_or(0.0)
    }

    /// Restrict selection to `names` (intersected with compiled chunks).
    pub fn restrict_candidates<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(names.into_iter().map(Into::into).collect());
    }

    /// Every compiled chunk is a candidate again.
    pub fn clear_candidates(&mut self) {
        self.allowed = None;
    }

    /// Legal candidates in registration order.
    pub fn candidates(&self) -> Vec<&str> {
        self.store
            .chunk_names()
            .filter(|n| self.allowed.as_ref().map_or(true, |a| a.contains(*n)))
            .collect()
    }

    /// Execute one queued event. `Ok(None)` once the queue has drained.
    ///
    /// A failing event is consumed and schedules nothing further.
    pub fn advance(&mut self) -> Result<Option<Event>> {
        let Some(event) = self.scheduler.pop() else {
            return Ok(None);
        };
        tracing::trace!(participant = %self.name, ?event, "advance");

        if let Err(err) = self.execute(event.kind) {
            self.phase = Phase::Idle;
            return Err(err);
        }
        let (phase, next) = transition(self.phase, event.kind);
        self.phase = phase;
        for kind in next {
            self.scheduler.schedule(kind, 0);
        }
        Ok(Some(event))
    }

    /// Advance until the queue is empty, returning the executed events.
    pub fn run_until_quiescent(&mut self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.advance()? {
            events.push(event);
        }
        Ok(events)
    }

    fn execute(&mut self, kind: EventKind) -> Result<()> {
        match kind {
            EventKind::StoreUpdated => {
                self.store.take_dirty();
                Ok(())
            }
            EventKind::InputReceived => self.propagate(),
            EventKind::PropagationDone => self.select(),
            EventKind::SelectionMade => self.apply_inhibition_of_return(),
        }
    }

    fn propagate(&mut self) -> Result<()> {
        let cue = match self.config.cue_route {
            CueRoute::BottomUp => self.input.clone(),
            CueRoute::Reinstate => self.input.add(&self.store.reinstate(&self.input)?)?,
        };
        self.scores = self.store.propagate_bottom_up(&cue)?;
        self.pool
            .set_source(BOTTOM_UP_SOURCE, self.scores.clone(), Transform::Identity);
        self.refresh_inhibition()
    }

    /// Inhibition source: gain · retrieval score for every inhibited chunk.
    fn refresh_inhibition(&mut self) -> Result<()> {
        let mut signal = ActivationVector::new();
        for (name, &gain) in &self.inhibition {
            signal.set(Key::chunk(name), gain * self.scores.get_chunk(name))?;
        }
        self.pool.set_source(INHIBITION_SOURCE, signal, Transform::Negate);
        Ok(())
    }

    fn select(&mut self) -> Result<()> {
        let pooled = self.pool.aggregate()?;
        let allowed = &self.allowed;
        let candidates: Vec<&str> = self
            .store
            .chunk_names()
            .filter(|n| allowed.as_ref().map_or(true, |a| a.contains(*n)))
            .collect();
        self.choice.select(&pooled, &candidates, &mut self.rng)?;
        Ok(())
    }

    fn apply_inhibition_of_return(&mut self) -> Result<()> {
        if !self.config.inhibition_of_return {
            return Ok(());
        }
        if let Selection::Chunk(name) = self.choice.last().clone() {
            self.inhibit(&name, self.config.inhibition_gain)?;
        }
        Ok(())
    }

    /// Last selection as a one-hot vector.
    pub fn poll(&self) -> ActivationVector {
        self.choice.poll()
    }

    /// Winner of the most recent settled cue.
    pub fn last_selection(&self) -> &Selection {
        self.choice.last()
    }

    /// Resolve a chunk key through the store.
    pub fn crawl(&self, key: &Key) -> Option<&Chunk> {
        self.store.crawl(key)
    }

    /// Forget the cue, scores, inhibition and pooled sources; keep knowledge.
    pub fn reset_trial(&mut self) {
        self.input = ActivationVector::new();
        self.scores = ActivationVector::new();
        self.inhibition.clear();
        self.pool.clear();
        self.phase = Phase::Idle;
    }

    /// Whether events remain scheduled.
    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Configuration the participant was built with.
    pub fn config(&self) -> &ParticipantConfig {
        &self.config
    }

    /// Long-term memory.
    pub fn store(&self) -> &AssociativeStore {
        &self.store
    }

    /// Evidence pool feeding selection.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Selection unit and its statistics.
    pub fn choice(&self) -> &Choice {
        &self.choice
    }

    /// Pending events.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current processing phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Latched cue.
    pub fn input(&self) -> &ActivationVector {
        &self.input
    }

    /// Bottom-up scores from the last propagation.
    pub fn scores(&self) -> &ActivationVector {
        &self.scores
    }
}
