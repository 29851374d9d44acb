//! The research state threaded through every round.

use crate::error::{Error, Result};
use crate::steps::{Document, QueryGenOutput, ReflectOutput, SummarizeOutput, WebResearchOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Why a run stopped looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    LoopLimitReached,
    NoFurtherGap,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::LoopLimitReached => f.write_str("loop-limit-reached"),
            StopReason::NoFurtherGap => f.write_str("no-further-gap"),
        }
    }
}

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Looping,
    Finalized,
}

/// Everything one round produced, committed to the state in one go.
#[derive(Debug, Clone)]
pub struct RoundDelta {
    pub query: QueryGenOutput,
    pub research: WebResearchOutput,
    pub summary: SummarizeOutput,
    pub reflection: ReflectOutput,
}

/// Mutable record of one research run.
///
/// Fields are only reachable through accessors; the controller changes them
/// through [`ResearchState::commit_round`] and [`ResearchState::finalize`],
/// which keep the invariants:
///
/// - `loop_count` only grows and never exceeds `max_loops`
/// - `sources` only grows and holds unique identifiers
/// - `running_summary` is non-empty after the first round
/// - the looping → finalized transition happens once
///
/// Deserializing checks the same invariants and rebuilds the identifier
/// index, so a persisted state can be resumed with [`Controller::round`].
///
/// [`Controller::round`]: crate::Controller::round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResearchState")]
pub struct ResearchState {
    topic: String,
    current_query: Option<String>,
    sources: Vec<Document>,
    #[serde(skip)]
    seen_ids: HashSet<String>,
    running_summary: String,
    loop_count: usize,
    max_loops: usize,
    last_reflection: Option<ReflectOutput>,
    phase: Phase,
    stop_reason: Option<StopReason>,
    report: Option<String>,
}

impl ResearchState {
    /// Create a fresh state. Fails on an empty topic or `max_loops < 1`.
    pub fn new(topic: impl Into<String>, max_loops: usize) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(Error::Input);
        }
        if max_loops < 1 {
            return Err(Error::Config(format!(
                "max_loops must be at least 1, got {}",
                max_loops
            )));
        }

        Ok(Self {
            topic,
            current_query: None,
            sources: Vec::new(),
            seen_ids: HashSet::new(),
            running_summary: String::new(),
            loop_count: 0,
            max_loops,
            last_reflection: None,
            phase: Phase::Looping,
            stop_reason: None,
            report: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn current_query(&self) -> Option<&str> {
        self.current_query.as_deref()
    }

    pub fn sources(&self) -> &[Document] {
        &self.sources
    }

    pub fn running_summary(&self) -> &str {
        &self.running_summary
    }

    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    pub fn max_loops(&self) -> usize {
        self.max_loops
    }

    pub fn last_reflection(&self) -> Option<&ReflectOutput> {
        self.last_reflection.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Whether another round may still run.
    pub fn has_rounds_left(&self) -> bool {
        self.phase == Phase::Looping && self.loop_count < self.max_loops
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Apply a completed round. Returns how many new sources were added.
    pub(crate) fn commit_round(&mut self, delta: RoundDelta) -> usize {
        debug_assert!(self.has_rounds_left(), "round committed past the loop bound");
        debug_assert!(!delta.summary.summary.trim().is_empty());

        self.current_query = Some(delta.query.query);
        let added = self.merge_sources(delta.research.documents);
        self.running_summary = delta.summary.summary;
        self.last_reflection = Some(delta.reflection);
        self.loop_count += 1;
        added
    }

    /// Append documents whose identifier has not been seen yet.
    fn merge_sources(&mut self, documents: Vec<Document>) -> usize {
        let before = self.sources.len();
        for doc in documents {
            if self.seen_ids.insert(doc.id.clone()) {
                self.sources.push(doc);
            }
        }
        self.sources.len() - before
    }

    /// Record the terminal outcome. Only the first call has any effect.
    pub(crate) fn finalize(&mut self, reason: StopReason, report: String) -> bool {
        if self.phase == Phase::Finalized {
            return false;
        }
        self.phase = Phase::Finalized;
        self.stop_reason = Some(reason);
        self.report = Some(report);
        true
    }

}

/// Wire form of [`ResearchState`], checked before it becomes one.
#[derive(Deserialize)]
struct RawResearchState {
    topic: String,
    #[serde(default)]
    current_query: Option<String>,
    #[serde(default)]
    sources: Vec<Document>,
    #[serde(default)]
    running_summary: String,
    #[serde(default)]
    loop_count: usize,
    max_loops: usize,
    #[serde(default)]
    last_reflection: Option<ReflectOutput>,
    phase: Phase,
    #[serde(default)]
    stop_reason: Option<StopReason>,
    #[serde(default)]
    report: Option<String>,
}

impl TryFrom<RawResearchState> for ResearchState {
    type Error = Error;

    fn try_from(raw: RawResearchState) -> Result<Self> {
        let mut state = ResearchState::new(raw.topic, raw.max_loops)?;

        if raw.loop_count > raw.max_loops {
            return Err(Error::State(format!(
                "loop_count {} exceeds max_loops {}",
                raw.loop_count, raw.max_loops
            )));
        }
        if raw.loop_count > 0 && raw.running_summary.trim().is_empty() {
            return Err(Error::State(format!(
                "empty running summary after {} round(s)",
                raw.loop_count
            )));
        }
        if raw.loop_count > 0 && raw.last_reflection.is_none() {
            return Err(Error::State(format!(
                "missing reflection after {} round(s)",
                raw.loop_count
            )));
        }

        let finalized = raw.phase == Phase::Finalized;
        if finalized != raw.stop_reason.is_some() || finalized != raw.report.is_some() {
            return Err(Error::State(format!(
                "phase {:?} does not match stop reason and report",
                raw.phase
            )));
        }

        for doc in &raw.sources {
            if !state.seen_ids.insert(doc.id.clone()) {
                return Err(Error::State(format!("duplicate source id {:?}", doc.id)));
            }
        }

        state.current_query = raw.current_query;
        state.sources = raw.sources;
        state.running_summary = raw.running_summary;
        state.loop_count = raw.loop_count;
        state.last_reflection = raw.last_reflection;
        state.phase = raw.phase;
        state.stop_reason = raw.stop_reason;
        state.report = raw.report;
        Ok(state)
    }
}

/// Collapse duplicate identifiers within one batch, keeping the first.
pub fn dedup_batch(documents: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|d| seen.insert(d.id.clone()))
        .collect()
}
