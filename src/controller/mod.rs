//! The research controller.
//!
//! Owns the [`ResearchState`] for one run and drives the fixed round
//! sequence: query, web research, summarize, reflect. After each round the
//! router decides whether to go on; once it says finalize, the finalizer is
//! called exactly once.

mod config;
mod events;

pub use config::{DEFAULT_BASE_URL, DEFAULT_MAX_LOOPS, DEFAULT_MODEL, ResearchConfig};
pub use events::{EventCallback, ResearchCallbacks, ResearchEvent, progress_callbacks};

use crate::error::{CollaboratorError, Error, Result};
use crate::router::{self, Decision};
use crate::state::{ResearchState, RoundDelta, dedup_batch};
use crate::steps::{
    Finalizer, QueryGenOutput, QueryGenerator, Reflector, Step, Summarizer, WebResearchOutput,
    WebResearcher,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// The five collaborators a controller delegates to.
pub struct Collaborators {
    pub query_generator: Box<dyn QueryGenerator>,
    pub web_researcher: Box<dyn WebResearcher>,
    pub summarizer: Box<dyn Summarizer>,
    pub reflector: Box<dyn Reflector>,
    pub finalizer: Box<dyn Finalizer>,
}

impl Collaborators {
    pub fn new(
        query_generator: impl QueryGenerator + 'static,
        web_researcher: impl WebResearcher + 'static,
        summarizer: impl Summarizer + 'static,
        reflector: impl Reflector + 'static,
        finalizer: impl Finalizer + 'static,
    ) -> Self {
        Self {
            query_generator: Box::new(query_generator),
            web_researcher: Box::new(web_researcher),
            summarizer: Box::new(summarizer),
            reflector: Box::new(reflector),
            finalizer: Box::new(finalizer),
        }
    }
}

/// Drives research rounds until the router says stop.
pub struct Controller {
    collaborators: Collaborators,
    config: ResearchConfig,
    callbacks: ResearchCallbacks,
}

impl Controller {
    /// Create a new controller.
    pub fn new(config: ResearchConfig, collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            config,
            callbacks: ResearchCallbacks::default(),
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    // =========================================================================
    // Builder methods for callbacks
    // =========================================================================

    /// Print round-by-round progress to stdout.
    pub fn verbose(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks = progress_callbacks();
        }
        self
    }

    /// Replace all callbacks at once. Event capture stays as configured.
    pub fn callbacks(mut self, callbacks: ResearchCallbacks) -> Self {
        let captured = self.callbacks.captured_events.take();
        self.callbacks = callbacks;
        self.callbacks.captured_events = captured;
        self
    }

    /// Set a callback for round start events.
    pub fn on_round_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_round_start = Some(Arc::new(f));
        self
    }

    /// Set a callback for the query chosen in each round.
    pub fn on_query_generated<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_query_generated = Some(Arc::new(f));
        self
    }

    /// Set a callback for fetched document batches.
    pub fn on_documents_fetched<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_documents_fetched = Some(Arc::new(f));
        self
    }

    /// Set a callback for summary updates.
    pub fn on_summary_updated<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_summary_updated = Some(Arc::new(f));
        self
    }

    /// Set a callback for reflection verdicts.
    pub fn on_reflected<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_reflected = Some(Arc::new(f));
        self
    }

    /// Set a callback for committed rounds.
    pub fn on_round_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_round_complete = Some(Arc::new(f));
        self
    }

    /// Set a callback for router decisions.
    pub fn on_routed<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_routed = Some(Arc::new(f));
        self
    }

    /// Set a callback for the finalization event.
    pub fn on_finalized<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_finalized = Some(Arc::new(f));
        self
    }

    /// Set a callback for collaborator failures.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    /// Set a catch-all callback for any event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResearchEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_event = Some(Arc::new(f));
        self
    }

    /// Record every emitted event for later inspection.
    pub fn capture_events(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks.captured_events = Some(Arc::new(Mutex::new(Vec::new())));
        } else {
            self.callbacks.captured_events = None;
        }
        self
    }

    /// Take the events captured so far.
    pub fn take_events(&self) -> Vec<ResearchEvent> {
        if let Some(ref events) = self.callbacks.captured_events
            && let Ok(mut events) = events.lock()
        {
            return std::mem::take(&mut *events);
        }
        Vec::new()
    }

    fn emit(&self, event: ResearchEvent) {
        self.callbacks.emit(&event);
    }

    /// Tag a collaborator failure with its round and step.
    fn fail(&self, round: usize, step: Step, source: CollaboratorError) -> Error {
        warn!(round, step = %step, error = %source, "collaborator failed");
        self.emit(ResearchEvent::Error {
            round,
            step,
            message: source.to_string(),
        });
        Error::Collaborator {
            round,
            step,
            source,
        }
    }

    // =========================================================================
    // Main run loop
    // =========================================================================

    /// Research `topic` until the router finalizes, then build the report.
    ///
    /// On error nothing is reported; the partial state is dropped.
    pub async fn run(&self, topic: &str) -> Result<ResearchState> {
        let mut state = self.start(topic)?;
        info!(topic = state.topic(), max_loops = state.max_loops(), "starting research");

        for _ in 0..state.max_loops() {
            if let Decision::Finalize(_) = self.round(&mut state).await? {
                break;
            }
        }

        self.finalize(&mut state).await?;
        Ok(state)
    }

    /// Create a validated state for `topic`. No collaborator is invoked.
    pub fn start(&self, topic: &str) -> Result<ResearchState> {
        self.config.validate()?;
        ResearchState::new(topic, self.config.max_loops)
    }

    /// Run and commit one round, then ask the router what comes next.
    ///
    /// The round's outputs are only applied when all four steps succeed; on
    /// failure `state` is exactly what it was before the call. A state that
    /// is finalized or at its loop bound is left untouched.
    pub async fn round(&self, state: &mut ResearchState) -> Result<Decision> {
        if let Some(reason) = state.stop_reason() {
            return Ok(Decision::Finalize(reason));
        }
        if !state.has_rounds_left() {
            return Ok(router::decide(state));
        }

        let round = state.loop_count() + 1;
        let delta = self.execute_round(state, round).await?;

        let new_sources = state.commit_round(delta);
        self.emit(ResearchEvent::RoundComplete {
            round,
            new_sources,
            total_sources: state.sources().len(),
        });
        info!(
            round,
            new_sources,
            total_sources = state.sources().len(),
            "round complete"
        );

        let decision = router::decide(state);
        debug!(round, ?decision, "routed");
        self.emit(ResearchEvent::Routed { round, decision });
        Ok(decision)
    }

    /// Compute a round's outputs against a read-only view of the state.
    async fn execute_round(&self, state: &ResearchState, round: usize) -> Result<RoundDelta> {
        self.emit(ResearchEvent::RoundStart {
            round,
            max_loops: state.max_loops(),
        });

        let follow_up = state
            .last_reflection()
            .and_then(|r| r.next_query().map(|q| (q.to_string(), r.knowledge_gap.clone())));
        let from_reflection = follow_up.is_some();

        let query = match follow_up {
            Some((query, rationale)) => QueryGenOutput { query, rationale },
            None => self
                .collaborators
                .query_generator
                .generate_query(state.topic(), state.running_summary())
                .await
                .map_err(|e| self.fail(round, Step::GenerateQuery, e))?,
        };
        if query.query.trim().is_empty() {
            return Err(self.fail(
                round,
                Step::GenerateQuery,
                CollaboratorError::EmptyOutput("query"),
            ));
        }
        debug!(round, query = %query.query, from_reflection, "query selected");
        self.emit(ResearchEvent::QueryGenerated {
            round,
            query: query.query.clone(),
            from_reflection,
        });

        let fetched = self
            .collaborators
            .web_researcher
            .research(&query.query)
            .await
            .map_err(|e| self.fail(round, Step::WebResearch, e))?;
        let research = WebResearchOutput {
            documents: dedup_batch(fetched.documents),
        };
        self.emit(ResearchEvent::DocumentsFetched {
            round,
            count: research.documents.len(),
        });

        let summary = self
            .collaborators
            .summarizer
            .summarize(state.topic(), state.running_summary(), &research.documents)
            .await
            .map_err(|e| self.fail(round, Step::Summarize, e))?;
        if summary.summary.trim().is_empty() {
            return Err(self.fail(
                round,
                Step::Summarize,
                CollaboratorError::EmptyOutput("summary"),
            ));
        }
        self.emit(ResearchEvent::SummaryUpdated {
            round,
            summary_chars: summary.summary.chars().count(),
        });

        let reflection = self
            .collaborators
            .reflector
            .reflect(state.topic(), &summary.summary)
            .await
            .map_err(|e| self.fail(round, Step::Reflect, e))?;
        self.emit(ResearchEvent::Reflected {
            round,
            has_gap: reflection.has_gap,
            follow_up_query: reflection.next_query().map(str::to_string),
        });

        Ok(RoundDelta {
            query,
            research,
            summary,
            reflection,
        })
    }

    /// Hand the final summary and sources to the finalizer, once.
    ///
    /// The stop reason comes from the router; while it still says continue
    /// this fails with [`Error::NotFinished`] and the finalizer is not called.
    /// A state that is already finalized is left as is.
    pub async fn finalize(&self, state: &mut ResearchState) -> Result<()> {
        if state.is_finalized() {
            return Ok(());
        }
        let reason = match router::decide(state) {
            Decision::Finalize(reason) => reason,
            Decision::Continue => {
                return Err(Error::NotFinished {
                    rounds: state.loop_count(),
                });
            }
        };

        let round = state.loop_count();
        let report = self
            .collaborators
            .finalizer
            .finalize(state.running_summary(), state.sources())
            .await
            .map_err(|e| self.fail(round, Step::Finalize, e))?;

        state.finalize(reason, report);
        info!(rounds = round, stop_reason = %reason, sources = state.sources().len(), "research finalized");
        self.emit(ResearchEvent::Finalized {
            rounds: round,
            stop_reason: reason,
        });
        Ok(())
    }
}
