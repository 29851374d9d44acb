//! Research events and callbacks for observability.

use crate::router::Decision;
use crate::state::StopReason;
use crate::steps::Step;
use std::sync::{Arc, Mutex};

/// Events emitted while a research run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchEvent {
    /// Starting a new round
    RoundStart { round: usize, max_loops: usize },
    /// A search query was chosen for the round
    QueryGenerated {
        round: usize,
        query: String,
        /// The query came from the previous reflection, not the generator
        from_reflection: bool,
    },
    /// The web researcher returned documents
    DocumentsFetched { round: usize, count: usize },
    /// The summarizer produced a new running summary
    SummaryUpdated { round: usize, summary_chars: usize },
    /// The reflector judged the summary
    Reflected {
        round: usize,
        has_gap: bool,
        follow_up_query: Option<String>,
    },
    /// The round was committed to the state
    RoundComplete {
        round: usize,
        new_sources: usize,
        total_sources: usize,
    },
    /// The router decided what comes next
    Routed { round: usize, decision: Decision },
    /// The finalizer produced the report
    Finalized { rounds: usize, stop_reason: StopReason },
    /// A collaborator failed
    Error {
        round: usize,
        step: Step,
        message: String,
    },
}

/// Type alias for event callbacks
pub type EventCallback = Arc<dyn Fn(&ResearchEvent) + Send + Sync>;

/// Storage for research callbacks
#[derive(Default, Clone)]
pub struct ResearchCallbacks {
    pub on_round_start: Option<EventCallback>,
    pub on_query_generated: Option<EventCallback>,
    pub on_documents_fetched: Option<EventCallback>,
    pub on_summary_updated: Option<EventCallback>,
    pub on_reflected: Option<EventCallback>,
    pub on_round_complete: Option<EventCallback>,
    pub on_routed: Option<EventCallback>,
    pub on_finalized: Option<EventCallback>,
    pub on_error: Option<EventCallback>,
    /// Catch-all callback for any event
    pub on_event: Option<EventCallback>,
    pub(crate) captured_events: Option<Arc<Mutex<Vec<ResearchEvent>>>>,
}

impl ResearchCallbacks {
    /// Emit an event to the appropriate callback(s)
    pub fn emit(&self, event: &ResearchEvent) {
        if let Some(ref events) = self.captured_events
            && let Ok(mut events) = events.lock()
        {
            events.push(event.clone());
        }

        let specific = match event {
            ResearchEvent::RoundStart { .. } => &self.on_round_start,
            ResearchEvent::QueryGenerated { .. } => &self.on_query_generated,
            ResearchEvent::DocumentsFetched { .. } => &self.on_documents_fetched,
            ResearchEvent::SummaryUpdated { .. } => &self.on_summary_updated,
            ResearchEvent::Reflected { .. } => &self.on_reflected,
            ResearchEvent::RoundComplete { .. } => &self.on_round_complete,
            ResearchEvent::Routed { .. } => &self.on_routed,
            ResearchEvent::Finalized { .. } => &self.on_finalized,
            ResearchEvent::Error { .. } => &self.on_error,
        };

        if let Some(cb) = specific {
            cb(event);
        }

        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}

/// Callbacks that print round-by-round progress to stdout.
pub fn progress_callbacks() -> ResearchCallbacks {
    ResearchCallbacks {
        on_round_start: Some(Arc::new(|e| {
            if let ResearchEvent::RoundStart { round, max_loops } = e {
                println!("\n[round {}/{}]", round, max_loops);
            }
        })),
        on_query_generated: Some(Arc::new(|e| {
            if let ResearchEvent::QueryGenerated {
                query,
                from_reflection,
                ..
            } = e
            {
                let origin = if *from_reflection { "follow-up" } else { "generated" };
                println!("  query ({}): {}", origin, query);
            }
        })),
        on_documents_fetched: Some(Arc::new(|e| {
            if let ResearchEvent::DocumentsFetched { count, .. } = e {
                println!("  fetched {} document(s)", count);
            }
        })),
        on_summary_updated: Some(Arc::new(|e| {
            if let ResearchEvent::SummaryUpdated { summary_chars, .. } = e {
                println!("  summary updated ({} chars)", summary_chars);
            }
        })),
        on_reflected: Some(Arc::new(|e| {
            if let ResearchEvent::Reflected {
                has_gap,
                follow_up_query,
                ..
            } = e
            {
                match (has_gap, follow_up_query) {
                    (true, Some(q)) => println!("  knowledge gap, follow-up: {}", q),
                    (true, None) => println!("  knowledge gap"),
                    (false, _) => println!("  no further gap"),
                }
            }
        })),
        on_routed: Some(Arc::new(|e| {
            if let ResearchEvent::Routed { decision, .. } = e {
                match decision {
                    Decision::Continue => println!("  -> more research"),
                    Decision::Finalize(reason) => println!("  -> finalize ({})", reason),
                }
            }
        })),
        on_error: Some(Arc::new(|e| {
            if let ResearchEvent::Error {
                round,
                step,
                message,
            } = e
            {
                println!("  error in round {} ({}): {}", round, step, message);
            }
        })),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_specific_and_catch_all_callbacks() {
        let specific = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let s = specific.clone();
        let a = all.clone();
        let callbacks = ResearchCallbacks {
            on_round_start: Some(Arc::new(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })),
            on_event: Some(Arc::new(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        callbacks.emit(&ResearchEvent::RoundStart {
            round: 1,
            max_loops: 2,
        });
        callbacks.emit(&ResearchEvent::DocumentsFetched { round: 1, count: 3 });

        assert_eq!(specific.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capture() {
        let callbacks = ResearchCallbacks {
            captured_events: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Default::default()
        };

        let event = ResearchEvent::SummaryUpdated {
            round: 1,
            summary_chars: 10,
        };
        callbacks.emit(&event);

        let captured = callbacks.captured_events.unwrap();
        assert_eq!(captured.lock().unwrap().as_slice(), &[event]);
    }
}
