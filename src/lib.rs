//! Refiner - iterative research-and-refine loop
//!
//! Refiner starts from a topic and repeats a fixed round: generate a search
//! query, retrieve web documents, fold them into a running summary, and
//! reflect on whether a knowledge gap remains. A pure router stops the loop
//! once the reflector finds no gap or the configured loop bound is reached,
//! and a finalizer turns the summary and the de-duplicated sources into a
//! report.
//!
//! Every step is a trait ([`QueryGenerator`], [`WebResearcher`],
//! [`Summarizer`], [`Reflector`], [`Finalizer`]), so the controller can be
//! driven by LLM-backed adapters or by anything else.
//!
//! # Quick Start
//!
//! ```ignore
//! use refiner::{Collaborators, Controller, ResearchConfig};
//! use refiner::llm::{LlmQueryGenerator, LlmReflector, LlmSummarizer, OpenAiChat};
//! use refiner::{ExaSearch, MarkdownFinalizer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> refiner::Result<()> {
//!     let config = ResearchConfig::new("gpt-4o-mini").max_loops(3);
//!     let chat = Arc::new(OpenAiChat::from_config(&config, std::env::var("LLM_API_KEY").ok()));
//!
//!     let controller = Controller::new(
//!         config.clone(),
//!         Collaborators::new(
//!             LlmQueryGenerator::new(chat.clone()),
//!             ExaSearch::from_env(&config)?,
//!             LlmSummarizer::new(chat.clone()),
//!             LlmReflector::new(chat),
//!             MarkdownFinalizer,
//!         ),
//!     )
//!     .verbose(true);
//!
//!     let state = controller.run("quantum error correction").await?;
//!     println!("{}", state.report().unwrap_or_default());
//!     Ok(())
//! }
//! ```

mod controller;
mod error;
pub mod llm;
mod report;
pub mod router;
mod search;
mod state;
mod steps;

pub use controller::{
    Collaborators, Controller, DEFAULT_BASE_URL, DEFAULT_MAX_LOOPS, DEFAULT_MODEL, EventCallback,
    ResearchCallbacks, ResearchConfig, ResearchEvent, progress_callbacks,
};
pub use error::{CollaboratorError, Error, Result};
pub use report::MarkdownFinalizer;
pub use router::{Decision, decide};
pub use search::ExaSearch;
pub use state::{Phase, ResearchState, StopReason};
pub use steps::{
    Document, Finalizer, QueryGenOutput, QueryGenerator, ReflectOutput, Reflector, Step,
    StepResult, SummarizeOutput, Summarizer, WebResearchOutput, WebResearcher,
};
