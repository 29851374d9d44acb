//! Collaborator contracts.
//!
//! Each step of a round is delegated to an external collaborator. The
//! controller only depends on these traits and on the closed set of output
//! records below; how a collaborator reasons (LLM prompt, search provider)
//! is its own business.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type returned by collaborators.
pub type StepResult<T> = std::result::Result<T, CollaboratorError>;

/// The step a collaborator call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    GenerateQuery,
    WebResearch,
    Summarize,
    Reflect,
    Finalize,
}

impl Step {
    /// Human-readable collaborator name.
    pub fn name(&self) -> &'static str {
        match self {
            Step::GenerateQuery => "query generator",
            Step::WebResearch => "web researcher",
            Step::Summarize => "summarizer",
            Step::Reflect => "reflector",
            Step::Finalize => "finalizer",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A retrieved evidence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// De-duplication key
    pub id: String,
    /// Where the content came from (usually a URL)
    pub origin: String,
    /// Retrieved text
    pub content: String,
    /// Optional display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            content: content.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Output of the query generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryGenOutput {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl QueryGenOutput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            rationale: None,
        }
    }
}

/// Output of the web researcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResearchOutput {
    pub documents: Vec<Document>,
}

/// Output of the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeOutput {
    pub summary: String,
}

/// Output of the reflector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectOutput {
    /// Whether the summary still leaves the topic unanswered
    pub has_gap: bool,
    /// Suggested next search query, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_query: Option<String>,
    /// Short description of what is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_gap: Option<String>,
}

impl ReflectOutput {
    /// A gap was found; research should go on with `follow_up`.
    pub fn gap(follow_up: impl Into<String>) -> Self {
        Self {
            has_gap: true,
            follow_up_query: Some(follow_up.into()),
            knowledge_gap: None,
        }
    }

    /// The summary answers the topic.
    pub fn complete() -> Self {
        Self {
            has_gap: false,
            follow_up_query: None,
            knowledge_gap: None,
        }
    }

    /// Follow-up query to use for the next round, ignoring blanks and
    /// suggestions attached to a "no gap" verdict.
    pub fn next_query(&self) -> Option<&str> {
        if !self.has_gap {
            return None;
        }
        self.follow_up_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Produces a search query from the topic and the summary so far.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate_query(&self, topic: &str, running_summary: &str)
    -> StepResult<QueryGenOutput>;
}

/// Executes a query against a search provider.
#[async_trait]
pub trait WebResearcher: Send + Sync {
    async fn research(&self, query: &str) -> StepResult<WebResearchOutput>;
}

/// Folds newly fetched documents into the running summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        topic: &str,
        running_summary: &str,
        documents: &[Document],
    ) -> StepResult<SummarizeOutput>;
}

/// Judges whether the running summary still has a knowledge gap.
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn reflect(&self, topic: &str, running_summary: &str) -> StepResult<ReflectOutput>;
}

/// Formats the final summary and sources into a report.
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, running_summary: &str, sources: &[Document]) -> StepResult<String>;
}
