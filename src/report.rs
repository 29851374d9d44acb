//! Markdown report as a [`Finalizer`].

use crate::steps::{Document, Finalizer, StepResult};
use async_trait::async_trait;

/// Formats the final summary followed by a bullet list of sources.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFinalizer;

impl MarkdownFinalizer {
    pub fn render(running_summary: &str, sources: &[Document]) -> String {
        let mut report = format!("## Summary\n\n{}\n\n### Sources:\n", running_summary.trim());
        for doc in sources {
            match &doc.title {
                Some(title) => report.push_str(&format!("* {} : {}\n", title, doc.origin)),
                None => report.push_str(&format!("* {}\n", doc.origin)),
            }
        }
        report
    }
}

#[async_trait]
impl Finalizer for MarkdownFinalizer {
    async fn finalize(&self, running_summary: &str, sources: &[Document]) -> StepResult<String> {
        Ok(Self::render(running_summary, sources))
    }
}
