use super::ChatModel;
use super::parse::strip_thinking;
use super::prompt::SUMMARIZER;
use crate::error::CollaboratorError;
use crate::steps::{Document, StepResult, SummarizeOutput, Summarizer};
use async_trait::async_trait;

/// Render documents as the context block handed to the summarizer.
pub fn format_sources(documents: &[Document]) -> String {
    let mut out = String::from("Sources:\n\n");
    for doc in documents {
        let title = doc.title.as_deref().unwrap_or(&doc.origin);
        out.push_str(&format!("Source: {}\n===\n", title));
        out.push_str(&format!("URL: {}\n===\n", doc.origin));
        out.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            doc.content
        ));
    }
    out
}

/// Summarizer backed by a chat model.
pub struct LlmSummarizer<M> {
    model: M,
}

impl<M: ChatModel> LlmSummarizer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: ChatModel> Summarizer for LlmSummarizer<M> {
    async fn summarize(
        &self,
        topic: &str,
        running_summary: &str,
        documents: &[Document],
    ) -> StepResult<SummarizeOutput> {
        let context = format_sources(documents);
        let user = if running_summary.is_empty() {
            format!(
                "<context>\n{}\n</context>\n\nCreate a summary using the context on this topic:\n<topic>\n{}\n</topic>",
                context, topic
            )
        } else {
            format!(
                "<existing_summary>\n{}\n</existing_summary>\n\n<new_context>\n{}\n</new_context>\n\nUpdate the existing summary with the new context on this topic:\n<topic>\n{}\n</topic>",
                running_summary, context, topic
            )
        };

        let reply = self.model.complete(SUMMARIZER, &user).await?;
        let summary = strip_thinking(&reply);
        if summary.is_empty() {
            return Err(CollaboratorError::EmptyOutput("summary"));
        }
        Ok(SummarizeOutput { summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use std::sync::Arc;

    fn docs() -> Vec<Document> {
        vec![
            Document::new("u1", "https://a.test", "alpha").with_title("Alpha"),
            Document::new("u2", "https://b.test", "beta"),
        ]
    }

    #[test]
    fn test_format_sources() {
        let text = format_sources(&docs());

        assert!(text.starts_with("Sources:\n\n"));
        assert!(text.contains("Source: Alpha\n===\nURL: https://a.test\n==="));
        assert!(text.contains("Source: https://b.test\n"));
        assert!(text.contains("Most relevant content from source: beta"));
    }

    #[tokio::test]
    async fn test_first_summary_prompt() {
        let model = Arc::new(ScriptedModel::new(&["<think>x</think>\nAlpha and beta."]));
        let summarizer = LlmSummarizer::new(model.clone());

        let output = summarizer.summarize("greek", "", &docs()).await.unwrap();

        assert_eq!(output.summary, "Alpha and beta.");
        let prompt = model.last_user_prompt();
        assert!(prompt.contains("Create a summary"));
        assert!(!prompt.contains("existing_summary"));
    }

    #[tokio::test]
    async fn test_extends_existing_summary() {
        let model = Arc::new(ScriptedModel::new(&["Old and new."]));
        let summarizer = LlmSummarizer::new(model.clone());

        summarizer.summarize("greek", "Old.", &docs()).await.unwrap();

        let prompt = model.last_user_prompt();
        assert!(prompt.contains("<existing_summary>\nOld.\n</existing_summary>"));
        assert!(prompt.contains("https://b.test"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_error() {
        let summarizer = LlmSummarizer::new(ScriptedModel::new(&["<think>only thoughts</think>"]));

        let result = summarizer.summarize("greek", "", &docs()).await;
        assert!(matches!(result, Err(CollaboratorError::EmptyOutput("summary"))));
    }
}
