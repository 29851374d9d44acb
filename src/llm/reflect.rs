use super::parse::parse_structured;
use super::prompt::{REFLECTOR, render};
use super::{ChatModel, fallback_query};
use crate::steps::{ReflectOutput, Reflector, StepResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

#[derive(Deserialize)]
struct ReflectReply {
    has_gap: bool,
    #[serde(default)]
    knowledge_gap: Option<String>,
    #[serde(default)]
    follow_up_query: Option<String>,
}

fn reflect_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "has_gap": { "type": "boolean" },
            "knowledge_gap": { "type": ["string", "null"] },
            "follow_up_query": { "type": ["string", "null"] }
        },
        "required": ["has_gap"]
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reflector backed by a chat model.
///
/// A reply that can't be parsed counts as a gap with a generic follow-up
/// query; the loop bound still caps the run.
pub struct LlmReflector<M> {
    model: M,
}

impl<M: ChatModel> LlmReflector<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: ChatModel> Reflector for LlmReflector<M> {
    async fn reflect(&self, topic: &str, running_summary: &str) -> StepResult<ReflectOutput> {
        let system = render(REFLECTOR, topic);
        let user = format!(
            "<summary>\n{}\n</summary>\n\nIdentify a knowledge gap and a follow-up query:",
            running_summary
        );

        let reply = self.model.complete(&system, &user).await?;
        let output = match parse_structured::<ReflectReply>(&reply, &reflect_schema()) {
            Ok(parsed) if parsed.has_gap => ReflectOutput {
                has_gap: true,
                follow_up_query: non_blank(parsed.follow_up_query),
                knowledge_gap: non_blank(parsed.knowledge_gap),
            },
            Ok(_) => ReflectOutput::complete(),
            Err(e) => {
                warn!(error = %e, "unparsable reflection, assuming a gap");
                ReflectOutput::gap(fallback_query(topic))
            }
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    async fn reflect_on(reply: &str) -> ReflectOutput {
        let reflector = LlmReflector::new(ScriptedModel::new(&[reply]));
        reflector.reflect("x", "summary").await.unwrap()
    }

    #[tokio::test]
    async fn test_gap_with_follow_up() {
        let output = reflect_on(
            r#"{"has_gap": true, "knowledge_gap": "no details", "follow_up_query": "x details"}"#,
        )
        .await;

        assert!(output.has_gap);
        assert_eq!(output.follow_up_query.as_deref(), Some("x details"));
        assert_eq!(output.knowledge_gap.as_deref(), Some("no details"));
    }

    #[tokio::test]
    async fn test_no_gap_drops_follow_up() {
        let output =
            reflect_on(r#"{"has_gap": false, "knowledge_gap": "", "follow_up_query": "ignored"}"#)
                .await;

        assert_eq!(output, ReflectOutput::complete());
    }

    #[tokio::test]
    async fn test_blank_follow_up_becomes_none() {
        let output = reflect_on(r#"{"has_gap": true, "follow_up_query": "  "}"#).await;

        assert!(output.has_gap);
        assert_eq!(output.follow_up_query, None);
    }

    #[tokio::test]
    async fn test_garbage_assumes_gap() {
        let output = reflect_on("The summary looks fine to me.").await;

        assert!(output.has_gap);
        assert_eq!(output.next_query(), Some("Tell me more about x"));
    }

    #[tokio::test]
    async fn test_missing_has_gap_assumes_gap() {
        let output = reflect_on(r#"{"follow_up_query": "y"}"#).await;
        assert_eq!(output.next_query(), Some("Tell me more about x"));
    }
}
