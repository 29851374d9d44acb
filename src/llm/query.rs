use super::parse::parse_structured;
use super::prompt::{QUERY_WRITER, render};
use super::{ChatModel, fallback_query};
use crate::steps::{QueryGenOutput, QueryGenerator, StepResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

#[derive(Deserialize)]
struct QueryReply {
    query: String,
    #[serde(default)]
    rationale: Option<String>,
}

fn query_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "minLength": 1 },
            "rationale": { "type": "string" }
        },
        "required": ["query"]
    })
}

/// Query generator backed by a chat model.
pub struct LlmQueryGenerator<M> {
    model: M,
}

impl<M: ChatModel> LlmQueryGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: ChatModel> QueryGenerator for LlmQueryGenerator<M> {
    async fn generate_query(
        &self,
        topic: &str,
        running_summary: &str,
    ) -> StepResult<QueryGenOutput> {
        let system = render(QUERY_WRITER, topic);
        let user = if running_summary.is_empty() {
            "Generate a query for web search:".to_string()
        } else {
            format!(
                "<summary>\n{}\n</summary>\n\nGenerate a query for web search that goes beyond this summary:",
                running_summary
            )
        };

        let reply = self.model.complete(&system, &user).await?;
        match parse_structured::<QueryReply>(&reply, &query_schema()) {
            Ok(parsed) if !parsed.query.trim().is_empty() => Ok(QueryGenOutput {
                query: parsed.query.trim().to_string(),
                rationale: parsed.rationale.filter(|r| !r.trim().is_empty()),
            }),
            Ok(_) => Ok(QueryGenOutput::new(fallback_query(topic))),
            Err(e) => {
                warn!(error = %e, "unparsable query reply, using fallback");
                Ok(QueryGenOutput::new(fallback_query(topic)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_parses_query_and_rationale() {
        let model = ScriptedModel::new(&[
            r#"<think>ok</think>{"query": "surface code threshold", "rationale": "core concept"}"#,
        ]);
        let generator = LlmQueryGenerator::new(model);

        let output = generator
            .generate_query("quantum error correction", "")
            .await
            .unwrap();

        assert_eq!(output.query, "surface code threshold");
        assert_eq!(output.rationale.as_deref(), Some("core concept"));
    }

    #[tokio::test]
    async fn test_falls_back_on_garbage() {
        let generator = LlmQueryGenerator::new(ScriptedModel::new(&["I cannot do that"]));

        let output = generator.generate_query("rust", "").await.unwrap();

        assert_eq!(output.query, "Tell me more about rust");
        assert_eq!(output.rationale, None);
    }

    #[tokio::test]
    async fn test_summary_included_in_prompt() {
        let model = Arc::new(ScriptedModel::new(&[r#"{"query": "q"}"#]));
        let generator = LlmQueryGenerator::new(model.clone());

        generator.generate_query("rust", "known facts").await.unwrap();

        assert!(model.last_user_prompt().contains("known facts"));
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("rust"));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let generator = LlmQueryGenerator::new(ScriptedModel::new(&[]));
        assert!(generator.generate_query("rust", "").await.is_err());
    }
}
