//! LLM-backed collaborators.
//!
//! The query generator, summarizer and reflector all prompt a [`ChatModel`]
//! and turn the reply into a typed step output. [`OpenAiChat`] talks to any
//! OpenAI-compatible `/chat/completions` endpoint.

mod client;
mod parse;
mod prompt;
mod query;
mod reflect;
mod summarize;

pub use client::OpenAiChat;
pub use parse::{extract_json, strip_thinking};
pub use query::LlmQueryGenerator;
pub use reflect::LlmReflector;
pub use summarize::{LlmSummarizer, format_sources};

use crate::steps::StepResult;
use async_trait::async_trait;
use std::sync::Arc;

/// A chat model that answers a system + user prompt pair with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> StepResult<String>;
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for Arc<M> {
    async fn complete(&self, system: &str, user: &str) -> StepResult<String> {
        (**self).complete(system, user).await
    }
}

/// Query used whenever a model reply can't be parsed.
pub(crate) fn fallback_query(topic: &str) -> String {
    format!("Tell me more about {}", topic)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::CollaboratorError;
    use std::sync::Mutex;

    /// Replies with canned answers in order and records every prompt.
    pub struct ScriptedModel {
        replies: Mutex<Vec<String>>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedModel {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn last_user_prompt(&self) -> String {
            self.prompts
                .lock()
                .unwrap()
                .last()
                .map(|(_, user)| user.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, system: &str, user: &str) -> StepResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CollaboratorError::Other("no scripted reply left".to_string()))
        }
    }
}
