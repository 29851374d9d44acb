//! Research run configuration.

use crate::error::{Error, Result};

/// Default upper bound on research rounds.
pub const DEFAULT_MAX_LOOPS: usize = 3;

/// Default chat model for the LLM-backed collaborators.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Configuration for a research run.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Maximum number of rounds (query, search, summarize, reflect)
    pub max_loops: usize,
    /// The model used by the LLM collaborators
    pub model: String,
    /// Base URL of the OpenAI-compatible chat endpoint
    pub base_url: String,
    /// Temperature for LLM sampling
    pub temperature: Option<f32>,
    /// Maximum tokens for LLM responses
    pub max_tokens: Option<u32>,
    /// Search results requested per query
    pub num_results: u32,
    /// Characters of page text kept per search result
    pub max_source_chars: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_loops: DEFAULT_MAX_LOOPS,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: Some(0.0),
            max_tokens: Some(2048),
            num_results: 3,
            max_source_chars: 2000,
        }
    }
}

impl ResearchConfig {
    /// Create a new config with the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Read overrides from the process environment.
    ///
    /// Recognised variables: `MAX_WEB_RESEARCH_LOOPS`, `LLM_MODEL`,
    /// `LLM_BASE_URL`, `LLM_TEMPERATURE`, `SEARCH_NUM_RESULTS`,
    /// `MAX_SOURCE_CHARS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ResearchConfig::from_env`], reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("MAX_WEB_RESEARCH_LOOPS") {
            config.max_loops = parse_var("MAX_WEB_RESEARCH_LOOPS", &v)?;
        }
        if let Some(v) = lookup("LLM_MODEL") {
            config.model = v;
        }
        if let Some(v) = lookup("LLM_BASE_URL") {
            config.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("LLM_TEMPERATURE") {
            config.temperature = Some(parse_var("LLM_TEMPERATURE", &v)?);
        }
        if let Some(v) = lookup("SEARCH_NUM_RESULTS") {
            config.num_results = parse_var("SEARCH_NUM_RESULTS", &v)?;
        }
        if let Some(v) = lookup("MAX_SOURCE_CHARS") {
            config.max_source_chars = parse_var("MAX_SOURCE_CHARS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.max_loops < 1 {
            return Err(Error::Config(format!(
                "max_loops must be at least 1, got {}",
                self.max_loops
            )));
        }
        if self.num_results < 1 {
            return Err(Error::Config("num_results must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Set the maximum number of rounds.
    pub fn max_loops(mut self, n: usize) -> Self {
        self.max_loops = n;
        self
    }

    /// Set the chat endpoint base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Set the number of search results per query.
    pub fn num_results(mut self, n: u32) -> Self {
        self.num_results = n;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.max_loops, DEFAULT_MAX_LOOPS);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_env_overrides() {
        let config = ResearchConfig::from_lookup(lookup(&[
            ("MAX_WEB_RESEARCH_LOOPS", "5"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("LLM_BASE_URL", "http://localhost:11434/v1/"),
            ("LLM_TEMPERATURE", "0.3"),
        ]))
        .unwrap();

        assert_eq!(config.max_loops, 5);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.temperature, Some(0.3));
    }

    #[test]
    fn test_zero_loops_rejected() {
        let result = ResearchConfig::from_lookup(lookup(&[("MAX_WEB_RESEARCH_LOOPS", "0")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let result = ResearchConfig::from_lookup(lookup(&[("MAX_WEB_RESEARCH_LOOPS", "many")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder() {
        let config = ResearchConfig::new("m").max_loops(7).num_results(5);
        assert_eq!(config.model, "m");
        assert_eq!(config.max_loops, 7);
        assert_eq!(config.num_results, 5);
        assert!(config.validate().is_ok());
    }
}
