//! Pulling structured data out of free-form model replies.

use crate::error::CollaboratorError;
use crate::steps::StepResult;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

// Reasoning models wrap their chain of thought in <think> tags
static THINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

// ```json ... ``` or bare ``` ... ``` fences
static FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)```").unwrap());

/// Remove `<think>...</think>` blocks and surrounding whitespace.
pub fn strip_thinking(text: &str) -> String {
    THINK_REGEX.replace_all(text, "").trim().to_string()
}

/// Find the JSON object in a reply: a fenced block if present, else the
/// span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let candidate = FENCE_REGEX
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    (start < end).then(|| &candidate[start..=end])
}

/// Parse a reply into `T` after checking it against a JSON schema.
pub(crate) fn parse_structured<T: DeserializeOwned>(text: &str, schema: &Value) -> StepResult<T> {
    let cleaned = strip_thinking(text);
    let json = extract_json(&cleaned)
        .ok_or_else(|| CollaboratorError::InvalidResponse("no JSON object in reply".to_string()))?;
    let value: Value = serde_json::from_str(json)?;

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| CollaboratorError::Other(format!("invalid schema: {}", e)))?;
    if !validator.is_valid(&value) {
        return Err(CollaboratorError::InvalidResponse(format!(
            "reply does not match schema: {}",
            value
        )));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        query: String,
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string", "minLength": 1 } },
            "required": ["query"]
        })
    }

    #[test]
    fn test_strip_thinking() {
        let text = "<think>\nlet me see\n</think>\n\nThe answer.";
        assert_eq!(strip_thinking(text), "The answer.");
    }

    #[test]
    fn test_strip_multiple_think_blocks() {
        let text = "<think>a</think>one <think>b</think>two";
        assert_eq!(strip_thinking(text), "one two");
    }

    #[test]
    fn test_extract_json_bare() {
        let text = r#"Sure! {"query": "rust async"} hope that helps"#;
        assert_eq!(extract_json(text), Some(r#"{"query": "rust async"}"#));
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here:\n```json\n{\"query\": \"a\"}\n```\nand {not this}";
        assert_eq!(extract_json(text), Some("{\"query\": \"a\"}"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_structured() {
        let reply: Reply =
            parse_structured("<think>hmm</think>{\"query\": \"tokio\"}", &schema()).unwrap();
        assert_eq!(
            reply,
            Reply {
                query: "tokio".to_string()
            }
        );
    }

    #[test]
    fn test_parse_structured_schema_mismatch() {
        let result: StepResult<Reply> = parse_structured(r#"{"query": ""}"#, &schema());
        assert!(matches!(result, Err(CollaboratorError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_structured_bad_json() {
        let result: StepResult<Reply> = parse_structured("{query: tokio}", &schema());
        assert!(matches!(result, Err(CollaboratorError::Json(_))));
    }
}
