//! Prompt templates for the LLM collaborators.

/// System prompt for the query generator. `{topic}` is replaced.
pub const QUERY_WRITER: &str = r#"Your goal is to write one targeted web search query.

<topic>
{topic}
</topic>

<format>
Reply with a JSON object and nothing else:
{
    "query": "the search query",
    "rationale": "why this query helps answer the topic"
}
</format>

<rules>
- Keep the query short and specific, like something typed into a search engine
- If a summary of earlier research is given, target what it does not cover yet
</rules>
"#;

/// System prompt for the summarizer.
pub const SUMMARIZER: &str = r#"You write and extend research summaries from web search results.

<rules>
- When creating a new summary, lead with the information most relevant to the topic
- When extending an existing summary, keep everything it already says and fold the new
  information in where it belongs; add new paragraphs only for genuinely new material
- Skip search results that are not relevant to the topic
- Do not add a title, preamble, or list of references
- Reply with the summary text only
</rules>
"#;

/// System prompt for the reflector. `{topic}` is replaced.
pub const REFLECTOR: &str = r#"You review a research summary about the following topic and decide whether it
still has a knowledge gap.

<topic>
{topic}
</topic>

<format>
Reply with a JSON object and nothing else:
{
    "has_gap": true,
    "knowledge_gap": "what is missing or unclear",
    "follow_up_query": "a self-contained web search query that would fill the gap"
}
Set "has_gap" to false when the summary answers the topic well; the other fields may
then be empty strings.
</format>
"#;

/// Render a template by replacing `{topic}`.
pub fn render(template: &str, topic: &str) -> String {
    template.replace("{topic}", topic)
}
