// Structured calls: typed model output, with best-effort recovery of truncated answers

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::llm::{Completion, CompletionRequest, FinishReason, LanguageModel};
use crate::error::{LlmError, LlmResult};
use crate::metrics;
use crate::models::{Feedback, Queries, SectionContent, Sections};

/// A record the model can be asked to produce.
pub trait StructuredSchema: DeserializeOwned + Default + Send {
    const NAME: &'static str;

    fn json_schema() -> Value;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Degraded<T> {
    Complete(T),
    Partial { value: T, reason: String },
}

impl<T> Degraded<T> {
    pub fn is_partial(&self) -> bool {
        matches!(self, Degraded::Partial { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Degraded::Complete(value) | Degraded::Partial { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Degraded::Complete(value) | Degraded::Partial { value, .. } => value,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Degraded::Complete(_) => None,
            Degraded::Partial { reason, .. } => Some(reason),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Degraded<U> {
        match self {
            Degraded::Complete(value) => Degraded::Complete(f(value)),
            Degraded::Partial { value, reason } => Degraded::Partial {
                value: f(value),
                reason,
            },
        }
    }
}

/// Runs `call` and turns its completion into a typed record.
///
/// A length-truncated completion never fails: `extract_partial` builds the
/// best record it can from the cut-off text. A complete answer must parse
/// as `T`.
pub async fn call_with_degradation<T, F, Fut, X>(
    schema: &'static str,
    call: F,
    extract_partial: X,
) -> LlmResult<Degraded<T>>
where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = LlmResult<Completion>>,
    X: FnOnce(&str) -> T,
{
    let completion = call().await?;

    if let Some(refusal) = completion.refusal {
        return Err(LlmError::Refused(refusal));
    }

    match completion.finish_reason {
        FinishReason::Length => {
            let reason = format!("{} response exceeded the token limit and was truncated", schema);
            Ok(Degraded::Partial {
                value: extract_partial(&completion.content),
                reason,
            })
        }
        FinishReason::ContentFilter => Err(LlmError::Refused(format!(
            "{} response was stopped by the content filter",
            schema
        ))),
        FinishReason::Stop | FinishReason::Other(_) => {
            let body = strip_code_fence(&completion.content);
            serde_json::from_str(body)
                .map(Degraded::Complete)
                .map_err(|source| LlmError::Schema { schema, source })
        }
    }
}

/// Typed front for a [`LanguageModel`].
#[derive(Clone)]
pub struct StructuredCaller {
    model: Arc<dyn LanguageModel>,
}

impl StructuredCaller {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn call<T: StructuredSchema>(&self, instruction: String) -> LlmResult<Degraded<T>> {
        let request = CompletionRequest {
            system: instruction,
            schema_name: T::NAME,
            schema: T::json_schema(),
        };

        let result = call_with_degradation(T::NAME, || self.model.complete(request), parse_partial::<T>).await;

        match &result {
            Ok(Degraded::Complete(_)) => {
                metrics::LLM_CALLS.with_label_values(&[T::NAME, "complete"]).inc();
            }
            Ok(Degraded::Partial { reason, .. }) => {
                metrics::LLM_CALLS.with_label_values(&[T::NAME, "partial"]).inc();
                warn!(schema = T::NAME, model = self.model.model(), "{}", reason);
            }
            Err(e) => {
                metrics::LLM_CALLS.with_label_values(&[T::NAME, "error"]).inc();
                error!(
                    schema = T::NAME,
                    provider = self.model.name(),
                    model = self.model.model(),
                    "Model call failed: {}",
                    e
                );
            }
        }

        result
    }
}

/// Recovers what it can from truncated JSON; falls back to `T::default()`.
/// Fields the cut-off text never reached are filled with empty values from
/// the schema, so only this path is lenient.
pub fn parse_partial<T: StructuredSchema>(raw: &str) -> T {
    let body = strip_code_fence(raw);
    let schema = T::json_schema();

    let recover = |prefix: &str| -> Option<T> {
        let mut value: Value = serde_json::from_str(&close_json(prefix)).ok()?;
        fill_missing(&mut value, &schema);
        serde_json::from_value(value).ok()
    };

    if let Some(value) = recover(body) {
        return value;
    }

    // Walk back to earlier value boundaries until something parses.
    for cut in boundaries(body).into_iter().rev() {
        if let Some(value) = recover(&body[..cut]) {
            return value;
        }
    }

    T::default()
}

/// Inserts an empty value for every schema property absent from `value`.
fn fill_missing(value: &mut Value, schema: &Value) {
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let (Some(object), Some(properties)) = (
                value.as_object_mut(),
                schema.get("properties").and_then(Value::as_object),
            ) else {
                return;
            };
            for (key, property) in properties {
                let field = object.entry(key.clone()).or_insert_with(|| empty_value(property));
                fill_missing(field, property);
            }
        }
        Some("array") => {
            if let (Some(items), Some(item_schema)) = (value.as_array_mut(), schema.get("items")) {
                for item in items {
                    fill_missing(item, item_schema);
                }
            }
        }
        _ => {}
    }
}

/// First enum member, else the zero value of the schema type.
fn empty_value(schema: &Value) -> Value {
    if let Some(first) = schema.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return first.clone();
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => json!({}),
        Some("array") => json!([]),
        Some("boolean") => Value::Bool(false),
        Some("integer") | Some("number") => json!(0),
        _ => Value::String(String::new()),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}

/// Appends whatever closes an unterminated string, object or array.
fn close_json(prefix: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in prefix.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = prefix.trim_end().to_string();
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    } else {
        let trimmed = out.trim_end_matches([',', ':', ' ', '\n', '\t', '\r']).len();
        out.truncate(trimmed);
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Byte offsets at which the text ends on a complete value: each comma
/// outside a string and just after each closing bracket.
fn boundaries(raw: &str) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ',' => cuts.push(i),
            '}' | ']' => cuts.push(i + 1),
            _ => {}
        }
    }
    cuts
}

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn query_array(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": {
            "type": "object",
            "properties": {
                "search_query": { "type": "string", "description": "Query for web search." }
            },
            "required": ["search_query"],
            "additionalProperties": false
        }
    })
}

impl StructuredSchema for Queries {
    const NAME: &'static str = "queries";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "queries": query_array("List of search queries.") },
            "required": ["queries"],
            "additionalProperties": false
        })
    }
}

impl StructuredSchema for Sections {
    const NAME: &'static str = "sections";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "sections": {
                    "type": "array",
                    "description": "Sections of the report.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "description": "Section name" },
                            "description": { "type": "string", "description": "Overview of section topics" },
                            "research": { "type": "boolean", "description": "Research required flag" },
                            "content": { "type": "string", "description": "Section content" }
                        },
                        "required": ["name", "description", "research", "content"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["sections"],
            "additionalProperties": false
        })
    }
}

impl StructuredSchema for SectionContent {
    const NAME: &'static str = "section_content";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Written content for the section" },
                "key_points": string_array()
            },
            "required": ["content", "key_points"],
            "additionalProperties": false
        })
    }
}

impl StructuredSchema for Feedback {
    const NAME: &'static str = "feedback";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "grade": {
                    "type": "string",
                    "enum": ["pass", "fail"],
                    "description": "Whether the section meets requirements ('pass') or needs revision ('fail')."
                },
                "follow_up_queries": query_array("List of follow-up search queries.")
            },
            "required": ["grade", "follow_up_queries"],
            "additionalProperties": false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, SearchQuery};

    #[tokio::test]
    async fn complete_answer_parses() {
        let result: Degraded<Queries> = call_with_degradation(
            "queries",
            || async { Ok(Completion::stop(r#"{"queries":[{"search_query":"qubits"}]}"#)) },
            parse_partial::<Queries>,
        )
        .await
        .unwrap();

        assert!(!result.is_partial());
        assert_eq!(result.into_inner().queries, vec![SearchQuery::new("qubits")]);
    }

    #[tokio::test]
    async fn truncated_answer_degrades_with_warning() {
        let result: Degraded<SectionContent> = call_with_degradation(
            "section_content",
            || async { Ok(Completion::truncated(r###"{"content":"## Core Concepts\n\nQubits are"###)) },
            parse_partial::<SectionContent>,
        )
        .await
        .unwrap();

        assert!(result.is_partial());
        assert!(result.warning().unwrap().contains("truncated"));
        assert_eq!(result.value().content, "## Core Concepts\n\nQubits are");
    }

    #[tokio::test]
    async fn unparseable_complete_answer_is_a_schema_error() {
        let result: LlmResult<Degraded<Feedback>> = call_with_degradation(
            "feedback",
            || async { Ok(Completion::stop("not json at all")) },
            parse_partial::<Feedback>,
        )
        .await;

        assert!(matches!(result, Err(LlmError::Schema { schema: "feedback", .. })));
    }

    #[tokio::test]
    async fn complete_answer_missing_required_fields_is_a_schema_error() {
        let result: LlmResult<Degraded<Feedback>> = call_with_degradation(
            "feedback",
            || async { Ok(Completion::stop(r#"{"verdict":"fail"}"#)) },
            parse_partial::<Feedback>,
        )
        .await;
        assert!(matches!(result, Err(LlmError::Schema { schema: "feedback", .. })));

        let result: LlmResult<Degraded<Sections>> = call_with_degradation(
            "sections",
            || async { Ok(Completion::stop("{}")) },
            parse_partial::<Sections>,
        )
        .await;
        assert!(matches!(result, Err(LlmError::Schema { schema: "sections", .. })));
    }

    #[test]
    fn truncated_grade_without_verdict_reads_as_pass() {
        let feedback: Feedback = parse_partial(r#"{"follow_up_queries":[{"search_query":"qubit deco"#);
        assert_eq!(feedback.grade, Grade::Pass);
        assert_eq!(feedback.follow_up_queries, vec![SearchQuery::new("qubit deco")]);
    }

    #[test]
    fn truncated_plan_fills_fields_it_never_reached() {
        let sections: Sections = parse_partial(r#"{"sections":[{"name":"Core Concepts","descr"#);
        assert_eq!(sections.sections.len(), 1);
        assert_eq!(sections.sections[0].name, "Core Concepts");
        assert!(!sections.sections[0].requires_research);
    }

    #[tokio::test]
    async fn refusal_is_an_error() {
        let result: LlmResult<Degraded<Queries>> = call_with_degradation(
            "queries",
            || async {
                Ok(Completion {
                    content: String::new(),
                    finish_reason: FinishReason::Stop,
                    refusal: Some("no".to_string()),
                })
            },
            parse_partial::<Queries>,
        )
        .await;

        assert!(matches!(result, Err(LlmError::Refused(_))));
    }

    #[test]
    fn partial_drops_the_incomplete_trailing_item() {
        let raw = r#"{"queries":[{"search_query":"one"},{"search_query":"tw"#;
        let queries: Queries = parse_partial(raw);
        assert_eq!(queries.queries.len(), 2);
        assert_eq!(queries.queries[0].text, "one");
        assert_eq!(queries.queries[1].text, "tw");

        let raw = r#"{"queries":[{"search_query":"one"},{"search_"#;
        let queries: Queries = parse_partial(raw);
        assert_eq!(queries.queries.len(), 1);
    }

    #[test]
    fn partial_feedback_keeps_grade() {
        let raw = r#"{"grade":"fail","follow_up_queries":[{"search_query":"error correction"#;
        let feedback: Feedback = parse_partial(raw);
        assert_eq!(feedback.grade, Grade::Fail);
        assert_eq!(feedback.follow_up_queries.len(), 1);
    }

    #[test]
    fn hopeless_partial_falls_back_to_default() {
        let sections: Sections = parse_partial("garbage");
        assert!(sections.sections.is_empty());
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence(" {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn dangling_escape_is_dropped() {
        assert_eq!(close_json(r#"{"content":"a\"#), r#"{"content":"a"}"#);
    }
}
