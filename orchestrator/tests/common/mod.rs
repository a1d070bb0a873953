#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use research_orchestrator::agents::{
    Completion, CompletionRequest, LanguageModel, RetryPolicy, SearchProvider, SourceFetcher,
};
use research_orchestrator::error::LlmResult;
use research_orchestrator::models::SourceRecord;
use research_orchestrator::report::{GeneratorSettings, ReportGenerator};

type Responder = dyn Fn(&CompletionRequest) -> LlmResult<Completion> + Send + Sync;

/// Answers model calls from a closure and records every request.
pub struct ScriptedModel {
    responder: Box<Responder>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest) -> LlmResult<Completion> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Instructions sent for one schema, in call order.
    pub fn instructions(&self, schema: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.schema_name == schema)
            .map(|c| c.system.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<Completion> {
        self.calls.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}

/// Search provider backed by a closure; records queries.
pub struct ScriptedSearch {
    results: Box<dyn Fn(&str) -> Vec<SourceRecord> + Send + Sync>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new<F>(results: F) -> Arc<Self>
    where
        F: Fn(&str) -> Vec<SourceRecord> + Send + Sync + 'static,
    {
        Arc::new(Self {
            results: Box::new(results),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(|_| Vec::new())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search(&self, query: &str, _count: usize) -> anyhow::Result<Vec<SourceRecord>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok((self.results)(query))
    }
}

pub fn generator(
    model: Arc<ScriptedModel>,
    search: Arc<ScriptedSearch>,
    max_refinement_passes: usize,
) -> ReportGenerator {
    let provider: Arc<dyn SearchProvider> = search;
    let fetcher = SourceFetcher::new(
        provider,
        Duration::ZERO,
        RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        },
    );
    ReportGenerator::new(
        model,
        fetcher,
        GeneratorSettings {
            max_refinement_passes,
            ..GeneratorSettings::default()
        },
    )
}

pub fn reply(value: Value) -> LlmResult<Completion> {
    Ok(Completion::stop(value.to_string()))
}

/// Text between `<Section topic>` tags of a writer instruction.
pub fn section_topic(instruction: &str) -> String {
    instruction
        .split("<Section topic>\n")
        .nth(1)
        .and_then(|rest| rest.split("\n</Section topic>").next())
        .unwrap_or_default()
        .to_string()
}

pub fn is_final_writer(instruction: &str) -> bool {
    instruction.contains("synthesizes information from the rest of the report")
}

pub fn queries(texts: &[&str]) -> Value {
    json!({ "queries": texts.iter().map(|t| json!({ "search_query": t })).collect::<Vec<_>>() })
}

pub fn plan(sections: &[(&str, bool)]) -> Value {
    json!({
        "sections": sections
            .iter()
            .map(|(name, research)| json!({
                "name": name,
                "description": format!("About {}", name),
                "research": research,
                "content": ""
            }))
            .collect::<Vec<_>>()
    })
}

pub fn content(text: &str) -> Value {
    json!({ "content": text, "key_points": [] })
}

pub fn pass() -> Value {
    json!({ "grade": "pass", "follow_up_queries": [] })
}

pub fn fail(follow_ups: &[&str]) -> Value {
    json!({
        "grade": "fail",
        "follow_up_queries": follow_ups.iter().map(|t| json!({ "search_query": t })).collect::<Vec<_>>()
    })
}

/// A model that plans the given sections, writes `## <name>` sections and
/// grades with `grade`.
pub fn report_model<G>(sections: Vec<(&'static str, bool)>, grade: G) -> Arc<ScriptedModel>
where
    G: Fn(&str) -> Value + Send + Sync + 'static,
{
    ScriptedModel::new(move |req| match req.schema_name {
        "queries" => reply(queries(&["quantum basics", "qubits"])),
        "sections" => reply(plan(&sections)),
        "section_content" => {
            let topic = section_topic(&req.system);
            let name = topic.split(':').next().unwrap_or_default().trim().to_string();
            if is_final_writer(&req.system) {
                reply(content(&format!("## {}\n\nDistilled from the body.", name)))
            } else {
                reply(content(&format!("## {}\n\n**Key insight.** Drafted text.", name)))
            }
        }
        "feedback" => {
            let section = req
                .system
                .split("<section topic>\n")
                .nth(1)
                .and_then(|rest| rest.split('\n').next())
                .unwrap_or_default();
            reply(grade(section))
        }
        other => panic!("unexpected schema {}", other),
    })
}

pub fn source(title: &str, url: &str) -> SourceRecord {
    SourceRecord::new(title, url, format!("{} description", title))
}
