use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Report data model

/// One topical unit of a report. `requires_research` is serialized as
/// `research` to match the planning schema the model fills in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub description: String,
    #[serde(rename = "research")]
    pub requires_research: bool,
    pub content: String,
}

impl Section {
    pub fn new(name: impl Into<String>, description: impl Into<String>, requires_research: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_research,
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "search_query")]
    pub text: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Queries {
    pub queries: Vec<SearchQuery>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionContent {
    pub content: String,
    pub key_points: Vec<String>,
}

/// A truncated grade with no verdict reads as `Pass`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    #[default]
    Pass,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub grade: Grade,
    pub follow_up_queries: Vec<SearchQuery>,
}

/// A single web search hit. The URL is the identity key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    pub url: String,
    #[serde(alias = "snippet")]
    pub description: String,
}

impl SourceRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub request_id: Uuid,
    pub topic: String,
    pub sections: Vec<SectionSummary>,
    pub final_text: String,
    pub sources: Vec<SourceRecord>,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Where a section ended up after the write/grade/refine cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    Planned,
    Drafted,
    GradedPass,
    GradedFail,
    Refined,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub requires_research: bool,
    pub state: SectionState,
    pub refinement_passes: usize,
    #[serde(skip)]
    pub content: String,
}

/// How much searching a run does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    #[default]
    Basic,
    InDepth,
    Advanced,
}

impl ResearchDepth {
    /// Planning queries generated for the topic.
    pub fn query_count(self) -> usize {
        match self {
            ResearchDepth::Basic => 2,
            ResearchDepth::InDepth => 3,
            ResearchDepth::Advanced => 4,
        }
    }

    /// Results requested per search.
    pub fn search_count(self) -> usize {
        match self {
            ResearchDepth::Basic => 3,
            ResearchDepth::InDepth => 5,
            ResearchDepth::Advanced => 7,
        }
    }
}

impl std::str::FromStr for ResearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "basic" => Ok(ResearchDepth::Basic),
            "in_depth" | "indepth" => Ok(ResearchDepth::InDepth),
            "advanced" => Ok(ResearchDepth::Advanced),
            other => Err(format!("unknown research depth '{}'", other)),
        }
    }
}

// API Request/Response models
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub topic: String,
    #[serde(default)]
    pub depth: Option<ResearchDepth>,
    #[serde(default)]
    pub report_organization: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub request_id: Uuid,
    pub topic: String,
    pub report: String,
    pub sections: Vec<SectionSummary>,
    pub sources: Vec<SourceRecord>,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            request_id: report.request_id,
            topic: report.topic,
            report: report.final_text,
            sections: report.sections,
            sources: report.sources,
            warnings: report.warnings,
            generated_at: report.generated_at,
        }
    }
}
