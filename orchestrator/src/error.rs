use thiserror::Error;
use warp::{reject::Reject, Reply, Rejection};

/// Failures talking to the language model.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not configured for {0}")]
    MissingApiKey(&'static str),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Malformed completion response: {0}")]
    Decode(String),

    #[error("Response for schema '{schema}' did not parse: {source}")]
    Schema {
        schema: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model refused or filtered the request: {0}")]
    Refused(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Pipeline stage a fatal error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    QueryGeneration,
    Planning,
    Drafting,
    Grading,
    FinalSections,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::QueryGeneration => "query generation",
            Stage::Planning => "report planning",
            Stage::Drafting => "section drafting",
            Stage::Grading => "section grading",
            Stage::FinalSections => "final section writing",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid report request: {0}")]
    InvalidRequest(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: LlmError,
    },
}

impl ReportError {
    pub fn at(stage: Stage) -> impl FnOnce(LlmError) -> ReportError {
        move |source| ReportError::Stage { stage, source }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Report generation failed: {0}")]
    ReportFailed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            other => ApiError::ReportFailed(other.to_string()),
        }
    }
}

impl Reject for ApiError {}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_err) = err.find::<ApiError>() {
        let (code, message) = match api_err {
            ApiError::BadRequest(_) => (400, "Bad request"),
            ApiError::RateLimitExceeded => (429, "Rate limit exceeded"),
            ApiError::ReportFailed(_) => (502, "Report generation failed"),
        };

        let json = warp::reply::json(&serde_json::json!({
            "error": message,
            "details": api_err.to_string(),
        }));

        let status = warp::http::StatusCode::from_u16(code)
            .unwrap_or(warp::http::StatusCode::INTERNAL_SERVER_ERROR);
        Ok(warp::reply::with_status(json, status))
    } else {
        Err(err)
    }
}
