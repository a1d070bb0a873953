pub mod llm;
pub mod structured;
pub mod prompts;
pub mod retriever;
pub mod planner;
pub mod writer;
pub mod grader;

pub use llm::{Completion, CompletionRequest, FinishReason, LanguageModel, OpenAiConfig, OpenAiModel};
pub use structured::{call_with_degradation, Degraded, StructuredCaller, StructuredSchema};
pub use retriever::{RetryPolicy, SearchProvider, SourceFetcher};
pub use planner::PlannerAgent;
pub use writer::WriterAgent;
pub use grader::GraderAgent;
