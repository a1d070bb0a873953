pub mod sources;
pub mod progress;
pub mod pipeline;
pub mod assembler;
pub mod generator;

pub use generator::{GeneratorSettings, ReportGenerator};
pub use pipeline::{PipelineSettings, ReportSession, SectionPipeline, TrackedSection};
pub use progress::{ProgressEvent, ProgressReporter};
pub use sources::{deduplicate_and_format_sources, FormattedSources, SourceFormat, SourcePool};
