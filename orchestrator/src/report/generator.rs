use std::sync::Arc;

use tracing::{error, info};

use super::assembler;
use super::pipeline::{PipelineSettings, ReportSession, SectionPipeline, DEFAULT_MAX_REFINEMENT_PASSES};
use super::progress::{ProgressEvent, ProgressReporter};
use crate::agents::prompts::DEFAULT_REPORT_STRUCTURE;
use crate::agents::{GraderAgent, LanguageModel, PlannerAgent, SourceFetcher, StructuredCaller, WriterAgent};
use crate::error::{ReportError, Stage};
use crate::metrics;
use crate::models::{Report, ReportRequest, ResearchDepth};

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub max_refinement_passes: usize,
    pub default_depth: ResearchDepth,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_refinement_passes: DEFAULT_MAX_REFINEMENT_PASSES,
            default_depth: ResearchDepth::Basic,
        }
    }
}

/// Runs a full report: planning searches, section plan, section cycle,
/// final sections and assembly. One call owns one session.
pub struct ReportGenerator {
    planner: PlannerAgent,
    writer: WriterAgent,
    grader: GraderAgent,
    fetcher: SourceFetcher,
    settings: GeneratorSettings,
}

impl ReportGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, fetcher: SourceFetcher, settings: GeneratorSettings) -> Self {
        let caller = StructuredCaller::new(model);
        Self {
            planner: PlannerAgent::new(caller.clone()),
            writer: WriterAgent::new(caller.clone()),
            grader: GraderAgent::new(caller),
            fetcher,
            settings,
        }
    }

    pub async fn generate(&self, request: &ReportRequest, progress: ProgressReporter) -> Result<Report, ReportError> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(ReportError::InvalidRequest(
                "Please provide a topic before starting the research".to_string(),
            ));
        }

        let timer = metrics::REPORT_DURATION.start_timer();
        let result = self.run(topic, request, progress).await;
        timer.observe_duration();

        match &result {
            Ok(report) => {
                metrics::REPORTS.with_label_values(&["ok"]).inc();
                info!(
                    request_id = %report.request_id,
                    sections = report.sections.len(),
                    sources = report.sources.len(),
                    warnings = report.warnings.len(),
                    "Report generated"
                );
            }
            Err(e) => {
                metrics::REPORTS.with_label_values(&["error"]).inc();
                error!("Report generation failed: {}", e);
            }
        }
        result
    }

    async fn run(&self, topic: &str, request: &ReportRequest, progress: ProgressReporter) -> Result<Report, ReportError> {
        let depth = request.depth.unwrap_or(self.settings.default_depth);
        let organization = request
            .report_organization
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or(DEFAULT_REPORT_STRUCTURE);
        let feedback = request.feedback.as_deref().unwrap_or("");

        let mut session = ReportSession::new(topic, progress.clone());
        info!(request_id = %session.request_id, ?depth, "Starting report");
        session.emit(ProgressEvent::Started {
            topic: topic.to_string(),
        });

        let queries = self
            .planner
            .generate_search_queries(topic, organization, depth.query_count())
            .await
            .map_err(ReportError::at(Stage::QueryGeneration))?;
        let queries = session.absorb(queries);
        session.emit(ProgressEvent::QueriesGenerated(queries.len()));

        session.gather(&self.fetcher, &queries, depth.search_count()).await;

        let plan = self
            .planner
            .generate_report_plan(topic, organization, &session.pool.context(), feedback)
            .await
            .map_err(ReportError::at(Stage::Planning))?;
        let plan = session.absorb(plan);
        if plan.is_empty() {
            session.warn("The report plan came back without sections");
        }
        session.emit(ProgressEvent::PlanGenerated(plan.len()));
        session.set_plan(plan);

        let pipeline = SectionPipeline::new(
            &self.writer,
            &self.grader,
            &self.fetcher,
            PipelineSettings {
                max_refinement_passes: self.settings.max_refinement_passes,
                search_count: depth.search_count(),
            },
        );
        pipeline.run(&mut session).await?;

        session.emit(ProgressEvent::Assembling);
        let report = assembler::assemble(session);
        progress.emit(ProgressEvent::Completed);
        Ok(report)
    }
}
