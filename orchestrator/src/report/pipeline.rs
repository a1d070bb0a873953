// Section pipeline: draft, grade and bounded refinement per section, then the research-free sections

use tracing::{info, warn};
use uuid::Uuid;

use super::progress::{ProgressEvent, ProgressReporter};
use super::sources::SourcePool;
use crate::agents::structured::Degraded;
use crate::agents::{GraderAgent, SourceFetcher, WriterAgent};
use crate::error::{ReportError, Stage};
use crate::models::{Grade, SearchQuery, Section, SectionState};

pub const DEFAULT_MAX_REFINEMENT_PASSES: usize = 1;

#[derive(Debug, Clone)]
pub struct TrackedSection {
    pub section: Section,
    pub state: SectionState,
    pub refinement_passes: usize,
}

impl TrackedSection {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            state: SectionState::Planned,
            refinement_passes: 0,
        }
    }

    /// Replaces the content unless the new text is empty, so a written
    /// section never goes back to blank.
    fn store(&mut self, content: String) -> bool {
        if content.trim().is_empty() {
            return false;
        }
        self.section.content = content;
        true
    }
}

/// Everything one report run owns. Passed explicitly through each stage.
pub struct ReportSession {
    pub request_id: Uuid,
    pub topic: String,
    pub sections: Vec<TrackedSection>,
    pub pool: SourcePool,
    pub warnings: Vec<String>,
    progress: ProgressReporter,
}

impl ReportSession {
    pub fn new(topic: impl Into<String>, progress: ProgressReporter) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            topic: topic.into(),
            sections: Vec::new(),
            pool: SourcePool::new(),
            warnings: Vec::new(),
            progress,
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        self.progress.emit(event);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.progress.emit(ProgressEvent::Warning(message.clone()));
        self.warnings.push(message);
    }

    /// Unwraps a model result, recording a warning if it was truncated.
    pub fn absorb<T>(&mut self, result: Degraded<T>) -> T {
        if let Some(reason) = result.warning() {
            let reason = reason.to_string();
            self.warn(reason);
        }
        result.into_inner()
    }

    pub fn set_plan(&mut self, plan: Vec<Section>) {
        self.sections = plan.into_iter().map(TrackedSection::new).collect();
    }

    /// Runs each query and merges the hits into the pool.
    pub async fn gather(&mut self, fetcher: &SourceFetcher, queries: &[SearchQuery], count: usize) {
        for query in queries {
            self.emit(ProgressEvent::Searching(query.text.clone()));
            let results = fetcher.fetch(&query.text, count).await;
            let new = self.pool.extend(results);
            self.emit(ProgressEvent::SourcesCollected {
                new,
                total: self.pool.len(),
            });
        }
    }

    /// Researched section contents in plan order, blank-line separated.
    pub fn research_body(&self) -> String {
        self.sections
            .iter()
            .filter(|t| t.section.requires_research && !t.section.content.trim().is_empty())
            .map(|t| t.section.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_refinement_passes: usize,
    pub search_count: usize,
}

/// Runs researched sections one at a time: draft, grade, then up to
/// `max_refinement_passes` rewrites against the grader's follow-up searches.
/// A section is not graded after its last rewrite. With a bound of zero a
/// failing section keeps its draft and ends in `GradedFail`.
pub struct SectionPipeline<'a> {
    writer: &'a WriterAgent,
    grader: &'a GraderAgent,
    fetcher: &'a SourceFetcher,
    settings: PipelineSettings,
}

impl<'a> SectionPipeline<'a> {
    pub fn new(
        writer: &'a WriterAgent,
        grader: &'a GraderAgent,
        fetcher: &'a SourceFetcher,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            writer,
            grader,
            fetcher,
            settings,
        }
    }

    pub async fn run(&self, session: &mut ReportSession) -> Result<(), ReportError> {
        let researched: Vec<usize> = session
            .sections
            .iter()
            .enumerate()
            .filter(|(_, t)| t.section.requires_research)
            .map(|(i, _)| i)
            .collect();

        let total = researched.len();
        for (n, idx) in researched.into_iter().enumerate() {
            self.run_section(session, idx, n + 1, total).await?;
        }

        self.write_final_sections(session).await
    }

    async fn run_section(
        &self,
        session: &mut ReportSession,
        idx: usize,
        ordinal: usize,
        total: usize,
    ) -> Result<(), ReportError> {
        let name = session.sections[idx].section.name.clone();

        session.emit(ProgressEvent::WritingSection {
            index: ordinal,
            total,
            name: name.clone(),
        });
        self.draft(session, idx).await?;
        session.sections[idx].state = SectionState::Drafted;

        loop {
            session.emit(ProgressEvent::EvaluatingSection {
                index: ordinal,
                total,
                name: name.clone(),
            });
            let graded = self
                .grader
                .evaluate_section(&session.sections[idx].section)
                .await
                .map_err(ReportError::at(Stage::Grading))?;
            let feedback = session.absorb(graded);

            let tracked = &mut session.sections[idx];
            if feedback.grade == Grade::Pass {
                tracked.state = SectionState::GradedPass;
                break;
            }
            tracked.state = SectionState::GradedFail;
            if tracked.refinement_passes >= self.settings.max_refinement_passes {
                info!(section = %name, "Refinement budget spent, keeping draft");
                break;
            }

            session.emit(ProgressEvent::RefiningSection {
                name: name.clone(),
                follow_ups: feedback.follow_up_queries.len(),
            });
            session
                .gather(self.fetcher, &feedback.follow_up_queries, self.settings.search_count)
                .await;
            self.draft(session, idx).await?;

            let tracked = &mut session.sections[idx];
            tracked.refinement_passes += 1;
            tracked.state = SectionState::Refined;
            if tracked.refinement_passes >= self.settings.max_refinement_passes {
                break;
            }
        }

        info!(
            section = %name,
            state = ?session.sections[idx].state,
            passes = session.sections[idx].refinement_passes,
            "Section finished"
        );
        Ok(())
    }

    async fn draft(&self, session: &mut ReportSession, idx: usize) -> Result<(), ReportError> {
        let context = session.pool.context();
        let written = self
            .writer
            .write_section(&session.sections[idx].section, &context)
            .await
            .map_err(ReportError::at(Stage::Drafting))?;
        let content = session.absorb(written);

        if !session.sections[idx].store(content) {
            let name = session.sections[idx].section.name.clone();
            warn!(section = %name, "Writer returned no content");
            session.warn(format!("Section '{}' came back empty from the writer", name));
        }
        Ok(())
    }

    async fn write_final_sections(&self, session: &mut ReportSession) -> Result<(), ReportError> {
        if !session.sections.iter().any(|t| !t.section.requires_research) {
            session.sections.insert(
                0,
                TrackedSection::new(Section::new("Introduction", "Brief overview of the topic area", false)),
            );
            session.sections.push(TrackedSection::new(Section::new(
                "Conclusion",
                "Concise summary of the report",
                false,
            )));
        }

        let body = session.research_body();
        let finals: Vec<usize> = session
            .sections
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.section.requires_research)
            .map(|(i, _)| i)
            .collect();

        for idx in finals {
            let name = session.sections[idx].section.name.clone();
            session.emit(ProgressEvent::WritingFinalSection(name.clone()));
            let written = self
                .writer
                .write_final_section(&name, &body)
                .await
                .map_err(ReportError::at(Stage::FinalSections))?;
            let content = session.absorb(written);

            let tracked = &mut session.sections[idx];
            if tracked.store(content) {
                tracked.state = SectionState::Drafted;
            } else {
                session.warn(format!("Section '{}' came back empty from the writer", name));
            }
        }
        Ok(())
    }
}
