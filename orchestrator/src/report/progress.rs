use std::fmt;

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Human-readable status of a report run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started { topic: String },
    QueriesGenerated(usize),
    Searching(String),
    SourcesCollected { new: usize, total: usize },
    PlanGenerated(usize),
    WritingSection { index: usize, total: usize, name: String },
    EvaluatingSection { index: usize, total: usize, name: String },
    RefiningSection { name: String, follow_ups: usize },
    WritingFinalSection(String),
    Assembling,
    Warning(String),
    Completed,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Started { topic } => write!(f, "Starting report generation for: {}", topic),
            ProgressEvent::QueriesGenerated(n) => write!(f, "Generated {} search queries", n),
            ProgressEvent::Searching(query) => write!(f, "Searching: {}", query),
            ProgressEvent::SourcesCollected { new, total } => {
                write!(f, "Collected {} new sources ({} total)", new, total)
            }
            ProgressEvent::PlanGenerated(n) => write!(f, "Generated report plan with {} sections", n),
            ProgressEvent::WritingSection { index, total, name } => {
                write!(f, "Writing section {}/{}: {}", index, total, name)
            }
            ProgressEvent::EvaluatingSection { index, total, name } => {
                write!(f, "Evaluating section {}/{}: {}", index, total, name)
            }
            ProgressEvent::RefiningSection { name, follow_ups } => write!(
                f,
                "Section {} failed evaluation, refining with {} follow-up queries",
                name, follow_ups
            ),
            ProgressEvent::WritingFinalSection(name) => write!(f, "Writing {}", name),
            ProgressEvent::Assembling => f.write_str("Compiling final report"),
            ProgressEvent::Warning(msg) => write!(f, "Warning: {}", msg),
            ProgressEvent::Completed => f.write_str("Research complete!"),
        }
    }
}

/// Logs every event and forwards it to an optional listener.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Warning(_) => warn!("{}", event),
            _ => info!("{}", event),
        }
        if let Some(tx) = &self.tx {
            // A listener that hung up does not stop the run.
            let _ = tx.send(event);
        }
    }
}
