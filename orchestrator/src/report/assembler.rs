use chrono::Utc;

use super::pipeline::{ReportSession, TrackedSection};
use super::sources::SourcePool;
use crate::models::{Report, SectionSummary};

/// Joins section contents in plan order and appends the sources block.
pub fn assemble_document(sections: &[TrackedSection], pool: &SourcePool) -> String {
    let body = sections
        .iter()
        .filter(|t| !t.section.content.trim().is_empty())
        .map(|t| with_heading(&t.section.name, &t.section.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{}\n\n### Sources\n{}", body, pool.citations())
}

/// Every section opens with a `##` heading. A leading `# ` report title
/// stays on top with the section heading placed under it.
fn with_heading(name: &str, content: &str) -> String {
    let content = content.trim();
    if content.starts_with("##") {
        return content.to_string();
    }
    if content.starts_with('#') {
        let (title, rest) = content.split_once('\n').unwrap_or((content, ""));
        let rest = rest.trim();
        if rest.is_empty() {
            return format!("{}\n\n## {}", title.trim_end(), name);
        }
        return format!("{}\n\n## {}\n\n{}", title.trim_end(), name, rest);
    }
    format!("## {}\n\n{}", name, content)
}

/// Closes out a session into the report handed back to the caller.
pub fn assemble(session: ReportSession) -> Report {
    let final_text = assemble_document(&session.sections, &session.pool);

    let sections = session
        .sections
        .into_iter()
        .map(|t| SectionSummary {
            name: t.section.name,
            requires_research: t.section.requires_research,
            state: t.state,
            refinement_passes: t.refinement_passes,
            content: t.section.content,
        })
        .collect();

    Report {
        request_id: session.request_id,
        topic: session.topic,
        sections,
        final_text,
        sources: session.pool.into_records(),
        warnings: session.warnings,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Section, SourceRecord};
    use crate::report::progress::ProgressReporter;

    fn written(name: &str, content: &str, research: bool) -> TrackedSection {
        let mut section = Section::new(name, "", research);
        section.content = content.to_string();
        TrackedSection::new(section)
    }

    #[test]
    fn document_orders_sections_and_lists_unique_sources() {
        let mut pool = SourcePool::new();
        pool.extend(vec![
            SourceRecord::new("A", "https://a.edu/x", "a"),
            SourceRecord::new("A again", "https://a.edu/x", "a"),
            SourceRecord::new("B", "https://b.org", "b"),
        ]);
        let sections = vec![
            written("Introduction", "# Quantum Computing\n\nWhy it matters.", false),
            written("Core Concepts", "Qubits hold superpositions.", true),
        ];

        let doc = assemble_document(&sections, &pool);

        assert!(doc.starts_with("# Quantum Computing\n\n## Introduction\n\nWhy it matters."));
        assert!(doc.contains("## Core Concepts\n\nQubits hold superpositions."));
        assert!(doc.ends_with("### Sources\n- [A](https://a.edu/x)\n- [B](https://b.org)"));
    }

    #[test]
    fn title_only_introduction_still_gets_its_heading() {
        let doc = assemble_document(&[written("Introduction", "# Quantum Computing", false)], &SourcePool::new());
        assert!(doc.starts_with("# Quantum Computing\n\n## Introduction\n\n### Sources"));
    }

    #[test]
    fn empty_pool_still_has_sources_heading() {
        let doc = assemble_document(&[written("Core Concepts", "## Core Concepts\ntext", true)], &SourcePool::new());
        assert!(doc.ends_with("### Sources\n"));
    }

    #[test]
    fn assemble_carries_session_state() {
        let mut session = ReportSession::new("Quantum Computing", ProgressReporter::new());
        session.sections.push(written("Core Concepts", "text", true));
        session.warnings.push("truncated".to_string());

        let report = assemble(session);

        assert_eq!(report.topic, "Quantum Computing");
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.warnings, vec!["truncated".to_string()]);
        assert!(report.sources.is_empty());
    }
}
