// Source deduplication and formatting, keyed by URL (first record seen wins)

use std::collections::HashSet;

use crate::models::SourceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// One `- [title](url)` bullet per source.
    List,
    /// Title, URL and description per source, for model context.
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedSources {
    List(Vec<String>),
    Context(String),
}

impl FormattedSources {
    /// Plain text for either form; list entries go one per line.
    pub fn into_text(self) -> String {
        match self {
            FormattedSources::List(lines) => lines.join("\n"),
            FormattedSources::Context(text) => text,
        }
    }
}

pub fn deduplicate_sources(records: &[SourceRecord]) -> Vec<&SourceRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.url.as_str()))
        .collect()
}

pub fn deduplicate_and_format_sources(records: &[SourceRecord], format: SourceFormat) -> FormattedSources {
    let unique = deduplicate_sources(records);
    match format {
        SourceFormat::List => FormattedSources::List(citation_lines(unique)),
        SourceFormat::Context => FormattedSources::Context(context_block(unique)),
    }
}

fn citation_lines<'a>(records: impl IntoIterator<Item = &'a SourceRecord>) -> Vec<String> {
    records
        .into_iter()
        .map(|r| format!("- [{}]({})", r.title, r.url))
        .collect()
}

fn context_block<'a>(records: impl IntoIterator<Item = &'a SourceRecord>) -> String {
    let mut text = String::new();
    for r in records {
        text.push_str(&format!("- {}\n", r.title));
        text.push_str(&format!("  URL: {}\n", r.url));
        text.push_str(&format!("  Most relevant content from source: {}\n", r.description));
    }
    text.trim().to_string()
}

/// Every source gathered during one run, already deduplicated.
#[derive(Debug, Clone, Default)]
pub struct SourcePool {
    records: Vec<SourceRecord>,
    urls: HashSet<String>,
}

impl SourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds records whose URL is not yet pooled; returns how many were new.
    pub fn extend<I: IntoIterator<Item = SourceRecord>>(&mut self, records: I) -> usize {
        let before = self.records.len();
        for record in records {
            if self.urls.insert(record.url.clone()) {
                self.records.push(record);
            }
        }
        self.records.len() - before
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// `- [title](url)` lines for the sources block.
    pub fn citations(&self) -> String {
        deduplicate_and_format_sources(&self.records, SourceFormat::List).into_text()
    }

    /// Source context handed to the planner and section writer.
    pub fn context(&self) -> String {
        deduplicate_and_format_sources(&self.records, SourceFormat::Context).into_text()
    }

    pub fn into_records(self) -> Vec<SourceRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, url: &str) -> SourceRecord {
        SourceRecord::new(title, url, format!("about {}", title))
    }

    #[test]
    fn first_title_wins_for_shared_url() {
        let records = vec![
            record("First", "https://a.edu/x"),
            record("Other", "https://b.org"),
            record("Second", "https://a.edu/x"),
        ];

        let FormattedSources::List(lines) = deduplicate_and_format_sources(&records, SourceFormat::List) else {
            panic!("expected list output");
        };
        assert_eq!(
            lines,
            vec!["- [First](https://a.edu/x)".to_string(), "- [Other](https://b.org)".to_string()]
        );
    }

    #[test]
    fn context_mode_lists_each_url_once() {
        let records = vec![
            record("First", "https://a.edu/x"),
            record("Second", "https://a.edu/x"),
        ];

        let FormattedSources::Context(text) = deduplicate_and_format_sources(&records, SourceFormat::Context) else {
            panic!("expected context output");
        };
        assert_eq!(
            text,
            "- First\n  URL: https://a.edu/x\n  Most relevant content from source: about First"
        );
        assert_eq!(text.matches("https://a.edu/x").count(), 1);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(
            deduplicate_and_format_sources(&[], SourceFormat::List),
            FormattedSources::List(vec![])
        );
        assert_eq!(
            deduplicate_and_format_sources(&[], SourceFormat::Context),
            FormattedSources::Context(String::new())
        );
    }

    #[test]
    fn pool_counts_only_new_urls() {
        let mut pool = SourcePool::new();
        assert_eq!(pool.extend(vec![record("A", "https://a"), record("B", "https://b")]), 2);
        assert_eq!(pool.extend(vec![record("A2", "https://a"), record("C", "https://c")]), 1);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.records()[0].title, "A");
        assert_eq!(pool.citations().lines().nth(2), Some("- [C](https://c)"));
        assert_eq!(pool.context().matches("URL: https://a").count(), 1);
    }
}
