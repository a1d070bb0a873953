// Writer Agent: drafts researched sections and synthesizes the research-free ones

use tracing::info;

use super::prompts;
use super::structured::{Degraded, StructuredCaller};
use crate::error::LlmResult;
use crate::models::{Section, SectionContent};

pub struct WriterAgent {
    caller: StructuredCaller,
}

impl WriterAgent {
    pub fn new(caller: StructuredCaller) -> Self {
        Self { caller }
    }

    /// Drafts a section from the source context. Existing content, if any,
    /// is handed to the model to fold into the rewrite.
    pub async fn write_section(&self, section: &Section, context: &str) -> LlmResult<Degraded<String>> {
        info!("Writer: Drafting section: {}", section.name);

        let instruction = prompts::section_writer(&section.name, &section.description, &section.content, context);
        let written = self.caller.call::<SectionContent>(instruction).await?;
        Ok(written.map(|c| c.content))
    }

    /// Writes a section that distills the finished research body.
    pub async fn write_final_section(&self, section_topic: &str, body: &str) -> LlmResult<Degraded<String>> {
        info!("Writer: Writing final section: {}", section_topic);

        let instruction = prompts::final_section_writer(section_topic, body);
        let written = self.caller.call::<SectionContent>(instruction).await?;
        Ok(written.map(|c| c.content))
    }
}
