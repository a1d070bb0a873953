// Grader Agent: pass/fail review of a drafted section

use tracing::info;

use super::prompts;
use super::structured::{Degraded, StructuredCaller};
use crate::error::LlmResult;
use crate::models::{Feedback, Grade, Section};

pub struct GraderAgent {
    caller: StructuredCaller,
}

impl GraderAgent {
    pub fn new(caller: StructuredCaller) -> Self {
        Self { caller }
    }

    pub async fn evaluate_section(&self, section: &Section) -> LlmResult<Degraded<Feedback>> {
        info!("Grader: Evaluating section: {}", section.name);

        let instruction = prompts::section_grader(&section.name, &section.content);
        let feedback = self.caller.call::<Feedback>(instruction).await?;

        Ok(feedback.map(|mut f| {
            f.follow_up_queries.retain(|q| !q.text.trim().is_empty());
            if f.grade == Grade::Pass {
                f.follow_up_queries.clear();
            }
            f
        }))
    }
}
