// Planner Agent: turns a topic into planning queries and a section plan

use tracing::info;

use super::prompts;
use super::structured::{Degraded, StructuredCaller};
use crate::error::LlmResult;
use crate::models::{Queries, SearchQuery, Section, Sections};

pub struct PlannerAgent {
    caller: StructuredCaller,
}

impl PlannerAgent {
    pub fn new(caller: StructuredCaller) -> Self {
        Self { caller }
    }

    pub async fn generate_search_queries(
        &self,
        topic: &str,
        report_organization: &str,
        number_of_queries: usize,
    ) -> LlmResult<Degraded<Vec<SearchQuery>>> {
        info!("Planner: Generating {} search queries for: {}", number_of_queries, topic);

        let instruction = prompts::report_planner_query_writer(topic, report_organization, number_of_queries);
        let queries = self.caller.call::<Queries>(instruction).await?;

        Ok(queries.map(|q| {
            q.queries
                .into_iter()
                .filter(|query| !query.text.trim().is_empty())
                .collect()
        }))
    }

    pub async fn generate_report_plan(
        &self,
        topic: &str,
        report_organization: &str,
        context: &str,
        feedback: &str,
    ) -> LlmResult<Degraded<Vec<Section>>> {
        info!("Planner: Planning sections for: {}", topic);

        let instruction = prompts::report_planner(topic, report_organization, context, feedback);
        let plan = self.caller.call::<Sections>(instruction).await?;

        // Content is written later; a plan never arrives pre-filled.
        Ok(plan.map(|p| {
            p.sections
                .into_iter()
                .filter(|s| !s.name.trim().is_empty())
                .map(|s| Section::new(s.name, s.description, s.requires_research))
                .collect()
        }))
    }
}
