// Prompts: instruction templates for each model call in a report run

pub const DEFAULT_REPORT_STRUCTURE: &str = "The report structure should focus on breaking-down the user-provided topic:

1. Introduction (no research needed)
   - Brief overview of the topic area

2. Main Body Sections:
   - Each section should focus on a sub-topic of the user-provided topic
   - Include any key concepts and definitions
   - Provide real-world examples or case studies where applicable

3. Conclusion
   - Aim for 1 structural element (either a list or table) that distills the main body sections
   - Provide a concise summary of the report";

pub fn report_planner_query_writer(topic: &str, report_organization: &str, number_of_queries: usize) -> String {
    format!(
        "You are an expert technical writer, helping to plan a report.

<Report topic>
{topic}
</Report topic>

<Report organization>
{report_organization}
</Report organization>

<Task>
Your goal is to generate {number_of_queries} search queries that will help gather comprehensive information for planning the report sections.

The queries should:

1. Be related to the topic of the report
2. Help satisfy the requirements specified in the report organization

Make the queries specific enough to find high-quality, relevant sources while covering the breadth needed for the report structure.
</Task>"
    )
}

pub fn report_planner(topic: &str, report_organization: &str, context: &str, feedback: &str) -> String {
    format!(
        "I want a plan for a report.

<Task>
Generate a list of sections for the report.

Each section should have the fields:

- Name - Name for this section of the report.
- Description - Brief overview of the main topics covered in this section.
- Research - Whether to perform web research for this section of the report.
- Content - The content of the section, which you will leave blank for now.

For example, introduction and conclusion will not require research because they will distill information from other parts of the report.
</Task>

<Topic>
The topic of the report is:
{topic}
</Topic>

<Report organization>
The report should follow this organization:
{report_organization}
</Report organization>

<Context>
Here is context to use to plan the sections of the report:
{context}
</Context>

<Feedback>
Here is feedback on the report structure from review (if any):
{feedback}
</Feedback>"
    )
}

pub fn section_writer(section_topic: &str, section_description: &str, section_content: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        "No sources were found. Write from general knowledge."
    } else {
        context
    };
    format!(
        "You are an expert technical writer crafting one section of a technical report.

<Section topic>
{section_topic}: {section_description}
</Section topic>

<Existing section content (if populated)>
{section_content}
</Existing section content>

<Source material>
{context}
</Source material>

<Guidelines for writing>
1. If the existing section content is not populated, write a new section from scratch.
2. If the existing section content is populated, write a new section that synthesizes the existing section content with the new information.
</Guidelines for writing>

<Length and style>
- Strict 150-200 word limit
- No marketing language
- Technical focus
- Write in simple, clear language
- Start with your most important insight in **bold**
- Use short paragraphs (2-3 sentences max)
- Use ## for section title (Markdown format)
- Only use ONE structural element IF it helps clarify your point:
  * Either a focused table comparing 2-3 key items (using Markdown table syntax)
  * Or a short list (3-5 items) using proper Markdown list syntax
</Length and style>

<Quality checks>
- Exactly 150-200 words (excluding title and sources)
- Careful use of only ONE structural element (table or list) and only if it helps clarify your point
- One specific example / case study
- Starts with bold insight
- No preamble prior to creating the section content
</Quality checks>"
    )
}

pub fn section_grader(section_topic: &str, section: &str) -> String {
    format!(
        "Review a report section relative to the specified topic:

<section topic>
{section_topic}
</section topic>

<section content>
{section}
</section content>

<task>
Evaluate whether the section adequately covers the topic by checking technical accuracy and depth.

If the section fails any criteria, generate specific follow-up search queries to gather missing information.
</task>

<format>
grade: \"pass\" or \"fail\"
follow_up_queries: list of follow-up search queries (empty when the grade is \"pass\")
</format>"
    )
}

pub fn final_section_writer(section_topic: &str, context: &str) -> String {
    format!(
        "You are an expert technical writer crafting a section that synthesizes information from the rest of the report.

<Section topic>
{section_topic}
</Section topic>

<Available report content>
{context}
</Available report content>

<Task>
1. Section-Specific Approach:

For Introduction:
- Use # for report title (Markdown format)
- 50-100 word limit
- Write in simple and clear language
- Focus on the core motivation for the report in 1-2 paragraphs
- Use a clear narrative arc to introduce the report
- Include NO structural elements (no lists or tables)
- No sources section needed

For Conclusion/Summary:
- Use ## for section title (Markdown format)
- 100-150 word limit
- For comparative reports, include a focused comparison table using Markdown table syntax
- For non-comparative reports, only use ONE structural element (a table or a short list) IF it helps distill the points made in the report
- End with specific next steps or implications
- No sources section needed

2. Writing Approach:
- Use concrete details over general statements
- Make every word count
- Focus on your single most important point
</Task>

<Quality Checks>
- For introduction: 50-100 word limit, # for report title, no structural elements, no sources section
- For conclusion: 100-150 word limit, ## for section title, only ONE structural element at most, no sources section
- Markdown format
- Do not include word count or any preamble in your response
</Quality Checks>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_substitute_inputs() {
        let prompt = report_planner_query_writer("Quantum Computing", DEFAULT_REPORT_STRUCTURE, 3);
        assert!(prompt.contains("Quantum Computing"));
        assert!(prompt.contains("generate 3 search queries"));

        let prompt = section_grader("Core Concepts", "## Core Concepts");
        assert!(prompt.contains("<section topic>\nCore Concepts"));
    }

    #[test]
    fn empty_context_asks_for_general_knowledge() {
        let prompt = section_writer("Core Concepts", "qubits", "", "");
        assert!(prompt.contains("general knowledge"));
    }
}
