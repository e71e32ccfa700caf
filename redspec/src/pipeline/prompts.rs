//! Prompt builders for each agent
//!
//! Every upstream input is optional. When one is missing the builder
//! substitutes a fallback note so the downstream agent still receives a
//! complete prompt.

pub const NO_COMPANY_CONTEXT: &str = "Using default company context";
pub const NO_RELEASE_HISTORY: &str = "No historical context available";
pub const NO_CODEBASE: &str = "No codebase information available - provide generic analysis";
pub const NO_IMPACT_ANALYSIS: &str = "No impact analysis available";
pub const NO_STORY_POINTS: &str = "No story points available";

pub fn context() -> String {
    "Get the complete company context including product principles, tech stack, and design system"
        .to_string()
}

pub fn codebase(repo_url: &str) -> String {
    format!("Fetch and analyze this GitHub repository: {}", repo_url)
}

pub fn release_notes(product_idea: &str) -> String {
    format!(
        "Analyze past release notes for features related to: {}",
        product_idea
    )
}

pub fn prd(product_idea: &str, company_context: Option<&str>, release_history: Option<&str>) -> String {
    format!(
        r#"Product Idea: {idea}

Company Context:
{context}

Historical Context:
{history}

Please generate a comprehensive PRD for this feature, covering all 14 sections of the PRD template."#,
        idea = product_idea,
        context = company_context.unwrap_or(NO_COMPANY_CONTEXT),
        history = release_history.unwrap_or(NO_RELEASE_HISTORY),
    )
}

pub fn code_impact(prd: &str, codebase_info: Option<&str>) -> String {
    format!(
        r#"PRD:
{prd}

Codebase Information:
{codebase}

Analyze the code impact for this PRD. Identify specific files, components, and systems that will be affected."#,
        codebase = codebase_info.unwrap_or(NO_CODEBASE),
    )
}

pub fn story_points(prd: &str, code_impact: Option<&str>) -> String {
    format!(
        r#"PRD:
{prd}

Code Impact Analysis:
{impact}

Calculate story points for each user story using the Fibonacci scale. Consider complexity, impact area, dependencies, and risk."#,
        impact = code_impact.unwrap_or(NO_IMPACT_ANALYSIS),
    )
}

pub fn design(prd: &str) -> String {
    format!(
        r#"PRD:
{prd}

Generate wireframes and design specifications aligned with the design system. Include ASCII wireframes, component specs, and design tokens."#
    )
}

pub fn analytics(prd: &str) -> String {
    format!(
        r#"PRD:
{prd}

Define a comprehensive analytics tracking strategy including product analytics events, conversion funnels, and success metrics."#
    )
}

pub fn validator(prd: &str) -> String {
    format!(
        r#"PRD to validate:
{prd}

Validate this PRD against company standards. Provide a quality score (0-100) and detailed feedback."#
    )
}

pub fn jira(prd: &str, story_points: Option<&str>, code_impact: Option<&str>) -> String {
    format!(
        r#"PRD:
{prd}

Story Points:
{points}

Code Impact:
{impact}

Create a complete JIRA ticket structure including epic, stories, tasks, and sub-tasks with story points and acceptance criteria."#,
        points = story_points.unwrap_or(NO_STORY_POINTS),
        impact = code_impact.unwrap_or(NO_IMPACT_ANALYSIS),
    )
}
