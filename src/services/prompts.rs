//! Prompt templates for the three pipeline phases and the situation context.
//!
//! Templates use `{name}` placeholders filled by [`render`].

/// Marker inserted into the execute prompt before the first step completes.
pub const NO_HISTORY: &str = "No history yet.";

const PLANNER_SYSTEM: &str = "\
You are a senior site reliability engineer planning an incident investigation.
Produce a short, ordered list of concrete investigation steps for the situation you are given.

Rules:
1. Order steps logically: overall load and saturation first, then logs, then dependencies.
2. Each step names the metric, log source or document it needs.
3. No commentary. Output only a JSON array of strings, for example:
[
  \"Query CPU and memory usage of the service over the last 30 minutes\",
  \"Query error logs of the service over the last 10 minutes\",
  \"Check for related slow-query alerts on the database\"
]";

const EXECUTOR_SYSTEM: &str = "\
You are an operations engineer executing one step of an investigation plan.
Use the available tools to gather evidence for the current step only.
Report what you found with concrete numbers, identifiers and timestamps.
If a tool fails, say so and continue with what you have.";

const REVIEWER_SYSTEM: &str = "\
You are the incident reviewer. Combine the results of every investigation step
into one diagnosis report in Markdown with the sections:
## Summary, ## Evidence, ## Probable root cause, ## Recommended actions.
Do not invent data that is not present in the step results.";

const ALERT_CONTEXT: &str = "\
[Alert]
- Name: {alert_name}
- Instance: {instance}
- Severity: {severity}
- Region: {region}
- Description: {description}";

const QUERY_CONTEXT: &str = "\
[Operator question]
{query}";

const PHASE_PLAN: &str = "\
Situation:
{context}

Create the investigation plan for this situation. Answer with a JSON array of step descriptions only.";

const PHASE_EXECUTE: &str = "\
Situation:
{context}

Results so far:
{history}

Current step:
{current_step}

Execute the current step and report the result.";

const PHASE_REVIEW: &str = "\
Situation:
{context}

Step results:
{history}

Write the final diagnosis report.";

/// Complete set of templates and role prompts used by a pipeline.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub planner_system: String,
    pub executor_system: String,
    pub reviewer_system: String,
    pub alert_context: String,
    pub query_context: String,
    pub phase_plan: String,
    pub phase_execute: String,
    pub phase_review: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            planner_system: PLANNER_SYSTEM.to_string(),
            executor_system: EXECUTOR_SYSTEM.to_string(),
            reviewer_system: REVIEWER_SYSTEM.to_string(),
            alert_context: ALERT_CONTEXT.to_string(),
            query_context: QUERY_CONTEXT.to_string(),
            phase_plan: PHASE_PLAN.to_string(),
            phase_execute: PHASE_EXECUTE.to_string(),
            phase_review: PHASE_REVIEW.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn plan_prompt(&self, context: &str) -> String {
        render(&self.phase_plan, &[("context", context)])
    }

    pub fn execute_prompt(&self, context: &str, history: &str, current_step: &str) -> String {
        let history = if history.is_empty() { NO_HISTORY } else { history };
        render(
            &self.phase_execute,
            &[
                ("context", context),
                ("history", history),
                ("current_step", current_step),
            ],
        )
    }

    pub fn review_prompt(&self, context: &str, history: &str) -> String {
        render(
            &self.phase_review,
            &[("context", context), ("history", history)],
        )
    }

    pub fn query_context(&self, query: &str) -> String {
        render(&self.query_context, &[("query", query)])
    }

    pub fn alert_context(&self, vars: &[(&str, String)]) -> String {
        let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        render(&self.alert_context, &vars)
    }
}

/// Substitute `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so alert text containing braces
/// cannot inject into later placeholders. Unknown placeholders are kept.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match value {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        assert_eq!(render("a {x} b {y}", &[("x", "1"), ("y", "2")]), "a 1 b 2");
    }

    #[test]
    fn test_render_keeps_unknown_and_json() {
        assert_eq!(
            render(r#"{"k": 1} {missing} {x}"#, &[("x", "v")]),
            r#"{"k": 1} {missing} v"#
        );
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        assert_eq!(
            render("{context}|{history}", &[("context", "{history}"), ("history", "h")]),
            "{history}|h"
        );
    }

    #[test]
    fn test_execute_prompt_marks_empty_history() {
        let templates = PromptTemplates::default();
        let prompt = templates.execute_prompt("ctx", "", "check cpu");
        assert!(prompt.contains(NO_HISTORY));
        assert!(prompt.contains("check cpu"));
        assert!(prompt.contains("ctx"));
    }

    #[test]
    fn test_alert_context() {
        let templates = PromptTemplates::default();
        let rendered = templates.alert_context(&[
            ("alert_name", "HighCPU".to_string()),
            ("instance", "svc-1".to_string()),
            ("severity", "warning".to_string()),
            ("region", "Unknown".to_string()),
            ("description", "none".to_string()),
        ]);
        assert!(rendered.contains("- Name: HighCPU"));
        assert!(rendered.contains("- Instance: svc-1"));
        assert!(!rendered.contains('{'));
    }
}
