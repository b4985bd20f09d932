//! Property tests for response sanitizing and plan parsing.

use proptest::prelude::*;
use triage::domain::models::Plan;
use triage::services::sanitizer::{parse_plan_steps, strip};

proptest! {
    /// Property: text without fences is only trimmed
    #[test]
    fn prop_clean_text_is_unchanged(text in "[^`]{0,200}") {
        prop_assert_eq!(strip(&text), text.trim());
    }

    /// Property: sanitizing a sanitized report changes nothing
    #[test]
    fn prop_strip_is_idempotent(
        tag in "[a-z]{0,8}",
        body in "[^`]{0,160}",
    ) {
        let once = strip(&format!("```{tag}\n{body}\n```"));
        prop_assert_eq!(strip(&once), once.clone());
    }

    /// Property: a fenced body comes back trimmed and unfenced
    #[test]
    fn prop_strip_removes_fence(
        tag in "[a-z]{0,8}",
        body in "[a-zA-Z0-9 #.,:\\n]{0,120}",
    ) {
        let fenced = format!("```{tag}\n{body}\n```");
        prop_assert_eq!(strip(&fenced), body.trim());
    }

    /// Property: parsing never panics, whatever the model says
    #[test]
    fn prop_parse_never_panics(text in "\\PC{0,300}") {
        let steps = parse_plan_steps(&text);
        if let Some(plan) = Plan::new(steps) {
            prop_assert!(plan.steps().iter().all(|s| !s.trim().is_empty()));
        }
    }

    /// Property: a JSON array of steps survives fences and surrounding prose
    #[test]
    fn prop_parse_recovers_wrapped_array(
        steps in prop::collection::vec("[a-zA-Z0-9][a-zA-Z0-9 ]{0,39}", 1..8),
        prefix in "[a-zA-Z ,.:]{0,40}",
        suffix in "[a-zA-Z ,.:]{0,40}",
        fence in any::<bool>(),
    ) {
        let array = serde_json::to_string(&steps).unwrap();
        let body = if fence { format!("```json\n{array}\n```") } else { array };
        let text = format!("{prefix}{body}{suffix}");

        prop_assert_eq!(parse_plan_steps(&text), steps);
    }
}
