//! Response sanitizing and defensive plan parsing.
//!
//! Generated text is not guaranteed to be well-formed: reports arrive wrapped
//! in code fences and plans arrive as JSON surrounded by prose. Nothing here
//! fails; unusable input yields an empty result.

use tracing::{debug, warn};

const FENCE: &str = "```";

/// Remove one leading code fence (with optional language tag such as
/// `markdown` or `json`) and one trailing fence, then trim.
///
/// Text without fences is only trimmed, so clean text passes through
/// unchanged.
pub fn strip(text: &str) -> String {
    let mut out = text.trim();

    if let Some(rest) = out.strip_prefix(FENCE) {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+'))
            .unwrap_or(rest.len());
        out = &rest[tag_len..];
    }

    if let Some(rest) = out.strip_suffix(FENCE) {
        out = rest;
    }

    out.trim().to_string()
}

/// Parse a planner answer into step descriptions.
///
/// Tries, in order: the raw text as a JSON array of strings; the fence-stripped
/// text; the substring between the first `[` and the last `]`. Returns an
/// empty list when every attempt fails.
pub fn parse_plan_steps(text: &str) -> Vec<String> {
    if let Ok(steps) = serde_json::from_str::<Vec<String>>(text.trim()) {
        return steps;
    }

    let stripped = strip(text);
    if let Ok(steps) = serde_json::from_str::<Vec<String>>(&stripped) {
        debug!("plan parsed after removing code fences");
        return steps;
    }

    let (Some(start), Some(end)) = (stripped.find('['), stripped.rfind(']')) else {
        warn!(response_len = text.len(), "planner answer contains no JSON array");
        return Vec::new();
    };
    if start >= end {
        warn!(response_len = text.len(), "planner answer has unbalanced brackets");
        return Vec::new();
    }

    match serde_json::from_str::<Vec<String>>(&stripped[start..=end]) {
        Ok(steps) => {
            debug!(steps = steps.len(), "plan extracted from surrounding text");
            steps
        }
        Err(err) => {
            warn!(error = %err, "planner answer is not a JSON array of strings");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown_fence() {
        assert_eq!(strip("```markdown\n# Title\n```"), "# Title");
    }

    #[test]
    fn test_strip_plain_fence() {
        assert_eq!(strip("```\nbody\n```"), "body");
    }

    #[test]
    fn test_strip_clean_text_is_noop() {
        let clean = "# Report\n\nAll good.";
        assert_eq!(strip(clean), clean);
        assert_eq!(strip(&strip(clean)), clean);
    }

    #[test]
    fn test_strip_only_one_pair() {
        assert_eq!(strip("```json\n```inner```\n```"), "```inner```");
    }

    #[test]
    fn test_parse_direct_array() {
        assert_eq!(parse_plan_steps(r#"["a","b"]"#), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_fenced_array() {
        assert_eq!(parse_plan_steps("```json\n[\"a\",\"b\"]\n```"), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_not_json() {
        assert!(parse_plan_steps("not json").is_empty());
    }

    #[test]
    fn test_parse_embedded_array() {
        assert_eq!(parse_plan_steps(r#"prefix [ "a" ] suffix"#), vec!["a"]);
    }

    #[test]
    fn test_parse_reversed_brackets() {
        assert!(parse_plan_steps("] then [").is_empty());
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_plan_steps("[]").is_empty());
    }
}
