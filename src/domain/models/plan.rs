use serde::{Deserialize, Serialize};

/// Ordered investigation steps produced once per session.
///
/// A `Plan` can only be constructed non-empty; an empty planner answer is a
/// session failure, not an empty success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<String>,
}

impl Plan {
    /// Build a plan from parsed steps. Blank steps are dropped; returns `None`
    /// when nothing usable is left.
    pub fn new(steps: Vec<String>) -> Option<Self> {
        let steps: Vec<String> = steps
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if steps.is_empty() {
            None
        } else {
            Some(Self { steps })
        }
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_rejected() {
        assert!(Plan::new(vec![]).is_none());
        assert!(Plan::new(vec!["  ".to_string(), String::new()]).is_none());
    }

    #[test]
    fn test_blank_steps_dropped() {
        let plan = Plan::new(vec!["check cpu".to_string(), " ".to_string()]).unwrap();
        assert_eq!(plan.steps(), ["check cpu"]);
    }
}
