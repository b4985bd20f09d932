use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use crate::domain::errors::ToolError;
use crate::domain::ports::{Tool, ToolSpec};

pub const NAME: &str = "current_datetime";

/// Current local date and time, RFC 3339 with offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: NAME.to_string(),
            description: "Get the current system date and time. Use it when the question \
                          depends on the current time or when computing time ranges."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    async fn call(&self, _args: Value) -> Result<String, ToolError> {
        Ok(Local::now().to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_parseable_timestamp() {
        let text = DateTimeTool.call(json!({})).await.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&text).is_ok());
    }
}
