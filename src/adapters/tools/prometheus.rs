//! PromQL range queries, summarized for a language model.
//!
//! Raw series are downsampled with Largest-Triangle-Three-Buckets so each
//! series contributes at most [`MAX_POINTS`] points to the prompt.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::errors::ToolError;
use crate::domain::models::config::ToolsConfig;
use crate::domain::ports::{Tool, ToolSpec};

pub const NAME: &str = "prometheus_query_range";
pub const DEFAULT_RANGE_MINUTES: i64 = 30;
pub const MAX_POINTS: usize = 20;
const MIN_STEP_SECS: i64 = 15;

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
    #[serde(default)]
    range_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PromResponse {
    status: String,
    #[serde(default)]
    data: Option<PromData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromData {
    #[serde(default)]
    result: Vec<PromSeries>,
}

#[derive(Debug, Deserialize)]
struct PromSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    /// `[unix_seconds, "value"]` pairs.
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Query step for a range: about twenty points, never finer than 15s.
pub fn step_secs(range_minutes: i64) -> i64 {
    MIN_STEP_SECS.max(range_minutes * 60 / 20)
}

pub struct PrometheusTool {
    client: Client,
    endpoint: Option<String>,
}

impl PrometheusTool {
    pub fn new(config: &ToolsConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.prometheus_timeout_secs))
            .build()
            .map_err(|e| ToolError::Upstream(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config
                .prometheus_endpoint
                .as_deref()
                .map(|e| e.trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
        })
    }
}

#[async_trait]
impl Tool for PrometheusTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: NAME.to_string(),
            description: "Query Prometheus metrics over a recent time range. Use it for \
                          CPU, memory, QPS and error-rate trends."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "PromQL expression, e.g. 'up' or 'sum(rate(http_requests_total[5m]))'"
                    },
                    "range_minutes": {
                        "type": "integer",
                        "description": "How many minutes back to query. Defaults to 30."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let Some(endpoint) = &self.endpoint else {
            return Err(ToolError::NotConfigured(
                "no Prometheus endpoint configured".to_string(),
            ));
        };
        let args: QueryArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".to_string()));
        }
        let range = args
            .range_minutes
            .filter(|r| *r > 0)
            .unwrap_or(DEFAULT_RANGE_MINUTES);

        let end = Utc::now().timestamp();
        let start = end - range * 60;
        let step = step_secs(range);
        info!(query = %args.query, range_minutes = range, step_secs = step, "running PromQL range query");

        let response = self
            .client
            .get(format!("{endpoint}/api/v1/query_range"))
            .query(&[
                ("query", args.query.clone()),
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("step", step.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                ToolError::Upstream(format!("Prometheus unreachable at {endpoint}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Prometheus returned an error status");
            return Err(ToolError::Upstream(format!(
                "Prometheus returned status {}",
                status.as_u16()
            )));
        }

        let body: PromResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("unreadable Prometheus response: {e}")))?;
        if body.status != "success" {
            return Err(ToolError::Upstream(format!(
                "Prometheus query failed: {}",
                body.error.unwrap_or(body.status)
            )));
        }

        let series = body.data.map(|d| d.result).unwrap_or_default();
        if series.is_empty() {
            return Ok("Query succeeded but returned no data for this time range. \
                       Check that the PromQL labels are correct."
                .to_string());
        }
        Ok(summarize(&series, range))
    }
}

fn summarize(series: &[PromSeries], range: i64) -> String {
    let mut out = format!("Query succeeded (trend over the last {range} minutes):\n");
    for item in series {
        let labels = serde_json::to_string(&item.metric).unwrap_or_default();
        let points: Vec<(f64, f64)> = item
            .values
            .iter()
            .filter_map(|(ts, v)| v.parse::<f64>().ok().map(|v| (*ts, v)))
            .collect();
        let rendered: Vec<String> = downsample(&points, MAX_POINTS)
            .into_iter()
            .map(|(ts, v)| format!("{}:{v:.2}", clock_label(ts)))
            .collect();
        out.push_str(&format!(
            "- labels: {labels}\n  points (time:value): [{}]\n",
            rendered.join(", ")
        ));
    }
    out.push_str(&format!(
        "(points are HH:MM:value, downsampled to at most {MAX_POINTS} with LTTB)"
    ));
    out
}

fn clock_label(ts: f64) -> String {
    Local
        .timestamp_opt(ts as i64, 0)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Largest-Triangle-Three-Buckets downsampling. Keeps the first and last
/// point; returns the input unchanged when it is already small enough.
pub fn downsample(points: &[(f64, f64)], threshold: usize) -> Vec<(f64, f64)> {
    let n = points.len();
    if threshold >= n || threshold < 3 {
        return points.to_vec();
    }

    let bucket = (n - 2) as f64 / (threshold - 2) as f64;
    let mut sampled = Vec::with_capacity(threshold);
    sampled.push(points[0]);
    let mut anchor = 0usize;

    for i in 0..threshold - 2 {
        let next_start = ((i + 1) as f64 * bucket) as usize + 1;
        let next_end = (((i + 2) as f64 * bucket) as usize + 1).min(n);
        let next = if next_start < next_end {
            &points[next_start..next_end]
        } else {
            &points[n - 1..]
        };
        let len = next.len() as f64;
        let avg_x = next.iter().map(|p| p.0).sum::<f64>() / len;
        let avg_y = next.iter().map(|p| p.1).sum::<f64>() / len;

        let start = (i as f64 * bucket) as usize + 1;
        let end = (((i + 1) as f64 * bucket) as usize + 1).min(n - 1);
        let (ax, ay) = points[anchor];
        let mut best = start;
        let mut best_area = -1.0;
        for (j, &(x, y)) in points.iter().enumerate().take(end.max(start + 1)).skip(start) {
            let area = ((ax - avg_x) * (y - ay) - (ax - x) * (avg_y - ay)).abs();
            if area > best_area {
                best_area = area;
                best = j;
            }
        }
        sampled.push(points[best]);
        anchor = best;
    }

    sampled.push(points[n - 1]);
    sampled
}

impl std::fmt::Debug for PrometheusTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusTool")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(endpoint: Option<String>) -> PrometheusTool {
        PrometheusTool::new(&ToolsConfig {
            prometheus_endpoint: endpoint,
            prometheus_timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_step_calculation() {
        assert_eq!(step_secs(5), 15);
        assert_eq!(step_secs(30), 90);
        assert_eq!(step_secs(60), 180);
    }

    #[test]
    fn test_downsample_keeps_endpoints_and_peak() {
        let mut points: Vec<(f64, f64)> = (0..100).map(|i| (i as f64, 1.0)).collect();
        points[57].1 = 500.0;
        let sampled = downsample(&points, 20);
        assert_eq!(sampled.len(), 20);
        assert_eq!(sampled[0], points[0]);
        assert_eq!(sampled[19], points[99]);
        assert!(sampled.contains(&(57.0, 500.0)));
    }

    #[test]
    fn test_downsample_small_input_untouched() {
        let points = vec![(1.0, 2.0), (2.0, 3.0)];
        assert_eq!(downsample(&points, 20), points);
    }

    #[tokio::test]
    async fn test_range_query_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query_range"))
            .and(query_param("query", "up"))
            .and(query_param("step", "180"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "matrix",
                    "result": [{
                        "metric": {"instance": "svc-1"},
                        "values": [[1700000000.0, "1"], [1700000180.0, "0.5"]]
                    }]
                }
            })))
            .mount(&server)
            .await;

        let text = tool(Some(server.uri()))
            .call(json!({"query": "up", "range_minutes": 60}))
            .await
            .unwrap();
        assert!(text.contains("last 60 minutes"));
        assert!(text.contains(r#"{"instance":"svc-1"}"#));
        assert!(text.contains(":1.00"));
        assert!(text.contains(":0.50"));
    }

    #[tokio::test]
    async fn test_empty_result_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "matrix", "result": []}
            })))
            .mount(&server)
            .await;

        let text = tool(Some(server.uri()))
            .call(json!({"query": "up"}))
            .await
            .unwrap();
        assert!(text.contains("no data"));
    }

    #[tokio::test]
    async fn test_error_status_is_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = tool(Some(server.uri()))
            .call(json!({"query": "up"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_and_bad_args() {
        let err = tool(None).call(json!({"query": "up"})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));

        let err = tool(Some("http://127.0.0.1:1".to_string()))
            .call(json!({"range_minutes": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
