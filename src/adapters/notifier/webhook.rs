//! DingTalk-style markdown robot webhook.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::errors::NotifyError;
use crate::domain::models::config::NotificationConfig;
use crate::domain::ports::{Notification, Notifier};
use crate::infrastructure::logging::secret_scrubbing::scrub;

/// Posts `{"msgtype":"markdown","markdown":{"title","text"}}` to a robot URL.
///
/// Without a configured URL every send is skipped with a warning.
pub struct WebhookNotifier {
    client: Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = config
            .webhook_url
            .clone()
            .filter(|url| !url.trim().is_empty());
        Ok(Self { client, url })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(url) = &self.url else {
            warn!(title = %notification.title, "no notification webhook configured; skipping");
            return Ok(());
        };

        let message = json!({
            "msgtype": "markdown",
            "markdown": {
                "title": notification.title,
                "text": notification.body,
            }
        });

        let response = self.client.post(url).json(&message).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(
                url = %scrub(url),
                status = status.as_u16(),
                response = %body,
                "notification rejected"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(title = %notification.title, response = %body, "notification sent");
        Ok(())
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &self.url.as_deref().map(scrub))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(url: Option<String>) -> WebhookNotifier {
        WebhookNotifier::new(&NotificationConfig {
            webhook_url: url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_markdown_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/robot/send"))
            .and(query_param("access_token", "secret"))
            .and(body_json(json!({
                "msgtype": "markdown",
                "markdown": {"title": "t", "text": "body"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errcode":0}"#))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = notifier(Some(format!("{}/robot/send?access_token=secret", server.uri())));
        let notification = Notification {
            title: "t".to_string(),
            body: "body".to_string(),
        };
        notifier.send(&notification).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let notifier = notifier(Some(server.uri()));
        let err = notifier
            .send(&Notification::report("HighCPU", "abcd1234", "ok"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_skips() {
        let notifier = notifier(Some("   ".to_string()));
        assert!(!notifier.is_configured());
        notifier
            .send(&Notification::report("HighCPU", "abcd1234", "ok"))
            .await
            .unwrap();
    }
}
