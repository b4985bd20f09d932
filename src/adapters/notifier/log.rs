use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::errors::NotifyError;
use crate::domain::ports::{Notification, Notifier};

/// Used when no robot webhook is configured: the delivery is skipped and the
/// report is kept in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        warn!(title = %notification.title, "no notification webhook configured; skipping delivery");
        info!(
            title = %notification.title,
            body = %notification.body,
            "undelivered diagnosis notification"
        );
        Ok(())
    }
}
