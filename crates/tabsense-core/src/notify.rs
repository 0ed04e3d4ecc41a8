//! User-visible notifications

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use tabsense_tabs::TabError;

pub type NotifyFuture<'a> = BoxFuture<'a, Result<(), TabError>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn focus_complete() -> Self {
        Self {
            title: "Focus session complete".to_string(),
            message: "Great job! Your focus session has ended.".to_string(),
        }
    }
}

/// Host primitive for showing a notification
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> NotifyFuture<'_>;
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> NotifyFuture<'_> {
        Box::pin(async move {
            tracing::info!(
                title = %notification.title,
                message = %notification.message,
                "Notification"
            );
            Ok(())
        })
    }
}
