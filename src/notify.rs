// desktop notifications for weather alerts, over org.freedesktop.Notifications

use crate::config::NotificationConfig;
use futures::future::BoxFuture;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use zbus::zvariant::Value;
use zbus::Connection;

const NOTIFICATIONS_NAME: &str = "org.freedesktop.Notifications";
const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),
}

pub trait Notifier: Send + Sync {
    /// The returned future owns everything it needs so it can be spawned.
    fn notify(&self, message: String) -> BoxFuture<'static, Result<(), NotifyError>>;
}

pub struct DesktopNotifier {
    app_id: String,
    config: NotificationConfig,
}

impl DesktopNotifier {
    pub fn new(app_id: impl Into<String>, config: NotificationConfig) -> Self {
        Self {
            app_id: app_id.into(),
            config,
        }
    }

    fn summary_for(&self, message: String) -> String {
        if message.trim().is_empty() {
            self.config.fallback_message.clone()
        } else {
            message
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: String) -> BoxFuture<'static, Result<(), NotifyError>> {
        let summary = self.summary_for(message);
        let app_id = self.app_id.clone();
        let app_name = self.config.app_name.clone();
        let body = self.config.body.clone();

        Box::pin(async move {
            let connection = Connection::session().await?;

            let mut hints: HashMap<&str, Value<'_>> = HashMap::new();
            hints.insert("desktop-entry", Value::from(app_id.as_str()));

            connection
                .call_method(
                    Some(NOTIFICATIONS_NAME),
                    NOTIFICATIONS_PATH,
                    Some(NOTIFICATIONS_NAME),
                    "Notify",
                    &(
                        app_name.as_str(),
                        0u32,
                        app_id.as_str(),
                        summary.as_str(),
                        body.as_str(),
                        Vec::<&str>::new(),
                        hints,
                        -1i32,
                    ),
                )
                .await?;

            debug!("[notify] sent {:?}", summary);
            Ok(())
        })
    }
}
