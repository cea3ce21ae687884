// launcher badge strategies, resolved once at startup
//
// broadcast: the Unity LauncherEntry signal on the session bus, understood by
// dash-to-dock, KDE task manager, plank and friends. native: whatever the toolkit
// offers directly (dock badge on macOS).

use crate::badge::{BadgeChannel, BadgeError, BadgeUpdate};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use zbus::names::BusName;
use zbus::zvariant::{ObjectPath, Value};
use zbus::Connection;

pub const LAUNCHER_INTERFACE: &str = "com.canonical.Unity.LauncherEntry";
const UPDATE_SIGNAL: &str = "Update";

/// Emits `com.canonical.Unity.LauncherEntry.Update` for one desktop entry.
pub struct DbusLauncher {
    connection: Connection,
    app_uri: String,
    path: ObjectPath<'static>,
}

impl DbusLauncher {
    pub async fn connect(app_id: &str, app_uri: String) -> Result<Self, BadgeError> {
        let connection = Connection::session().await?;
        let path = ObjectPath::try_from(object_path_for(app_id)).map_err(zbus::Error::from)?;
        info!("[launcher] broadcasting {} on {}", app_uri, path);

        Ok(Self {
            connection,
            app_uri,
            path,
        })
    }
}

impl BadgeChannel for DbusLauncher {
    fn name(&self) -> &'static str {
        "unity-launcher-dbus"
    }

    fn send(&self, update: BadgeUpdate) -> BoxFuture<'_, Result<(), BadgeError>> {
        Box::pin(async move {
            let properties = update_properties(update);
            self.connection
                .emit_signal(
                    None::<BusName<'_>>,
                    self.path.clone(),
                    LAUNCHER_INTERFACE,
                    UPDATE_SIGNAL,
                    &(self.app_uri.as_str(), properties),
                )
                .await?;
            Ok(())
        })
    }
}

// "io.github.foo-bar" -> "/io/github/foo_bar"
fn object_path_for(app_id: &str) -> String {
    let segments: Vec<String> = app_id
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect()
        })
        .collect();
    format!("/{}", segments.join("/"))
}

fn update_properties(update: BadgeUpdate) -> HashMap<&'static str, Value<'static>> {
    let mut properties = HashMap::new();
    if let Some(visible) = update.visible {
        properties.insert("count-visible", Value::from(visible));
    }
    if let Some(count) = update.count {
        properties.insert("count", Value::from(count));
    }
    properties
}

/// The badge strategy picked by [`LauncherChannel::probe`].
pub enum LauncherChannel {
    Native(Arc<dyn BadgeChannel>),
    Broadcast(DbusLauncher),
    /// sends fail and get logged; the widget keeps working without a badge
    Unavailable,
}

impl LauncherChannel {
    /// Prefers the native channel when the toolkit supplied one, else tries the
    /// session bus.
    pub async fn probe(native: Option<Arc<dyn BadgeChannel>>, app_id: &str, app_uri: String) -> Self {
        if let Some(native) = native {
            info!("[launcher] native badge available: {}", native.name());
            return Self::Native(native);
        }

        match DbusLauncher::connect(app_id, app_uri).await {
            Ok(launcher) => Self::Broadcast(launcher),
            Err(e) => {
                warn!("[launcher] no badge channel, session bus unavailable: {}", e);
                Self::Unavailable
            }
        }
    }
}

impl BadgeChannel for LauncherChannel {
    fn name(&self) -> &'static str {
        match self {
            Self::Native(native) => native.name(),
            Self::Broadcast(launcher) => launcher.name(),
            Self::Unavailable => "unavailable",
        }
    }

    fn send(&self, update: BadgeUpdate) -> BoxFuture<'_, Result<(), BadgeError>> {
        match self {
            Self::Native(native) => native.send(update),
            Self::Broadcast(launcher) => launcher.send(update),
            Self::Unavailable => Box::pin(async { Err(BadgeError::Unavailable) }),
        }
    }
}
