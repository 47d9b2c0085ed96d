//! Inbound push messages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Extra naming the built-in presentation a message asks for.
pub const BUILT_IN_TYPE: &str = "builtInType";

/// A push message as delivered by the platform: a flat map of string extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushMessage {
    extras: BTreeMap<String, String>,
}

/// A message the platform renders itself instead of handing it to the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltIn {
    /// Short transient text.
    Toast { text: String },
    /// Status-bar notification.
    Notification(NotificationSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSpec {
    pub content_title: Option<String>,
    pub content_text: Option<String>,
    pub ticker_text: Option<String>,
    pub number: Option<i32>,
    /// Action to launch when tapped; the app's main entry point when absent.
    pub action: Option<String>,
    /// Passed along to the launched action.
    pub payload: Option<String>,
}

/// How a message wants to be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    BuiltIn(BuiltIn),
    /// Carries a `builtInType` this client does not know.
    Unrecognized(String),
    /// Carries no `builtInType`; the application handles it.
    Custom,
}

impl PushMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extras
    }

    pub fn presentation(&self) -> Presentation {
        let Some(kind) = self.extra(BUILT_IN_TYPE) else {
            return Presentation::Custom;
        };
        match kind {
            "toast" => Presentation::BuiltIn(BuiltIn::Toast {
                text: self.extra("text").unwrap_or_default().to_string(),
            }),
            "notification" => Presentation::BuiltIn(BuiltIn::Notification(self.notification())),
            other => Presentation::Unrecognized(other.to_string()),
        }
    }

    fn notification(&self) -> NotificationSpec {
        let owned = |key: &str| self.extra(key).map(str::to_string);
        let number = self.extra("number").and_then(|raw| {
            raw.trim()
                .parse()
                .inspect_err(|_| warn!(number = raw, "ignoring non-numeric notification number"))
                .ok()
        });
        NotificationSpec {
            content_title: owned("contentTitle"),
            // Older server scripts send the body under "contextText".
            content_text: owned("contentText").or_else(|| owned("contextText")),
            ticker_text: owned("tickerText"),
            number,
            action: owned("action"),
            payload: owned("payload"),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PushMessage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            extras: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
