//! Domain model: projects, webhooks, endpoints, builds and skips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status text the remote build system reports for a green build.
pub const SUCCESS_STATUS_TEXT: &str = "success";

/// A catalog step whose CI build should be triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Step identifier in the catalog.
    pub id: String,
    /// Human-readable title used in reports.
    pub title: String,
    /// Catalog version this project was taken from.
    pub version: String,
    /// Source repository URL (e.g. `https://github.com/org/repo.git`).
    pub source_url: String,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        version: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            version: version.into(),
            source_url: source_url.into(),
        }
    }
}

/// `{owner, name}` pair identifying a hosted repository.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A repository webhook as reported by the source-hosting provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    /// Event types the hook is subscribed to (`push`, `pull_request`, ...).
    #[serde(default)]
    pub events: Vec<String>,
    /// Free-form hook configuration; the callback lives under `url`.
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl Webhook {
    pub fn new(events: &[&str], url: &str) -> Self {
        let mut config = serde_json::Map::new();
        config.insert("url".to_string(), serde_json::Value::from(url));
        Self {
            events: events.iter().map(|e| e.to_string()).collect(),
            config,
        }
    }

    /// The callback URL, if the configuration carries a string-typed one.
    pub fn callback_url(&self) -> Option<&str> {
        self.config.get("url").and_then(serde_json::Value::as_str)
    }

    pub fn subscribes_to(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

/// The single build endpoint a project's webhooks point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Build target identifier (app slug).
    pub app_slug: String,
    /// Secret build trigger token.
    pub trigger_token: String,
}

/// Status snapshot of a remote build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    /// 0 while running, any other value is terminal.
    pub status: i64,
    /// Human-readable status (`success`, `error`, `aborted`, ...).
    #[serde(default)]
    pub status_text: String,
}

impl BuildStatus {
    pub fn new(status: i64, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }

    /// Terminal once the numeric code is nonzero.
    pub fn is_terminal(&self) -> bool {
        self.status != 0
    }

    pub fn is_success(&self) -> bool {
        self.status_text == SUCCESS_STATUS_TEXT
    }
}

/// A triggered remote build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub title: String,
    /// App identifier the build belongs to.
    pub app_slug: String,
    /// Remote build identifier.
    pub build_slug: String,
    /// Browse URL of the build.
    pub build_url: String,
    pub started_at: DateTime<Utc>,
    /// Latest status snapshot fetched by the poller.
    pub status: BuildStatus,
    /// When the poller first saw a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Build {
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn failed(&self) -> bool {
        !self.status.is_success()
    }

    /// Observed wall-clock duration, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// A project that could not be turned into a running build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skip {
    pub title: String,
    pub source_url: String,
    pub reason: String,
}

/// Raw answer of the build trigger endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResponse {
    pub http_status: u16,
    pub body: serde_json::Value,
}
