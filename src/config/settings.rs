use serde::Deserialize;

use crate::connection::Framing;

/// Top-level configuration settings for the application.
///
/// Includes settings for both the server and the live view engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub view: ViewSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// How the topic of a new connection is derived from its handshake.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopicStrategy {
    /// Request path plus the handshake challenge key: one topic per socket.
    #[default]
    Handshake,
    /// Request path plus the viewer id: every tab of a viewer shares a topic.
    Viewer,
}

/// Settings of the live view engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ViewSettings {
    /// Used in the viewer cookie name, `_glv_key_<name>`.
    pub name: String,
    pub topic_strategy: TopicStrategy,
    pub framing: Framing,
    pub error_target: String,
    pub error_template: String,
    pub flash_target: String,
    pub flash_template: String,
    pub flash_duration_ms: u64,
    pub page_template: String,
}

impl ViewSettings {
    pub fn cookie_name(&self) -> String {
        format!("_glv_key_{}", self.name.trim())
    }

    pub fn flash_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.flash_duration_ms)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub view: Option<PartialViewSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialViewSettings {
    pub name: Option<String>,
    pub topic_strategy: Option<TopicStrategy>,
    pub framing: Option<Framing>,
    pub error_target: Option<String>,
    pub error_template: Option<String>,
    pub flash_target: Option<String>,
    pub flash_template: Option<String>,
    pub flash_duration_ms: Option<u64>,
    pub page_template: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            view: ViewSettings::default(),
        }
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            name: "glv".to_string(),
            topic_strategy: TopicStrategy::Handshake,
            framing: Framing::Text,
            error_target: "glv-error".to_string(),
            error_template: "glv-error".to_string(),
            flash_target: "glv-flash".to_string(),
            flash_template: "glv-flash-message".to_string(),
            flash_duration_ms: 2000,
            page_template: "layout".to_string(),
        }
    }
}

impl PartialSettings {
    /// Fills every missing value from `Settings::default()`.
    pub fn merge_with_defaults(self) -> Settings {
        let default = Settings::default();
        let server = self.server.unwrap_or_default();
        let view = self.view.unwrap_or_default();
        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            view: ViewSettings {
                name: view.name.unwrap_or(default.view.name),
                topic_strategy: view.topic_strategy.unwrap_or(default.view.topic_strategy),
                framing: view.framing.unwrap_or(default.view.framing),
                error_target: view.error_target.unwrap_or(default.view.error_target),
                error_template: view.error_template.unwrap_or(default.view.error_template),
                flash_target: view.flash_target.unwrap_or(default.view.flash_target),
                flash_template: view.flash_template.unwrap_or(default.view.flash_template),
                flash_duration_ms: view
                    .flash_duration_ms
                    .unwrap_or(default.view.flash_duration_ms),
                page_template: view.page_template.unwrap_or(default.view.page_template),
            },
        }
    }
}
