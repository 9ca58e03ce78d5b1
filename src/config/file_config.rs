use super::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw TOML configuration. Everything is optional here; `AppConfig::resolve`
/// decides what is required and fills in defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub base_url: Option<String>,
    pub redirect_url: Option<String>,
    pub spinup_url: Option<String>,
    pub spinup_site_url: Option<String>,
    pub interval: Option<String>,
    pub shutdown_grace: Option<String>,
    pub log_level: Option<String>,
    pub requests_logging_level: Option<String>,
    pub encryption_secret: Option<String>,
    pub index: Option<String>,
    pub filter: BTreeMap<String, String>,

    pub search_engine: Option<SearchEngineConfig>,
    pub notify: Option<NotifyConfig>,
    pub decommission: Option<AgedActionConfig>,
    pub destroy: Option<AgedActionConfig>,
    pub tagging: Option<EndpointConfig>,
    pub user_datasource: Option<UserDatasourceConfig>,
    pub email: Option<EmailConfig>,
    pub event_reporters: Option<EventReportersConfig>,
    pub webhooks: Vec<WebhookConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchEngineConfig {
    /// Search engine to use, only "elasticsearch" for now
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub endpoint: Option<String>,
    pub doc_type: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EndpointConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    pub age: Vec<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AgedActionConfig {
    pub age: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UserDatasourceConfig {
    Rest {
        endpoint: Option<String>,
        token: Option<String>,
        timeout: Option<String>,
    },
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EmailConfig {
    pub mailserver: Option<String>,
    pub from: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Event reporters keyed by name.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct EventReportersConfig {
    pub slack: Option<SlackConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SlackConfig {
    pub endpoint: Option<String>,
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub method: Option<String>,
    pub actions: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(&content).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse {
            path: None,
            message: err.to_string(),
        })
    }
}
