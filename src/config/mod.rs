mod file_config;

pub use file_config::{
    AgedActionConfig, EmailConfig, EndpointConfig, EventReportersConfig, FileConfig,
    NotifyConfig, SearchEngineConfig, SlackConfig, UserDatasourceConfig, WebhookConfig,
};

use crate::hooks::{EventAction, HookMethod};
use crate::lifecycle::parse_duration;
use crate::server::RequestsLoggingLevel;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_INTERVAL: &str = "15m";
pub const DEFAULT_SHUTDOWN_GRACE: &str = "60s";
pub const DEFAULT_INDEX: &str = "resources";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "http://127.0.0.1:9200";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config file {path:?}: {message}")]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Missing required setting '{0}'")]
    Missing(&'static str),

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchEngine {
    #[default]
    Elasticsearch,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub engine: SearchEngine,
    pub endpoint: String,
    /// Path segment between index and id for single document fetches.
    pub doc_type: String,
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            engine: SearchEngine::Elasticsearch,
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            doc_type: "_doc".to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Base URL and auth token of one of the action APIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionEndpoint {
    pub endpoint: String,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct NotifySettings {
    /// Age literals as configured, unsorted.
    pub ages: Vec<String>,
    pub api: ActionEndpoint,
}

#[derive(Debug, Clone, Default)]
pub struct AgedActionSettings {
    pub age: String,
    pub api: ActionEndpoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserDatasourceSettings {
    Rest {
        endpoint: String,
        token: String,
        timeout: Duration,
    },
}

impl Default for UserDatasourceSettings {
    fn default() -> Self {
        UserDatasourceSettings::Rest {
            endpoint: String::new(),
            token: String::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub from: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackSettings {
    pub endpoint: String,
    pub channel: Option<String>,
    pub username: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterSettings {
    Slack(SlackSettings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub endpoint: String,
    pub token: Option<String>,
    pub method: HookMethod,
    pub actions: Vec<EventAction>,
}

/// Resolved, validated configuration. Built once at startup and shared
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: String,
    /// Public prefix of the renewal links, e.g. `https://host/v1/reaper`.
    pub base_url: String,
    pub redirect_url: String,
    pub spinup_url: String,
    pub spinup_site_url: String,
    pub interval: Duration,
    pub shutdown_grace: Duration,
    pub log_level: String,
    pub requests_logging_level: RequestsLoggingLevel,
    pub encryption_secret: String,
    pub index: String,
    /// Extra exact-match filters applied to every phase query.
    pub filter: BTreeMap<String, String>,

    pub search: SearchSettings,
    pub notify: NotifySettings,
    pub decommission: AgedActionSettings,
    pub destroy: AgedActionSettings,
    pub tagging: ActionEndpoint,
    pub user_datasource: UserDatasourceSettings,
    pub email: Option<EmailSettings>,
    pub event_reporters: Vec<ReporterSettings>,
    pub webhooks: Vec<WebhookSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen: DEFAULT_LISTEN.to_string(),
            base_url: String::new(),
            redirect_url: String::new(),
            spinup_url: String::new(),
            spinup_site_url: String::new(),
            interval: Duration::from_secs(15 * 60),
            shutdown_grace: Duration::from_secs(60),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            requests_logging_level: RequestsLoggingLevel::default(),
            encryption_secret: String::new(),
            index: DEFAULT_INDEX.to_string(),
            filter: BTreeMap::new(),
            search: SearchSettings::default(),
            notify: NotifySettings::default(),
            decommission: AgedActionSettings::default(),
            destroy: AgedActionSettings::default(),
            tagging: ActionEndpoint::default(),
            user_datasource: UserDatasourceSettings::default(),
            email: None,
            event_reporters: Vec::new(),
            webhooks: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from the TOML file contents.
    pub fn resolve(file: FileConfig) -> Result<Self, ConfigError> {
        let interval = duration_setting(
            "interval",
            file.interval.as_deref().unwrap_or(DEFAULT_INTERVAL),
        )?;
        if interval.is_zero() {
            return Err(ConfigError::invalid("interval", "must be greater than zero"));
        }
        let shutdown_grace = duration_setting(
            "shutdown_grace",
            file.shutdown_grace
                .as_deref()
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE),
        )?;

        let log_level = file
            .log_level
            .map(|level| level.to_lowercase())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::invalid(
                "log_level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        let requests_logging_level = match file.requests_logging_level {
            Some(level) => level
                .parse()
                .map_err(|err: String| ConfigError::invalid("requests_logging_level", err))?,
            None => RequestsLoggingLevel::default(),
        };

        let encryption_secret = required(file.encryption_secret, "encryption_secret")?;

        let notify_file = file.notify.ok_or(ConfigError::Missing("notify"))?;
        if notify_file.age.is_empty() {
            return Err(ConfigError::Missing("notify.age"));
        }
        for age in &notify_file.age {
            duration_setting("notify.age", age)?;
        }
        let notify = NotifySettings {
            ages: notify_file.age,
            api: ActionEndpoint {
                endpoint: required(notify_file.endpoint, "notify.endpoint")?,
                token: notify_file.token.unwrap_or_default(),
            },
        };

        let decommission = aged_action(
            file.decommission,
            "decommission",
            "decommission.age",
            "decommission.endpoint",
        )?;
        let destroy = aged_action(file.destroy, "destroy", "destroy.age", "destroy.endpoint")?;

        let tagging_file = file.tagging.ok_or(ConfigError::Missing("tagging"))?;
        let tagging = ActionEndpoint {
            endpoint: required(tagging_file.endpoint, "tagging.endpoint")?,
            token: tagging_file.token.unwrap_or_default(),
        };

        let search_file = file.search_engine.unwrap_or_default();
        let engine = match search_file.kind.as_deref() {
            None | Some("elasticsearch") => SearchEngine::Elasticsearch,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "search_engine.type",
                    format!("unknown search engine '{}'", other),
                ))
            }
        };
        let search = SearchSettings {
            engine,
            endpoint: search_file
                .endpoint
                .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string()),
            doc_type: search_file.doc_type.unwrap_or_else(|| "_doc".to_string()),
            timeout: match search_file.timeout {
                Some(timeout) => duration_setting("search_engine.timeout", &timeout)?,
                None => DEFAULT_HTTP_TIMEOUT,
            },
        };

        let user_datasource = match file.user_datasource {
            Some(UserDatasourceConfig::Rest {
                endpoint,
                token,
                timeout,
            }) => UserDatasourceSettings::Rest {
                endpoint: required(endpoint, "user_datasource.endpoint")?,
                token: required(token, "user_datasource.token")?,
                timeout: match timeout {
                    Some(timeout) => duration_setting("user_datasource.timeout", &timeout)?,
                    None => DEFAULT_HTTP_TIMEOUT,
                },
            },
            None => return Err(ConfigError::Missing("user_datasource")),
        };

        let email = file.email.map(resolve_email).transpose()?;

        let mut event_reporters = Vec::new();
        if let Some(reporters) = file.event_reporters {
            if let Some(slack) = reporters.slack {
                event_reporters.push(ReporterSettings::Slack(SlackSettings {
                    endpoint: required(slack.endpoint, "event_reporters.slack.endpoint")?,
                    channel: slack.channel,
                    username: slack.username,
                    icon: slack.icon,
                }));
            }
        }

        let webhooks = file
            .webhooks
            .into_iter()
            .map(resolve_webhook)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AppConfig {
            listen: file.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            base_url: required(file.base_url, "base_url")?
                .trim_end_matches('/')
                .to_string(),
            redirect_url: required(file.redirect_url, "redirect_url")?,
            spinup_url: file.spinup_url.unwrap_or_default(),
            spinup_site_url: file.spinup_site_url.unwrap_or_default(),
            interval,
            shutdown_grace,
            log_level,
            requests_logging_level,
            encryption_secret,
            index: file.index.unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            filter: file.filter,
            search,
            notify,
            decommission,
            destroy,
            tagging,
            user_datasource,
            email,
            event_reporters,
            webhooks,
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn duration_setting(key: &str, literal: &str) -> Result<Duration, ConfigError> {
    parse_duration(literal).map_err(|err| ConfigError::invalid(key, err.to_string()))
}

fn aged_action(
    file: Option<AgedActionConfig>,
    section: &'static str,
    age_key: &'static str,
    endpoint_key: &'static str,
) -> Result<AgedActionSettings, ConfigError> {
    let file = file.ok_or(ConfigError::Missing(section))?;
    let age = required(file.age, age_key)?;
    duration_setting(age_key, &age)?;
    Ok(AgedActionSettings {
        age,
        api: ActionEndpoint {
            endpoint: required(file.endpoint, endpoint_key)?,
            token: file.token.unwrap_or_default(),
        },
    })
}

fn resolve_email(file: EmailConfig) -> Result<EmailSettings, ConfigError> {
    let mailserver = required(file.mailserver, "email.mailserver")?;
    let (host, port) = mailserver
        .rsplit_once(':')
        .filter(|(host, _)| !host.is_empty())
        .ok_or_else(|| {
            ConfigError::invalid("email.mailserver", "expected the form host:port")
        })?;
    let port: u16 = port
        .parse()
        .map_err(|_| ConfigError::invalid("email.mailserver", "port is not a number"))?;

    let from = required(file.from, "email.from")?;
    if from.matches('@').count() != 1 {
        return Err(ConfigError::invalid(
            "email.from",
            "expected an address like someone@example.edu",
        ));
    }

    Ok(EmailSettings {
        host: host.to_string(),
        port,
        from,
        username: file.username.filter(|value| !value.is_empty()),
        password: file.password.filter(|value| !value.is_empty()),
    })
}

fn resolve_webhook(file: WebhookConfig) -> Result<WebhookSettings, ConfigError> {
    let endpoint = required(file.endpoint, "webhooks.endpoint")?;
    let method = required(file.method, "webhooks.method")?
        .parse::<HookMethod>()
        .map_err(|err| ConfigError::invalid("webhooks.method", err.to_string()))?;
    let actions = file
        .actions
        .iter()
        .map(|action| action.parse::<EventAction>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ConfigError::invalid("webhooks.actions", err.to_string()))?;

    Ok(WebhookSettings {
        endpoint,
        token: file.token.filter(|token| !token.is_empty()),
        method,
        actions,
    })
}
