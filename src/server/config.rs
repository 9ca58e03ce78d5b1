use super::RequestsLoggingLevel;
use crate::config::{AppConfig, DEFAULT_LISTEN};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl From<&AppConfig> for ServerConfig {
    fn from(config: &AppConfig) -> Self {
        ServerConfig {
            requests_logging_level: config.requests_logging_level,
            listen: config.listen.clone(),
        }
    }
}
