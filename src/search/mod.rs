mod factory;
mod finder;
mod query;
mod resource;

pub use factory::create_resource_finder;
pub use finder::{ElasticsearchFinder, ResourceFinder, MAX_RESULTS};
pub use query::{build_bool_query, DateRangeQuery, TermFilter, DATE_FORMAT};
pub use resource::{Resource, ResourceStatus, NOTIFIED_AT_TAG, RENEWED_AT_TAG};

use thiserror::Error;

/// Failure to build or run a backend query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query has no range clauses")]
    Empty,

    #[error("range clause on '{0}' has no bounds")]
    Unbounded(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Search backend timed out")]
    Timeout,

    #[error("Search backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("resource '{0}' not found")]
    NotFound(String),

    #[error("Malformed search response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout
        } else {
            QueryError::Connection(err.to_string())
        }
    }
}
