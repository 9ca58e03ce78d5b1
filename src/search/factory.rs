//! Factory function for creating resource finders

use super::{ElasticsearchFinder, QueryError, ResourceFinder};
use crate::config::{SearchEngine, SearchSettings};
use std::sync::Arc;
use tracing::info;

/// Create the resource finder for the configured search engine.
pub fn create_resource_finder(
    settings: &SearchSettings,
    index: &str,
) -> Result<Arc<dyn ResourceFinder>, QueryError> {
    match settings.engine {
        SearchEngine::Elasticsearch => {
            info!(
                "Creating Elasticsearch finder at {} (index: {})",
                settings.endpoint, index
            );
            Ok(Arc::new(ElasticsearchFinder::new(settings, index)?))
        }
    }
}
