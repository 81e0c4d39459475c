use std::sync::Arc;

use crate::config::Config;
use crate::materialize::NoteMaterializer;

/// Shared application state injected into all route handlers via Axum
/// extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub materializer: Arc<NoteMaterializer>,
}
