use std::sync::Arc;

use crate::config::ServerConfig;
use crate::service::ProgressService;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// The reconciler service over the configured persistence store.
    pub service: ProgressService,
    /// Server configuration (read by the auth extractor and middleware).
    pub config: Arc<ServerConfig>,
}
