//! Background startup for the Observer server.
//!
//! [`spawn_observer`] binds the listener up front, so address errors
//! surface before the game starts, then serves on a background Tokio task
//! alongside the autoplay loop.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::error;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Bind `config` and serve the Observer API on a background task.
///
/// The server runs until the runtime shuts down or the returned handle
/// is aborted.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, ServerError> {
    let listener = server::bind(config).await?;
    Ok(tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            error!(error = %e, "Observer server exited");
        }
    }))
}
