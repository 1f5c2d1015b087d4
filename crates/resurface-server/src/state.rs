//! Server state management.

use std::sync::Arc;

use resurface_core::error::ResurfaceResult;
use resurface_core::ReviewService;

use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReviewService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: ReviewService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Run a service call on the blocking pool.
    ///
    /// Storage calls block on SQLite, so they never run on the async workers.
    pub async fn run<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&ReviewService) -> ResurfaceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| ApiError::internal(format!("review task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
