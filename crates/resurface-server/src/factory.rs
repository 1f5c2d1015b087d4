//! Factory for creating the review service from configuration.

use std::sync::Arc;

use resurface_core::config::ResurfaceConfig;
use resurface_core::error::ResurfaceResult;
use resurface_core::{ReviewService, SqliteStore};
use tracing::info;

/// Create a ReviewService backed by the configured SQLite database.
pub fn create_service(config: &ResurfaceConfig) -> ResurfaceResult<ReviewService> {
    let store = Arc::new(SqliteStore::new(&config.database_path)?);
    info!(
        database = %config.database_path.display(),
        utc_offset_minutes = config.utc_offset_minutes,
        seeded = config.rng_seed.is_some(),
        "Opened review store"
    );

    ReviewService::from_config(config, store.clone(), store.clone(), store)
}

/// Load configuration from `RESURFACE_CONFIG` if set, then apply env overrides.
pub fn load_config() -> ResurfaceResult<ResurfaceConfig> {
    let config = match std::env::var("RESURFACE_CONFIG") {
        Ok(path) => ResurfaceConfig::from_file(path)?.with_env_overrides(),
        Err(_) => ResurfaceConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}
