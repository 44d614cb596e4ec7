use std::sync::Arc;

use shared::JobQueue;
use sqlx::PgPool;

use crate::config::Config;

/// Explicitly constructed process-wide services, passed by handle to every
/// handler instead of living in module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: JobQueue,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, queue: JobQueue, config: Config) -> Self {
        Self {
            db,
            queue,
            config: Arc::new(config),
        }
    }
}
