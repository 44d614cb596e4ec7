use serde::Serialize;
use shared::JobQueue;
use sqlx::PgPool;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: DependencyStatus,
    pub redis: DependencyStatus,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.database == DependencyStatus::Up && self.redis == DependencyStatus::Up
    }
}

pub async fn check(db: &PgPool, queue: &JobQueue) -> HealthStatus {
    let (database, redis) = tokio::join!(check_database(db), check_redis(queue));
    let status = if database == DependencyStatus::Up && redis == DependencyStatus::Up {
        "healthy"
    } else {
        "unhealthy"
    };
    HealthStatus {
        status,
        database,
        redis,
    }
}

async fn check_database(db: &PgPool) -> DependencyStatus {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(db).await {
        Ok(_) => DependencyStatus::Up,
        Err(err) => {
            error!(error = %err, "database health check failed");
            DependencyStatus::Down
        }
    }
}

async fn check_redis(queue: &JobQueue) -> DependencyStatus {
    match queue.ping().await {
        Ok(()) => DependencyStatus::Up,
        Err(err) => {
            error!(error = %err, "redis health check failed");
            DependencyStatus::Down
        }
    }
}
