use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::job::{EmailJob, JobEnvelope};

/// Logical name of the email notification queue.
pub const EMAIL_QUEUE: &str = "email_queue";

const KEY_PREFIX: &str = "ticketloom";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("job serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A dequeued job together with its raw list entry.
///
/// The raw entry is what sits on the active list; acknowledging or failing the
/// delivery removes exactly that entry.
#[derive(Debug)]
pub struct Delivery {
    pub envelope: JobEnvelope,
    raw: String,
}

impl Delivery {
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Redis-backed durable job queue using the reliable-list pattern.
///
/// Producers `LPUSH` onto the wait list; the consumer atomically moves an
/// entry onto the active list with a blocking `BLMOVE` and removes it only
/// after the job reaches a terminal state. Entries left on the active list by
/// a crashed worker are pushed back to the wait list on the next startup, so
/// delivery is at-least-once.
#[derive(Clone)]
pub struct JobQueue {
    conn: ConnectionManager,
    wait_key: String,
    active_key: String,
    failed_key: String,
}

impl JobQueue {
    pub async fn connect(redis_url: &str, queue_name: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        let (wait_key, active_key, failed_key) = queue_keys(queue_name);
        Ok(Self {
            conn,
            wait_key,
            active_key,
            failed_key,
        })
    }

    /// Enqueue a job for the worker. Returns the queue-assigned job id.
    pub async fn enqueue(&self, job: &EmailJob) -> Result<Uuid, QueueError> {
        let envelope = JobEnvelope::new(serde_json::to_value(job)?);
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(&self.wait_key, payload).await?;
        debug!(job_id = %envelope.id, email_type = %job.email_type, "enqueued notification job");
        Ok(envelope.id)
    }

    /// Block up to `timeout` for the next job, moving it onto the active list.
    ///
    /// Returns `None` on timeout. An entry that is not a valid [`JobEnvelope`]
    /// is moved straight to the failed list; retrying cannot fix it.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.wait_key)
            .arg(&self.active_key)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<JobEnvelope>(&raw) {
            Ok(envelope) => Ok(Some(Delivery { envelope, raw })),
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed queue entry to failed list");
                let _: i64 = conn.lrem(&self.active_key, 1, &raw).await?;
                let _: i64 = conn.lpush(&self.failed_key, &raw).await?;
                Ok(None)
            }
        }
    }

    /// Acknowledge a completed job, removing it from the active list.
    pub async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lrem(&self.active_key, 1, delivery.raw()).await?;
        Ok(())
    }

    /// Move an exhausted or poison job to the failed (dead-letter) list.
    pub async fn fail(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lrem(&self.active_key, 1, delivery.raw()).await?;
        let _: i64 = conn.lpush(&self.failed_key, delivery.raw()).await?;
        Ok(())
    }

    /// Push jobs a previous worker left on the active list back to the wait
    /// list. Called once at worker startup; returns how many were recovered.
    pub async fn recover_stale(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let mut recovered = 0;
        loop {
            let moved: Option<String> = redis::cmd("LMOVE")
                .arg(&self.active_key)
                .arg(&self.wait_key)
                .arg("RIGHT")
                .arg("LEFT")
                .query_async(&mut conn)
                .await?;
            if moved.is_none() {
                return Ok(recovered);
            }
            recovered += 1;
        }
    }

    /// Liveness probe for health checks.
    pub async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn queue_keys(queue_name: &str) -> (String, String, String) {
    (
        format!("{KEY_PREFIX}:{queue_name}:wait"),
        format!("{KEY_PREFIX}:{queue_name}:active"),
        format!("{KEY_PREFIX}:{queue_name}:failed"),
    )
}
