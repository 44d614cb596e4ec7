//! Shared producer/consumer contract for the notification pipeline: the email
//! job payload exchanged between the core service and the notification worker,
//! and the Redis-backed durable queue both sides talk to.

pub mod job;
pub mod queue;

pub use job::{EmailJob, EmailType, JobEnvelope};
pub use queue::{Delivery, JobQueue, QueueError, EMAIL_QUEUE};
