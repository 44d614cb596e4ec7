use shared::{EmailJob, JobQueue};
use tracing::error;

/// Enqueue a notification job without tying its outcome to the caller.
///
/// Called only after the triggering transaction has committed. The spawned
/// task owns the enqueue; a failure is logged and goes nowhere else, so the
/// business operation that produced the job is never affected.
pub fn enqueue_in_background(queue: &JobQueue, job: EmailJob) {
    let queue = queue.clone();
    tokio::spawn(async move {
        if let Err(err) = queue.enqueue(&job).await {
            error!(
                error = %err,
                email_type = %job.email_type,
                recipient = %job.recipient,
                "failed to enqueue notification job"
            );
        }
    });
}
