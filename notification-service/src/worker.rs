use std::time::Duration;

use shared::{Delivery, EmailJob, JobEnvelope, JobQueue};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::mailer::Mailer;
use crate::template;

/// How long a dequeue blocks before looping; keeps shutdown responsive.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a queue error before polling again.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Exponential backoff between delivery attempts: `initial`, doubled after
/// every failure.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// Delay after the given 1-based failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Terminal outcome of one job.
#[derive(Debug, PartialEq, Eq)]
enum DeliveryOutcome {
    /// Sent after `attempts` tries.
    Completed { attempts: u32 },
    /// Dispatch kept failing; all attempts exhausted.
    Failed { attempts: u32 },
    /// Payload shape invalid; retrying cannot help.
    Rejected,
}

/// The notification consumer: pulls one job at a time off the queue, renders
/// it and dispatches it, retrying with backoff before dead-lettering.
///
/// Per-job state machine: queued -> active -> completed | retrying -> active
/// (bounded by `max_attempts`) | failed.
pub struct Worker<M> {
    queue: JobQueue,
    mailer: M,
    backoff: BackoffPolicy,
}

impl<M: Mailer> Worker<M> {
    pub fn new(queue: JobQueue, mailer: M) -> Self {
        Self {
            queue,
            mailer,
            backoff: BackoffPolicy::default(),
        }
    }

    pub async fn run(&self) {
        loop {
            match self.queue.dequeue(POLL_TIMEOUT).await {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, "failed to dequeue job");
                    sleep(QUEUE_ERROR_BACKOFF).await;
                }
            }
        }
    }

    async fn process(&self, delivery: Delivery) {
        let job_id = delivery.envelope.id;
        let outcome = deliver(&self.mailer, &delivery.envelope, &self.backoff).await;

        let ack = match outcome {
            DeliveryOutcome::Completed { attempts } => {
                info!(%job_id, attempts, "job completed");
                self.queue.complete(&delivery).await
            }
            DeliveryOutcome::Failed { attempts } => {
                error!(%job_id, attempts, "job failed, moving to dead-letter list");
                self.queue.fail(&delivery).await
            }
            DeliveryOutcome::Rejected => {
                error!(%job_id, "job payload rejected, moving to dead-letter list");
                self.queue.fail(&delivery).await
            }
        };

        // If the ack itself fails the job stays on the active list and is
        // redelivered on the next startup; at-least-once, never silently lost.
        if let Err(err) = ack {
            error!(%job_id, error = %err, "failed to acknowledge job");
        }
    }
}

async fn deliver<M: Mailer>(
    mailer: &M,
    envelope: &JobEnvelope,
    backoff: &BackoffPolicy,
) -> DeliveryOutcome {
    let job: EmailJob = match serde_json::from_value(envelope.data.clone()) {
        Ok(job) => job,
        Err(err) => {
            warn!(job_id = %envelope.id, error = %err, "invalid job payload");
            return DeliveryOutcome::Rejected;
        }
    };

    let email = template::render(&job);
    let mut attempts = envelope.attempts_made;

    loop {
        attempts += 1;
        match mailer.send(&job.recipient, &email).await {
            Ok(()) => {
                info!(
                    job_id = %envelope.id,
                    recipient = %job.recipient,
                    email_type = %job.email_type,
                    "email sent"
                );
                return DeliveryOutcome::Completed { attempts };
            }
            Err(err) if attempts < envelope.max_attempts => {
                let delay = backoff.delay(attempts);
                warn!(
                    job_id = %envelope.id,
                    error = %err,
                    attempts,
                    retry_in_secs = delay.as_secs(),
                    "email dispatch failed, retrying"
                );
                sleep(delay).await;
            }
            Err(err) => {
                error!(
                    job_id = %envelope.id,
                    error = %err,
                    attempts,
                    "email dispatch failed, attempts exhausted"
                );
                return DeliveryOutcome::Failed { attempts };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MailerError;
    use crate::template::RenderedEmail;
    use async_trait::async_trait;
    use chrono::Utc;
    use shared::EmailType;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Fails the first `failures` sends, then succeeds.
    struct FlakyMailer {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyMailer {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, _recipient: &str, _email: &RenderedEmail) -> Result<(), MailerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(MailerError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn envelope() -> JobEnvelope {
        let job = EmailJob {
            recipient: "user@example.com".to_string(),
            email_type: EmailType::BookingCreatedSuccessful,
            user_name: "Regular User".to_string(),
            event_name: "Concert in the Park".to_string(),
            event_venue: "Central Park".to_string(),
            event_time: Utc::now(),
            ticket_count: 2,
            booking_id: None,
        };
        JobEnvelope::new(serde_json::to_value(job).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_completes_immediately() {
        let mailer = FlakyMailer::new(0);
        let outcome = deliver(&mailer, &envelope(), &BackoffPolicy::default()).await;
        assert_eq!(outcome, DeliveryOutcome::Completed { attempts: 1 });
        assert_eq!(mailer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_with_exponential_backoff() {
        let mailer = FlakyMailer::new(2);
        let started = Instant::now();
        let outcome = deliver(&mailer, &envelope(), &BackoffPolicy::default()).await;

        assert_eq!(outcome, DeliveryOutcome::Completed { attempts: 3 });
        assert_eq!(mailer.calls(), 3);
        // Two backoff sleeps: 5s then 10s.
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_fail_the_job() {
        let mailer = FlakyMailer::new(u32::MAX);
        let outcome = deliver(&mailer, &envelope(), &BackoffPolicy::default()).await;
        assert_eq!(outcome, DeliveryOutcome::Failed { attempts: 3 });
        assert_eq!(mailer.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn prior_attempts_reduce_remaining_retries() {
        let mut env = envelope();
        env.attempts_made = 2;
        let mailer = FlakyMailer::new(u32::MAX);
        let outcome = deliver(&mailer, &env, &BackoffPolicy::default()).await;
        assert_eq!(outcome, DeliveryOutcome::Failed { attempts: 3 });
        assert_eq!(mailer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_rejected_without_sending() {
        let mut env = envelope();
        env.data["emailType"] = "unknown_type".into();
        let mailer = FlakyMailer::new(0);
        let outcome = deliver(&mailer, &env, &BackoffPolicy::default()).await;
        assert_eq!(outcome, DeliveryOutcome::Rejected);
        assert_eq!(mailer.calls(), 0);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let backoff = BackoffPolicy::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(5));
        assert_eq!(backoff.delay(2), Duration::from_secs(10));
        assert_eq!(backoff.delay(3), Duration::from_secs(20));
    }
}
