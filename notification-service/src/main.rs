mod config;
mod mailer;
mod template;
mod worker;

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use config::Config;
use mailer::SmtpMailer;
use shared::{JobQueue, EMAIL_QUEUE};
use worker::Worker;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let queue = JobQueue::connect(&config.redis.url, EMAIL_QUEUE)
        .await
        .expect("Failed to connect to redis");

    match queue.recover_stale().await {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "requeued jobs left over from a previous worker"),
        Err(err) => tracing::error!(error = %err, "failed to recover stale jobs"),
    }

    let mailer = SmtpMailer::new(&config.smtp).expect("Failed to configure mail transport");
    let worker = Worker::new(queue, mailer);

    tracing::info!("Email worker started");

    tokio::select! {
        _ = worker.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
}
