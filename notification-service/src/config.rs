use std::env;

/// Notification worker configuration, loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis: RedisConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Credentials are optional; without them the transport connects in the
    /// unauthenticated mode used against local dev relays.
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            smtp: SmtpConfig {
                host: env::var("EMAIL_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env::var("EMAIL_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(587),
                username: env::var("EMAIL_USER").ok(),
                password: env::var("EMAIL_PASS").ok(),
                from_address: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "no-reply@example.com".to_string()),
            },
        }
    }
}
