use std::env;

use crate::models::RenewalPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    /// How many pending webhook events one processor run may claim.
    pub webhook_batch_size: i64,
    /// Delivery attempts before an event is parked as `dead`.
    pub webhook_max_attempts: i64,
    /// Seconds between background queue drains.
    pub webhook_poll_secs: u64,
    /// Days of grace after a membership's end_date.
    pub grace_period_days: i64,
    pub renewal_policy: RenewalPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CARSPOT_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let renewal_policy = env::var("MEMBERSHIP_RENEWAL_POLICY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(RenewalPolicy::ExtendFromExpiry);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "carspot.db".to_string()),
            base_url,
            dev_mode,
            webhook_batch_size: env_i64("WEBHOOK_BATCH_SIZE", 10),
            webhook_max_attempts: env_i64("WEBHOOK_MAX_ATTEMPTS", 3),
            webhook_poll_secs: env_i64("WEBHOOK_POLL_SECS", 60) as u64,
            grace_period_days: env_i64("GRACE_PERIOD_DAYS", 30),
            renewal_policy,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
