mod schema;
pub mod from_row;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::models::RenewalPolicy;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Shared outbound HTTP client (Discord delivery).
    pub http: reqwest::Client,
    /// Base URL for links embedded in notification payloads.
    pub base_url: String,
    pub webhook_batch_size: i64,
    pub webhook_max_attempts: i64,
    pub renewal_policy: RenewalPolicy,
    pub grace_period_days: i64,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().max_size(10).build(manager)
}
