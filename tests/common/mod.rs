//! Test utilities and fixtures for CarSpot integration tests

#![allow(dead_code)]

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use carspot::db::{init_db, queries, AppState};
pub use carspot::error::AppError;
pub use carspot::id::{generate, EntityType};
pub use carspot::ledger;
pub use carspot::models::*;

/// Create an in-memory test database with schema and seeds initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("Failed to enable foreign keys");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// App state over a single-connection in-memory pool, for handler tests.
pub fn test_state() -> AppState {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build test pool");
    {
        let conn = pool.get().expect("Failed to get test connection");
        init_db(&conn).expect("Failed to initialize schema");
    }

    AppState {
        db: pool,
        http: reqwest::Client::new(),
        base_url: "http://localhost:3000".to_string(),
        webhook_batch_size: 10,
        webhook_max_attempts: 3,
        renewal_policy: RenewalPolicy::ExtendFromExpiry,
        grace_period_days: 30,
    }
}

pub fn create_test_user(conn: &Connection, name: &str) -> User {
    queries::create_user(conn, name, None).expect("Failed to create test user")
}

/// Create a user with a dealer account attached
pub fn create_test_dealer(conn: &Connection, name: &str) -> (User, DealerAccount) {
    let user = create_test_user(conn, name);
    let dealer = queries::create_dealer_account(conn, &user.id, &format!("{} Motors", name))
        .expect("Failed to create test dealer account");
    (user, dealer)
}

/// Create a car with its own throwaway make/model rows
pub fn create_test_car(conn: &Connection, seller_id: &str, dealer_id: Option<&str>) -> Car {
    let make = queries::create_car_make(conn, &generate(EntityType::Car), "BMW")
        .expect("Failed to create test make");
    let model = queries::create_car_model(conn, &make.id, &generate(EntityType::Car), "M3")
        .expect("Failed to create test model");

    queries::create_car(
        conn,
        &CreateCar {
            seller_id: seller_id.to_string(),
            dealer_id: dealer_id.map(String::from),
            make_id: make.id,
            model_id: model.id,
            price: 45_000,
        },
    )
    .expect("Failed to create test car")
}

pub fn create_test_plan(
    conn: &Connection,
    plan_type: PlanType,
    price: i64,
    duration_days: Option<i64>,
    duration_hours: Option<i64>,
) -> PaymentPlan {
    queries::create_payment_plan(
        conn,
        &CreatePaymentPlan {
            name: format!("Test {} plan", plan_type),
            plan_type,
            price,
            duration_days,
            duration_hours,
        },
    )
    .expect("Failed to create test plan")
}

/// Seed the three standard catalog plans
pub fn seed_standard_plans(conn: &Connection) {
    create_test_plan(conn, PlanType::Listing, 1_500, Some(14), None);
    create_test_plan(conn, PlanType::Featured, 5_000, None, Some(24));
    create_test_plan(conn, PlanType::Membership, 25_000, Some(30), None);
}

/// Count rows in a table (raw SQL; for atomicity assertions)
pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .expect("Failed to count rows")
}

/// Backdate a webhook event's created_at for deterministic FIFO tests
pub fn set_event_created_at(conn: &Connection, event_id: &str, created_at: i64) {
    conn.execute(
        "UPDATE webhook_events SET created_at = ?1 WHERE id = ?2",
        rusqlite::params![created_at, event_id],
    )
    .expect("Failed to backdate event");
}
