use rusqlite::{params, Connection};

use crate::webhooks::STOCK_CONFIGS;

/// Initialize the database schema and seed the static rows
/// (stock webhook configs, default admin settings).
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (identity lives in an external collaborator; this is the FK anchor)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            discord TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dealer_accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_dealer_accounts_user ON dealer_accounts(user_id);

        -- Vehicle catalog
        CREATE TABLE IF NOT EXISTS car_makes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS car_models (
            id TEXT PRIMARY KEY,
            make_id TEXT NOT NULL REFERENCES car_makes(id),
            name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_car_models_make ON car_models(make_id);

        CREATE TABLE IF NOT EXISTS cars (
            id TEXT PRIMARY KEY,
            seller_id TEXT NOT NULL REFERENCES users(id),
            dealer_id TEXT REFERENCES dealer_accounts(id),
            make_id TEXT NOT NULL REFERENCES car_makes(id),
            model_id TEXT NOT NULL REFERENCES car_models(id),
            price INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'active', 'sold', 'expired', 'removed')),
            is_featured INTEGER NOT NULL DEFAULT 0,
            featured_until INTEGER,
            listing_payment_id TEXT,
            listing_expires_at INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cars_seller ON cars(seller_id);
        CREATE INDEX IF NOT EXISTS idx_cars_dealer ON cars(dealer_id);
        CREATE INDEX IF NOT EXISTS idx_cars_expiry ON cars(listing_expires_at)
            WHERE listing_expires_at IS NOT NULL;

        -- Pricing catalog (immutable at runtime)
        CREATE TABLE IF NOT EXISTS payment_plans (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            plan_type TEXT NOT NULL CHECK (plan_type IN ('listing', 'featured', 'membership')),
            price INTEGER NOT NULL,
            duration_days INTEGER,
            duration_hours INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_payment_plans_type ON payment_plans(plan_type)
            WHERE is_active = 1;

        -- One membership row per dealer account; the UNIQUE constraint is
        -- the concurrency guard for the upsert (first writer wins).
        CREATE TABLE IF NOT EXISTS dealer_memberships (
            id TEXT PRIMARY KEY,
            dealer_account_id TEXT NOT NULL UNIQUE REFERENCES dealer_accounts(id),
            status TEXT NOT NULL CHECK (status IN ('active', 'expired', 'provisional')),
            start_date INTEGER NOT NULL,
            end_date INTEGER NOT NULL,
            monthly_fee INTEGER NOT NULL,
            next_payment_date INTEGER NOT NULL,
            grace_period_end INTEGER NOT NULL,
            last_payment_date INTEGER,
            created_at INTEGER NOT NULL,

            CHECK (grace_period_end > end_date)
        );

        CREATE TABLE IF NOT EXISTS car_listing_payments (
            id TEXT PRIMARY KEY,
            car_id TEXT NOT NULL REFERENCES cars(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            plan_id TEXT NOT NULL REFERENCES payment_plans(id),
            amount INTEGER NOT NULL,
            listing_start_date INTEGER NOT NULL,
            listing_end_date INTEGER NOT NULL,
            payment_status TEXT NOT NULL DEFAULT 'provisional'
                CHECK (payment_status IN ('provisional', 'paid')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_listing_payments_car ON car_listing_payments(car_id);
        CREATE INDEX IF NOT EXISTS idx_listing_payments_user ON car_listing_payments(user_id);

        CREATE TABLE IF NOT EXISTS featured_cars (
            id TEXT PRIMARY KEY,
            car_id TEXT NOT NULL REFERENCES cars(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            payment_status TEXT NOT NULL DEFAULT 'provisional'
                CHECK (payment_status IN ('provisional', 'paid')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_featured_cars_car ON featured_cars(car_id);
        CREATE INDEX IF NOT EXISTS idx_featured_cars_window ON featured_cars(end_time);

        -- Append-only money-movement ledger
        CREATE TABLE IF NOT EXISTS payment_transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            amount INTEGER NOT NULL,
            payment_type TEXT NOT NULL
                CHECK (payment_type IN ('listing', 'featured', 'membership', 'renewal')),
            reference_id TEXT NOT NULL,
            reference_table TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'completed', 'failed')),
            gta_world_transaction_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_user ON payment_transactions(user_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_reference
            ON payment_transactions(payment_type, reference_id, reference_table);

        CREATE TABLE IF NOT EXISTS admin_settings (
            setting_key TEXT PRIMARY KEY,
            setting_value TEXT NOT NULL,
            is_editable INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS webhook_configs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            webhook_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            webhook_type TEXT NOT NULL DEFAULT 'public'
                CHECK (webhook_type IN ('public', 'private', 'system')),
            url TEXT NOT NULL DEFAULT '',
            enabled INTEGER NOT NULL DEFAULT 1,
            message_template TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhook_events (
            id TEXT PRIMARY KEY,
            webhook_id TEXT NOT NULL REFERENCES webhook_configs(webhook_id),
            event_data TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'sent', 'failed', 'dead')),
            response_code INTEGER,
            response_message TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_events_deliverable
            ON webhook_events(status, created_at);
        "#,
    )?;

    seed_stock_webhook_configs(conn)?;
    seed_default_admin_settings(conn)?;

    Ok(())
}

/// Insert the stock notification configs if they are not present yet.
/// Existing rows (including operator-edited URLs/templates) are untouched.
fn seed_stock_webhook_configs(conn: &Connection) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO webhook_configs
            (webhook_id, name, description, webhook_type, url, enabled, message_template, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '', 1, ?5, ?6, ?6)",
    )?;

    for config in STOCK_CONFIGS {
        stmt.execute(params![
            config.webhook_id,
            config.name,
            config.description,
            config.webhook_type,
            config.message_template,
            now,
        ])?;
    }

    Ok(())
}

fn seed_default_admin_settings(conn: &Connection) -> rusqlite::Result<()> {
    let defaults: &[(&str, &str, bool)] = &[
        ("site_name", "CarSpot", true),
        ("listings_enabled", "true", true),
        ("dealer_applications_open", "true", true),
        // Informational; the schema carries the real value
        ("schema_version", "1", false),
    ];

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO admin_settings (setting_key, setting_value, is_editable)
         VALUES (?1, ?2, ?3)",
    )?;

    for (key, value, editable) in defaults {
        stmt.execute(params![key, value, editable])?;
    }

    Ok(())
}
