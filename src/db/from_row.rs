//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupted data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, name, discord, created_at";

pub const DEALER_ACCOUNT_COLS: &str = "id, user_id, name, created_at";

pub const CAR_MAKE_COLS: &str = "id, name, display_name, is_active, sort_order";

pub const CAR_MODEL_COLS: &str = "id, make_id, name, display_name, is_active, sort_order";

pub const CAR_COLS: &str = "id, seller_id, dealer_id, make_id, model_id, price, status, \
     is_featured, featured_until, listing_payment_id, listing_expires_at, created_at";

pub const PAYMENT_PLAN_COLS: &str =
    "id, name, plan_type, price, duration_days, duration_hours, is_active";

pub const MEMBERSHIP_COLS: &str = "id, dealer_account_id, status, start_date, end_date, \
     monthly_fee, next_payment_date, grace_period_end, last_payment_date, created_at";

pub const LISTING_PAYMENT_COLS: &str = "id, car_id, user_id, plan_id, amount, \
     listing_start_date, listing_end_date, payment_status, created_at";

pub const FEATURED_CAR_COLS: &str =
    "id, car_id, user_id, start_time, end_time, payment_status, created_at";

pub const TRANSACTION_COLS: &str = "id, user_id, amount, payment_type, reference_id, \
     reference_table, status, gta_world_transaction_id, created_at";

pub const ADMIN_SETTING_COLS: &str = "setting_key, setting_value, is_editable";

pub const WEBHOOK_CONFIG_COLS: &str = "id, webhook_id, name, description, webhook_type, url, \
     enabled, message_template, created_at, updated_at";

pub const WEBHOOK_EVENT_COLS: &str = "id, webhook_id, event_data, status, response_code, \
     response_message, attempts, created_at, updated_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            discord: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl FromRow for DealerAccount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DealerAccount {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl FromRow for CarMake {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CarMake {
            id: row.get(0)?,
            name: row.get(1)?,
            display_name: row.get(2)?,
            is_active: row.get(3)?,
            sort_order: row.get(4)?,
        })
    }
}

impl FromRow for CarModel {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CarModel {
            id: row.get(0)?,
            make_id: row.get(1)?,
            name: row.get(2)?,
            display_name: row.get(3)?,
            is_active: row.get(4)?,
            sort_order: row.get(5)?,
        })
    }
}

impl FromRow for Car {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Car {
            id: row.get(0)?,
            seller_id: row.get(1)?,
            dealer_id: row.get(2)?,
            make_id: row.get(3)?,
            model_id: row.get(4)?,
            price: row.get(5)?,
            status: parse_enum(row, 6, "status")?,
            is_featured: row.get(7)?,
            featured_until: row.get(8)?,
            listing_payment_id: row.get(9)?,
            listing_expires_at: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

/// Expects `CAR_COLS` prefixed with `c.` plus the three joined name columns.
impl FromRow for CarWithNames {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CarWithNames {
            car: Car::from_row(row)?,
            make_name: row.get(12)?,
            model_name: row.get(13)?,
            seller_name: row.get(14)?,
        })
    }
}

impl FromRow for PaymentPlan {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PaymentPlan {
            id: row.get(0)?,
            name: row.get(1)?,
            plan_type: parse_enum(row, 2, "plan_type")?,
            price: row.get(3)?,
            duration_days: row.get(4)?,
            duration_hours: row.get(5)?,
            is_active: row.get(6)?,
        })
    }
}

impl FromRow for DealerMembership {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DealerMembership {
            id: row.get(0)?,
            dealer_account_id: row.get(1)?,
            status: parse_enum(row, 2, "status")?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            monthly_fee: row.get(5)?,
            next_payment_date: row.get(6)?,
            grace_period_end: row.get(7)?,
            last_payment_date: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl FromRow for CarListingPayment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CarListingPayment {
            id: row.get(0)?,
            car_id: row.get(1)?,
            user_id: row.get(2)?,
            plan_id: row.get(3)?,
            amount: row.get(4)?,
            listing_start_date: row.get(5)?,
            listing_end_date: row.get(6)?,
            payment_status: parse_enum(row, 7, "payment_status")?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for FeaturedCar {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(FeaturedCar {
            id: row.get(0)?,
            car_id: row.get(1)?,
            user_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            payment_status: parse_enum(row, 5, "payment_status")?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for PaymentTransaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PaymentTransaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            payment_type: parse_enum(row, 3, "payment_type")?,
            reference_id: row.get(4)?,
            reference_table: row.get(5)?,
            status: parse_enum(row, 6, "status")?,
            gta_world_transaction_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for AdminSetting {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(AdminSetting {
            setting_key: row.get(0)?,
            setting_value: row.get(1)?,
            is_editable: row.get(2)?,
        })
    }
}

impl FromRow for WebhookConfig {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(WebhookConfig {
            id: row.get(0)?,
            webhook_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            webhook_type: parse_enum(row, 4, "webhook_type")?,
            url: row.get(5)?,
            enabled: row.get(6)?,
            message_template: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for WebhookEvent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let raw: String = row.get(2)?;
        let event_data = serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(WebhookEvent {
            id: row.get(0)?,
            webhook_id: row.get(1)?,
            event_data,
            status: parse_enum(row, 3, "status")?,
            response_code: row.get(4)?,
            response_message: row.get(5)?,
            attempts: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
