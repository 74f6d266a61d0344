use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::id::{generate, EntityType};
use crate::models::*;

use super::from_row::{
    query_all, query_one, FromRow, ADMIN_SETTING_COLS, CAR_COLS, CAR_MAKE_COLS, CAR_MODEL_COLS,
    DEALER_ACCOUNT_COLS, FEATURED_CAR_COLS, LISTING_PAYMENT_COLS, MEMBERSHIP_COLS,
    PAYMENT_PLAN_COLS, TRANSACTION_COLS, USER_COLS, WEBHOOK_CONFIG_COLS, WEBHOOK_EVENT_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Users & dealer accounts ============

pub fn create_user(conn: &Connection, name: &str, discord: Option<&str>) -> Result<User> {
    let id = generate(EntityType::User);
    let created_at = now();

    conn.execute(
        "INSERT INTO users (id, name, discord, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, name, discord, created_at],
    )?;

    Ok(User {
        id,
        name: name.to_string(),
        discord: discord.map(String::from),
        created_at,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn create_dealer_account(conn: &Connection, user_id: &str, name: &str) -> Result<DealerAccount> {
    let id = generate(EntityType::DealerAccount);
    let created_at = now();

    conn.execute(
        "INSERT INTO dealer_accounts (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, user_id, name, created_at],
    )?;

    Ok(DealerAccount {
        id,
        user_id: user_id.to_string(),
        name: name.to_string(),
        created_at,
    })
}

pub fn get_dealer_account_by_id(conn: &Connection, id: &str) -> Result<Option<DealerAccount>> {
    query_one(
        conn,
        &format!("SELECT {} FROM dealer_accounts WHERE id = ?1", DEALER_ACCOUNT_COLS),
        &[&id],
    )
}

// ============ Vehicle catalog ============

pub fn create_car_make(conn: &Connection, name: &str, display_name: &str) -> Result<CarMake> {
    let id = generate(EntityType::CarMake);

    conn.execute(
        "INSERT INTO car_makes (id, name, display_name) VALUES (?1, ?2, ?3)",
        params![&id, name, display_name],
    )?;

    Ok(CarMake {
        id,
        name: name.to_string(),
        display_name: display_name.to_string(),
        is_active: true,
        sort_order: 0,
    })
}

pub fn create_car_model(
    conn: &Connection,
    make_id: &str,
    name: &str,
    display_name: &str,
) -> Result<CarModel> {
    let id = generate(EntityType::CarModel);

    conn.execute(
        "INSERT INTO car_models (id, make_id, name, display_name) VALUES (?1, ?2, ?3, ?4)",
        params![&id, make_id, name, display_name],
    )?;

    Ok(CarModel {
        id,
        make_id: make_id.to_string(),
        name: name.to_string(),
        display_name: display_name.to_string(),
        is_active: true,
        sort_order: 0,
    })
}

pub fn list_active_makes(conn: &Connection) -> Result<Vec<CarMake>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM car_makes WHERE is_active = 1 ORDER BY sort_order, display_name",
            CAR_MAKE_COLS
        ),
        &[],
    )
}

pub fn list_models_for_make(conn: &Connection, make_id: &str) -> Result<Vec<CarModel>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM car_models WHERE make_id = ?1 AND is_active = 1 \
             ORDER BY sort_order, display_name",
            CAR_MODEL_COLS
        ),
        &[&make_id],
    )
}

pub fn create_car(conn: &Connection, input: &CreateCar) -> Result<Car> {
    let id = generate(EntityType::Car);
    let created_at = now();

    conn.execute(
        "INSERT INTO cars (id, seller_id, dealer_id, make_id, model_id, price, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'draft', ?7)",
        params![
            &id,
            &input.seller_id,
            &input.dealer_id,
            &input.make_id,
            &input.model_id,
            input.price,
            created_at,
        ],
    )?;

    Ok(Car {
        id,
        seller_id: input.seller_id.clone(),
        dealer_id: input.dealer_id.clone(),
        make_id: input.make_id.clone(),
        model_id: input.model_id.clone(),
        price: input.price,
        status: CarStatus::Draft,
        is_featured: false,
        featured_until: None,
        listing_payment_id: None,
        listing_expires_at: None,
        created_at,
    })
}

pub fn get_car_by_id(conn: &Connection, id: &str) -> Result<Option<Car>> {
    query_one(
        conn,
        &format!("SELECT {} FROM cars WHERE id = ?1", CAR_COLS),
        &[&id],
    )
}

pub fn list_dealer_cars(conn: &Connection, dealer_id: &str) -> Result<Vec<CarWithNames>> {
    let cols: String = CAR_COLS
        .split(", ")
        .map(|c| format!("c.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    query_all(
        conn,
        &format!(
            "SELECT {cols}, cm.display_name, cmo.display_name, u.name
             FROM cars c
             JOIN car_makes cm ON c.make_id = cm.id
             JOIN car_models cmo ON c.model_id = cmo.id
             JOIN users u ON c.seller_id = u.id
             WHERE c.dealer_id = ?1 AND c.status != 'removed'
             ORDER BY c.created_at DESC"
        ),
        &[&dealer_id],
    )
}

pub fn get_car_with_names(conn: &Connection, car_id: &str) -> Result<Option<CarWithNames>> {
    let cols: String = CAR_COLS
        .split(", ")
        .map(|c| format!("c.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    query_one(
        conn,
        &format!(
            "SELECT {cols}, cm.display_name, cmo.display_name, u.name
             FROM cars c
             JOIN car_makes cm ON c.make_id = cm.id
             JOIN car_models cmo ON c.model_id = cmo.id
             JOIN users u ON c.seller_id = u.id
             WHERE c.id = ?1"
        ),
        &[&car_id],
    )
}

/// Attach a listing payment to a car and activate it.
/// Returns false when the car does not exist (callers treat that as abort).
pub fn attach_listing_to_car(
    conn: &Connection,
    car_id: &str,
    payment_id: &str,
    expires_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE cars SET listing_payment_id = ?1, listing_expires_at = ?2, status = 'active'
         WHERE id = ?3",
        params![payment_id, expires_at, car_id],
    )?;
    Ok(affected > 0)
}

pub fn mark_car_featured(conn: &Connection, car_id: &str, featured_until: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE cars SET is_featured = 1, featured_until = ?1 WHERE id = ?2",
        params![featured_until, car_id],
    )?;
    Ok(affected > 0)
}

/// Flip lapsed active listings to `expired`. Returns the number of rows
/// changed (the expiry sweep logs it).
pub fn expire_lapsed_listings(conn: &Connection, cutoff: i64) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE cars SET status = 'expired'
         WHERE status = 'active' AND listing_expires_at IS NOT NULL AND listing_expires_at < ?1",
        params![cutoff],
    )?;
    Ok(affected)
}

pub fn clear_lapsed_featured(conn: &Connection, cutoff: i64) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE cars SET is_featured = 0
         WHERE is_featured = 1 AND featured_until IS NOT NULL AND featured_until < ?1",
        params![cutoff],
    )?;
    Ok(affected)
}

// ============ Payment plans ============

pub fn create_payment_plan(conn: &Connection, input: &CreatePaymentPlan) -> Result<PaymentPlan> {
    let id = generate(EntityType::PaymentPlan);

    conn.execute(
        "INSERT INTO payment_plans (id, name, plan_type, price, duration_days, duration_hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &input.name,
            input.plan_type.as_str(),
            input.price,
            input.duration_days,
            input.duration_hours,
        ],
    )?;

    Ok(PaymentPlan {
        id,
        name: input.name.clone(),
        plan_type: input.plan_type,
        price: input.price,
        duration_days: input.duration_days,
        duration_hours: input.duration_hours,
        is_active: true,
    })
}

pub fn get_active_plan(conn: &Connection, plan_type: PlanType) -> Result<Option<PaymentPlan>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payment_plans WHERE plan_type = ?1 AND is_active = 1 LIMIT 1",
            PAYMENT_PLAN_COLS
        ),
        &[&plan_type.as_str()],
    )
}

pub fn list_active_plans(conn: &Connection) -> Result<Vec<PaymentPlan>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payment_plans WHERE is_active = 1 ORDER BY plan_type, price",
            PAYMENT_PLAN_COLS
        ),
        &[],
    )
}

// ============ Dealer memberships ============

pub fn get_membership_for_dealer(
    conn: &Connection,
    dealer_account_id: &str,
) -> Result<Option<DealerMembership>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM dealer_memberships WHERE dealer_account_id = ?1",
            MEMBERSHIP_COLS
        ),
        &[&dealer_account_id],
    )
}

pub fn get_membership_by_id(conn: &Connection, id: &str) -> Result<Option<DealerMembership>> {
    query_one(
        conn,
        &format!("SELECT {} FROM dealer_memberships WHERE id = ?1", MEMBERSHIP_COLS),
        &[&id],
    )
}

/// Insert-or-update the one membership row for a dealer account. The
/// UNIQUE constraint on `dealer_account_id` makes the first concurrent
/// writer win; the second updates the same row.
#[allow(clippy::too_many_arguments)]
pub fn upsert_membership(
    conn: &Connection,
    dealer_account_id: &str,
    monthly_fee: i64,
    start_date: i64,
    end_date: i64,
    next_payment_date: i64,
    grace_period_end: i64,
) -> Result<DealerMembership> {
    let id = generate(EntityType::Membership);
    let created_at = now();

    let membership = conn.query_row(
        &format!(
            "INSERT INTO dealer_memberships
                (id, dealer_account_id, status, start_date, end_date, monthly_fee,
                 next_payment_date, grace_period_end, created_at)
             VALUES (?1, ?2, 'active', ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(dealer_account_id) DO UPDATE SET
                status = 'active',
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                monthly_fee = excluded.monthly_fee,
                next_payment_date = excluded.next_payment_date,
                grace_period_end = excluded.grace_period_end
             RETURNING {}",
            MEMBERSHIP_COLS
        ),
        params![
            &id,
            dealer_account_id,
            start_date,
            end_date,
            monthly_fee,
            next_payment_date,
            grace_period_end,
            created_at,
        ],
        DealerMembership::from_row,
    )?;

    Ok(membership)
}

pub fn apply_membership_renewal(
    conn: &Connection,
    membership_id: &str,
    end_date: i64,
    next_payment_date: i64,
    grace_period_end: i64,
) -> Result<Option<DealerMembership>> {
    conn.query_row(
        &format!(
            "UPDATE dealer_memberships
             SET status = 'active', end_date = ?1, next_payment_date = ?2,
                 grace_period_end = ?3, last_payment_date = ?4
             WHERE id = ?5
             RETURNING {}",
            MEMBERSHIP_COLS
        ),
        params![end_date, next_payment_date, grace_period_end, now(), membership_id],
        DealerMembership::from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Settlement transition: confirm the membership and stamp the payment.
pub fn confirm_membership_paid(conn: &Connection, membership_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE dealer_memberships SET status = 'active', last_payment_date = ?1 WHERE id = ?2",
        params![now(), membership_id],
    )?;
    Ok(affected > 0)
}

pub fn expire_lapsed_memberships(conn: &Connection, cutoff: i64) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE dealer_memberships SET status = 'expired'
         WHERE status != 'expired' AND grace_period_end < ?1",
        params![cutoff],
    )?;
    Ok(affected)
}

// ============ Listing payments & featured cars ============

pub fn insert_listing_payment(
    conn: &Connection,
    car_id: &str,
    user_id: &str,
    plan_id: &str,
    amount: i64,
    listing_start_date: i64,
    listing_end_date: i64,
) -> Result<CarListingPayment> {
    let id = generate(EntityType::ListingPayment);
    let created_at = now();

    conn.execute(
        "INSERT INTO car_listing_payments
            (id, car_id, user_id, plan_id, amount, listing_start_date, listing_end_date,
             payment_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'provisional', ?8)",
        params![&id, car_id, user_id, plan_id, amount, listing_start_date, listing_end_date, created_at],
    )?;

    Ok(CarListingPayment {
        id,
        car_id: car_id.to_string(),
        user_id: user_id.to_string(),
        plan_id: plan_id.to_string(),
        amount,
        listing_start_date,
        listing_end_date,
        payment_status: EntitlementStatus::Provisional,
        created_at,
    })
}

pub fn get_listing_payment_by_id(conn: &Connection, id: &str) -> Result<Option<CarListingPayment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM car_listing_payments WHERE id = ?1", LISTING_PAYMENT_COLS),
        &[&id],
    )
}

pub fn confirm_listing_payment_paid(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE car_listing_payments SET payment_status = 'paid' WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

pub fn insert_featured_car(
    conn: &Connection,
    car_id: &str,
    user_id: &str,
    start_time: i64,
    end_time: i64,
) -> Result<FeaturedCar> {
    let id = generate(EntityType::FeaturedCar);
    let created_at = now();

    conn.execute(
        "INSERT INTO featured_cars (id, car_id, user_id, start_time, end_time, payment_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'provisional', ?6)",
        params![&id, car_id, user_id, start_time, end_time, created_at],
    )?;

    Ok(FeaturedCar {
        id,
        car_id: car_id.to_string(),
        user_id: user_id.to_string(),
        start_time,
        end_time,
        payment_status: EntitlementStatus::Provisional,
        created_at,
    })
}

pub fn get_featured_car_by_id(conn: &Connection, id: &str) -> Result<Option<FeaturedCar>> {
    query_one(
        conn,
        &format!("SELECT {} FROM featured_cars WHERE id = ?1", FEATURED_CAR_COLS),
        &[&id],
    )
}

pub fn confirm_featured_car_paid(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE featured_cars SET payment_status = 'paid' WHERE id = ?1",
        params![id],
    )?;
    Ok(affected > 0)
}

pub fn list_active_featured_cars(conn: &Connection) -> Result<Vec<FeaturedCar>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM featured_cars WHERE end_time > ?1 ORDER BY start_time DESC",
            FEATURED_CAR_COLS
        ),
        &[&now()],
    )
}

// ============ Payment transactions ============

pub fn insert_transaction(
    conn: &Connection,
    user_id: &str,
    amount: i64,
    payment_type: PaymentType,
    reference_id: &str,
    reference_table: &str,
) -> Result<PaymentTransaction> {
    let id = generate(EntityType::Transaction);
    let created_at = now();

    conn.execute(
        "INSERT INTO payment_transactions
            (id, user_id, amount, payment_type, reference_id, reference_table, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
        params![
            &id,
            user_id,
            amount,
            payment_type.as_str(),
            reference_id,
            reference_table,
            created_at,
        ],
    )?;

    Ok(PaymentTransaction {
        id,
        user_id: user_id.to_string(),
        amount,
        payment_type,
        reference_id: reference_id.to_string(),
        reference_table: reference_table.to_string(),
        status: TransactionStatus::Pending,
        gta_world_transaction_id: None,
        created_at,
    })
}

pub fn get_transaction_by_id(conn: &Connection, id: &str) -> Result<Option<PaymentTransaction>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payment_transactions WHERE id = ?1", TRANSACTION_COLS),
        &[&id],
    )
}

/// Flip the matching `pending` transaction to `completed`. The
/// `status = 'pending'` predicate is the idempotency guard: a second
/// settlement for the same reference matches zero rows and returns None.
pub fn settle_transaction(
    conn: &Connection,
    user_id: &str,
    payment_type: PaymentType,
    reference_id: &str,
    reference_table: &str,
    gta_world_transaction_id: &str,
) -> Result<Option<PaymentTransaction>> {
    conn.query_row(
        &format!(
            "UPDATE payment_transactions
             SET gta_world_transaction_id = ?1, status = 'completed'
             WHERE user_id = ?2 AND payment_type = ?3 AND reference_id = ?4
               AND reference_table = ?5 AND status = 'pending'
             RETURNING {}",
            TRANSACTION_COLS
        ),
        params![
            gta_world_transaction_id,
            user_id,
            payment_type.as_str(),
            reference_id,
            reference_table,
        ],
        PaymentTransaction::from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_user_transactions(conn: &Connection, user_id: &str) -> Result<Vec<PaymentTransaction>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payment_transactions WHERE user_id = ?1 ORDER BY created_at DESC",
            TRANSACTION_COLS
        ),
        &[&user_id],
    )
}

// ============ Admin settings ============

pub fn list_admin_settings(conn: &Connection) -> Result<Vec<AdminSetting>> {
    query_all(
        conn,
        &format!("SELECT {} FROM admin_settings ORDER BY setting_key", ADMIN_SETTING_COLS),
        &[],
    )
}

/// Update an editable setting. Returns false when the key is unknown or
/// locked (`is_editable = 0`).
pub fn update_admin_setting(conn: &Connection, key: &str, value: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE admin_settings SET setting_value = ?1 WHERE setting_key = ?2 AND is_editable = 1",
        params![value, key],
    )?;
    Ok(affected > 0)
}

// ============ Webhook configs ============

pub fn list_webhook_configs(conn: &Connection) -> Result<Vec<WebhookConfig>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM webhook_configs ORDER BY webhook_type, name",
            WEBHOOK_CONFIG_COLS
        ),
        &[],
    )
}

pub fn get_webhook_config(conn: &Connection, webhook_id: &str) -> Result<Option<WebhookConfig>> {
    query_one(
        conn,
        &format!("SELECT {} FROM webhook_configs WHERE webhook_id = ?1", WEBHOOK_CONFIG_COLS),
        &[&webhook_id],
    )
}

pub fn get_enabled_webhook_config(
    conn: &Connection,
    webhook_id: &str,
) -> Result<Option<WebhookConfig>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM webhook_configs WHERE webhook_id = ?1 AND enabled = 1",
            WEBHOOK_CONFIG_COLS
        ),
        &[&webhook_id],
    )
}

/// Upsert a config. An absent template preserves the stored one on
/// update; on insert it falls back to the stock template for known ids
/// (empty for unknown ones).
pub fn save_webhook_config(conn: &Connection, input: &SaveWebhookConfig) -> Result<()> {
    let ts = now();
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM webhook_configs WHERE webhook_id = ?1",
            params![&input.webhook_id],
            |row| row.get(0),
        )
        .optional()?;

    if exists.is_some() {
        match &input.message_template {
            Some(template) => {
                conn.execute(
                    "UPDATE webhook_configs
                     SET url = ?1, enabled = ?2, message_template = ?3, updated_at = ?4
                     WHERE webhook_id = ?5",
                    params![&input.url, input.enabled, template, ts, &input.webhook_id],
                )?;
            }
            None => {
                conn.execute(
                    "UPDATE webhook_configs SET url = ?1, enabled = ?2, updated_at = ?3
                     WHERE webhook_id = ?4",
                    params![&input.url, input.enabled, ts, &input.webhook_id],
                )?;
            }
        }
    } else {
        let template = input
            .message_template
            .clone()
            .or_else(|| crate::webhooks::stock_template(&input.webhook_id).map(String::from))
            .unwrap_or_default();
        conn.execute(
            "INSERT INTO webhook_configs
                (webhook_id, name, url, enabled, message_template, created_at, updated_at)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?5)",
            params![&input.webhook_id, &input.url, input.enabled, &template, ts],
        )?;
    }

    Ok(())
}

/// Partial update with an explicit field allowlist. An empty template
/// never overwrites a stored one.
pub fn update_webhook_config_fields(
    conn: &Connection,
    webhook_id: &str,
    url: Option<&str>,
    enabled: Option<bool>,
    message_template: Option<&str>,
) -> Result<bool> {
    let ts = now();
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(url) = url {
        sets.push("url = ?");
        values.push(Box::new(url.to_string()));
    }
    if let Some(enabled) = enabled {
        sets.push("enabled = ?");
        values.push(Box::new(enabled));
    }
    if let Some(template) = message_template {
        if !template.is_empty() {
            sets.push("message_template = ?");
            values.push(Box::new(template.to_string()));
        }
    }

    if sets.is_empty() {
        return Ok(false);
    }

    sets.push("updated_at = ?");
    values.push(Box::new(ts));
    values.push(Box::new(webhook_id.to_string()));

    let sql = format!(
        "UPDATE webhook_configs SET {} WHERE webhook_id = ?",
        sets.join(", ")
    );
    let affected = conn.execute(
        &sql,
        rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
    )?;
    Ok(affected > 0)
}

// ============ Webhook events ============

/// Durably record a notification intent. Never touches the network.
pub fn enqueue_webhook_event(
    conn: &Connection,
    webhook_id: &str,
    event_data: &serde_json::Value,
) -> Result<WebhookEvent> {
    let id = generate(EntityType::WebhookEvent);
    let ts = now();
    let raw = serde_json::to_string(event_data)?;

    conn.execute(
        "INSERT INTO webhook_events (id, webhook_id, event_data, status, attempts, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)",
        params![&id, webhook_id, &raw, ts],
    )?;

    Ok(WebhookEvent {
        id,
        webhook_id: webhook_id.to_string(),
        event_data: event_data.clone(),
        status: EventStatus::Pending,
        response_code: None,
        response_message: None,
        attempts: 0,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn get_webhook_event_by_id(conn: &Connection, id: &str) -> Result<Option<WebhookEvent>> {
    query_one(
        conn,
        &format!("SELECT {} FROM webhook_events WHERE id = ?1", WEBHOOK_EVENT_COLS),
        &[&id],
    )
}

/// Atomically claim up to `batch_size` deliverable events (oldest first)
/// by flipping them to `processing` before any network I/O happens. Two
/// concurrent processors therefore never see the same event.
pub fn claim_deliverable_events(
    conn: &Connection,
    batch_size: i64,
    max_attempts: i64,
) -> Result<Vec<WebhookEvent>> {
    let sql = format!(
        "UPDATE webhook_events SET status = 'processing', updated_at = ?1
         WHERE id IN (
             SELECT we.id FROM webhook_events we
             JOIN webhook_configs wc ON we.webhook_id = wc.webhook_id
             WHERE we.status IN ('pending', 'failed')
               AND we.attempts < ?2
               AND wc.enabled = 1
             ORDER BY we.created_at ASC
             LIMIT ?3
         )
         RETURNING {}",
        WEBHOOK_EVENT_COLS
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map(params![now(), max_attempts, batch_size], WebhookEvent::from_row)?
        .collect::<std::result::Result<Vec<WebhookEvent>, _>>()?;

    // RETURNING does not guarantee claim order; keep delivery FIFO.
    rows.sort_by_key(|e| e.created_at);
    Ok(rows)
}

pub fn mark_event_sent(
    conn: &Connection,
    event_id: &str,
    response_code: Option<i64>,
    response_message: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE webhook_events
         SET status = 'sent', response_code = ?1, response_message = ?2, updated_at = ?3
         WHERE id = ?4",
        params![response_code, response_message, now(), event_id],
    )?;
    Ok(affected > 0)
}

/// Record a delivery failure. The event goes back to `failed` (still in
/// the deliverable pool) until attempts reach `max_attempts`, then it is
/// parked as terminal `dead`.
pub fn mark_event_failed(
    conn: &Connection,
    event_id: &str,
    response_code: Option<i64>,
    response_message: &str,
    max_attempts: i64,
) -> Result<EventStatus> {
    let status: String = conn.query_row(
        "UPDATE webhook_events
         SET attempts = attempts + 1,
             status = CASE WHEN attempts + 1 >= ?1 THEN 'dead' ELSE 'failed' END,
             response_code = ?2, response_message = ?3, updated_at = ?4
         WHERE id = ?5
         RETURNING status",
        params![max_attempts, response_code, response_message, now(), event_id],
        |row| row.get(0),
    )?;

    Ok(status.parse().unwrap_or(EventStatus::Failed))
}
