//! Entitlement & payment ledger.
//!
//! Decides whether a seller may publish a listing right now, and records
//! the money-movement lifecycle for listings, featured placement and
//! dealer memberships. Every multi-statement flow runs inside a single
//! database transaction; nothing persists if any step fails.
//!
//! Entitlement is granted provisionally at purchase time (the trust
//! model): entitlement rows are written before the GTA-World gateway has
//! confirmed payment, and the `pending` transaction row records that
//! settlement is still owed. `process_external_payment` is the only
//! place settlement actually occurs.

use chrono::Utc;
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{
    DealerMembership, MembershipStatus, PaymentTransaction, PaymentType, PlanType, RenewalPolicy,
    TransactionStatus,
};

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;

/// Catalog fallbacks when no active plan row exists. Quoted amounts only;
/// purchases still require a real plan.
pub const FALLBACK_MEMBERSHIP_PRICE: i64 = 25_000;
pub const FALLBACK_LISTING_PRICE: i64 = 1_500;

/// A renewal always buys a fixed 30-day window.
const RENEWAL_WINDOW_DAYS: i64 = 30;

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Result of an entitlement check. Pure read, no side effects.
#[derive(Debug, Serialize)]
pub struct ListingEligibility {
    pub can_list: bool,
    pub reason: String,
    pub membership: Option<DealerMembership>,
    pub requires_payment: bool,
    pub payment_amount: i64,
}

#[derive(Debug, Serialize)]
pub struct ListingReceipt {
    pub id: String,
    pub amount: i64,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct FeaturedReceipt {
    pub id: String,
    pub amount: i64,
    pub featured_until: i64,
}

#[derive(Debug, Serialize)]
pub struct MembershipReceipt {
    pub id: String,
    pub amount: i64,
    pub expires_at: i64,
    pub next_payment_date: i64,
}

#[derive(Debug, Serialize)]
pub struct RenewalReceipt {
    pub amount: i64,
    pub expires_at: i64,
    pub next_payment_date: i64,
}

#[derive(Debug, Serialize)]
pub struct SettlementReceipt {
    pub gta_world_transaction_id: String,
    pub status: TransactionStatus,
}

/// Can this seller publish a listing right now?
///
/// Dealers list for free while a membership is live (or within its grace
/// period). Private sellers may always list but pay per listing.
pub fn can_list_car(
    conn: &Connection,
    dealer_account_id: Option<&str>,
) -> Result<ListingEligibility> {
    let ts = now();

    let Some(dealer_id) = dealer_account_id else {
        let amount = queries::get_active_plan(conn, PlanType::Listing)?
            .map(|p| p.price)
            .unwrap_or(FALLBACK_LISTING_PRICE);
        return Ok(ListingEligibility {
            can_list: true,
            reason: "Private seller - payment required".to_string(),
            membership: None,
            requires_payment: true,
            payment_amount: amount,
        });
    };

    let membership = queries::get_membership_for_dealer(conn, dealer_id)?;

    match membership {
        Some(m) if m.status == MembershipStatus::Active && m.end_date > ts => {
            Ok(ListingEligibility {
                can_list: true,
                reason: "Active dealer membership".to_string(),
                membership: Some(m),
                requires_payment: false,
                payment_amount: 0,
            })
        }
        Some(m) if m.grace_period_end > ts => Ok(ListingEligibility {
            can_list: true,
            reason: "Grace period active".to_string(),
            membership: None,
            requires_payment: false,
            payment_amount: 0,
        }),
        _ => {
            let amount = queries::get_active_plan(conn, PlanType::Membership)?
                .map(|p| p.price)
                .unwrap_or(FALLBACK_MEMBERSHIP_PRICE);
            Ok(ListingEligibility {
                can_list: false,
                reason: "Dealer membership expired".to_string(),
                membership: None,
                requires_payment: true,
                payment_amount: amount,
            })
        }
    }
}

/// Purchase a paid listing for a car: payment row, car activation and the
/// pending ledger entry, all-or-nothing.
pub fn purchase_car_listing(
    conn: &mut Connection,
    car_id: &str,
    user_id: &str,
) -> Result<ListingReceipt> {
    let tx = conn.transaction()?;

    let plan = queries::get_active_plan(&tx, PlanType::Listing)?
        .ok_or_else(|| AppError::NotFound("Listing plan not found".to_string()))?;
    let duration_days = plan
        .duration_days
        .ok_or_else(|| AppError::Internal("listing plan has no duration_days".to_string()))?;

    let start = now();
    let end = start + duration_days * SECONDS_PER_DAY;

    let payment =
        queries::insert_listing_payment(&tx, car_id, user_id, &plan.id, plan.price, start, end)?;

    if !queries::attach_listing_to_car(&tx, car_id, &payment.id, end)? {
        return Err(AppError::NotFound("Car not found".to_string()));
    }

    queries::insert_transaction(
        &tx,
        user_id,
        plan.price,
        PaymentType::Listing,
        &payment.id,
        "car_listing_payments",
    )?;

    tx.commit()?;

    Ok(ListingReceipt {
        id: payment.id,
        amount: plan.price,
        expires_at: end,
    })
}

/// Purchase featured placement for a car. Hour-based window, otherwise
/// symmetric to the listing purchase.
pub fn purchase_featured_car(
    conn: &mut Connection,
    car_id: &str,
    user_id: &str,
) -> Result<FeaturedReceipt> {
    let tx = conn.transaction()?;

    let plan = queries::get_active_plan(&tx, PlanType::Featured)?
        .ok_or_else(|| AppError::NotFound("Featured plan not found".to_string()))?;
    let duration_hours = plan
        .duration_hours
        .ok_or_else(|| AppError::Internal("featured plan has no duration_hours".to_string()))?;

    let start = now();
    let end = start + duration_hours * SECONDS_PER_HOUR;

    let featured = queries::insert_featured_car(&tx, car_id, user_id, start, end)?;

    if !queries::mark_car_featured(&tx, car_id, end)? {
        return Err(AppError::NotFound("Car not found".to_string()));
    }

    queries::insert_transaction(
        &tx,
        user_id,
        plan.price,
        PaymentType::Featured,
        &featured.id,
        "featured_cars",
    )?;

    tx.commit()?;

    Ok(FeaturedReceipt {
        id: featured.id,
        amount: plan.price,
        featured_until: end,
    })
}

/// Purchase (or repurchase) a dealer membership. The membership row is
/// upserted by dealer account and becomes `active` immediately.
pub fn purchase_dealer_membership(
    conn: &mut Connection,
    dealer_account_id: &str,
    user_id: &str,
    grace_period_days: i64,
) -> Result<MembershipReceipt> {
    let tx = conn.transaction()?;

    let plan = queries::get_active_plan(&tx, PlanType::Membership)?
        .ok_or_else(|| AppError::NotFound("Membership plan not found".to_string()))?;
    let duration_days = plan
        .duration_days
        .ok_or_else(|| AppError::Internal("membership plan has no duration_days".to_string()))?;

    let start = now();
    let end = start + duration_days * SECONDS_PER_DAY;
    let grace_end = end + grace_period_days * SECONDS_PER_DAY;

    let membership = queries::upsert_membership(
        &tx,
        dealer_account_id,
        plan.price,
        start,
        end,
        end,
        grace_end,
    )?;

    queries::insert_transaction(
        &tx,
        user_id,
        plan.price,
        PaymentType::Membership,
        &membership.id,
        "dealer_memberships",
    )?;

    tx.commit()?;

    Ok(MembershipReceipt {
        id: membership.id,
        amount: plan.price,
        expires_at: end,
        next_payment_date: end,
    })
}

/// Renew an existing membership for another 30-day window. The anchor
/// date depends on the configured policy.
pub fn renew_dealer_membership(
    conn: &mut Connection,
    membership_id: &str,
    user_id: &str,
    policy: RenewalPolicy,
    grace_period_days: i64,
) -> Result<RenewalReceipt> {
    let tx = conn.transaction()?;

    let membership = queries::get_membership_by_id(&tx, membership_id)?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

    let ts = now();
    let base = match policy {
        RenewalPolicy::ExtendFromNow => ts,
        RenewalPolicy::ExtendFromExpiry => ts.max(membership.end_date),
    };
    let end = base + RENEWAL_WINDOW_DAYS * SECONDS_PER_DAY;
    let grace_end = end + grace_period_days * SECONDS_PER_DAY;

    queries::apply_membership_renewal(&tx, membership_id, end, end, grace_end)?;

    queries::insert_transaction(
        &tx,
        user_id,
        membership.monthly_fee,
        PaymentType::Renewal,
        membership_id,
        "dealer_memberships",
    )?;

    tx.commit()?;

    Ok(RenewalReceipt {
        amount: membership.monthly_fee,
        expires_at: end,
        next_payment_date: end,
    })
}

/// Settle a pending transaction after the GTA-World gateway confirmed
/// the payment, then confirm the entitlement row it references.
///
/// Idempotent: only `pending` transactions transition. A second call for
/// the same reference matches nothing and surfaces as not-found instead
/// of double-crediting.
pub fn process_external_payment(
    conn: &mut Connection,
    user_id: &str,
    payment_type: PaymentType,
    reference_id: &str,
    reference_table: &str,
) -> Result<(SettlementReceipt, PaymentTransaction)> {
    let gtw_id = generate_gta_world_transaction_id();

    let tx = conn.transaction()?;

    let settled = queries::settle_transaction(
        &tx,
        user_id,
        payment_type,
        reference_id,
        reference_table,
        &gtw_id,
    )?
    .ok_or_else(|| {
        AppError::NotFound("No pending transaction found for settlement".to_string())
    })?;

    let confirmed = match payment_type {
        PaymentType::Listing => queries::confirm_listing_payment_paid(&tx, reference_id)?,
        PaymentType::Featured => queries::confirm_featured_car_paid(&tx, reference_id)?,
        PaymentType::Membership | PaymentType::Renewal => {
            queries::confirm_membership_paid(&tx, reference_id)?
        }
    };
    if !confirmed {
        // A pending transaction without its entitlement row means the
        // ledger and entitlement tables have diverged.
        return Err(AppError::Internal(format!(
            "settlement target {}/{} missing",
            reference_table, reference_id
        )));
    }

    tx.commit()?;

    Ok((
        SettlementReceipt {
            gta_world_transaction_id: gtw_id,
            status: TransactionStatus::Completed,
        },
        settled,
    ))
}

/// Synthetic gateway transaction id, `GTW_{unix}_{4 digits}`.
fn generate_gta_world_transaction_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("GTW_{}_{}", now(), suffix)
}

/// Outcome of one expiry sweep run.
#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub expired_listings: usize,
    pub unfeatured_cars: usize,
    pub expired_memberships: usize,
}

/// Converge denormalized expiry state: lapsed listings, featured flags
/// and memberships past their grace period.
pub fn run_expiry_sweep(conn: &Connection) -> Result<SweepSummary> {
    let ts = now();
    Ok(SweepSummary {
        expired_listings: queries::expire_lapsed_listings(conn, ts)?,
        unfeatured_cars: queries::clear_lapsed_featured(conn, ts)?,
        expired_memberships: queries::expire_lapsed_memberships(conn, ts)?,
    })
}
