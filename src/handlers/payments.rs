//! The `/api/payments` surface: entitlement checks, purchases, renewal,
//! external settlement and the payment-history/catalog reads. Dispatch is
//! on the `action` query parameter; bodies are typed per action.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, Query};
use crate::ledger;
use crate::models::{PaymentType, PlanType, UpdateAdminSetting};
use crate::webhooks;

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub dealer_id: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: Option<PlanType>,
}

#[derive(Debug, Deserialize)]
struct PurchaseListingRequest {
    car_id: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseFeaturedRequest {
    car_id: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseMembershipRequest {
    dealer_account_id: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct RenewMembershipRequest {
    membership_id: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ProcessPaymentRequest {
    amount: i64,
    user_id: String,
    payment_type: PaymentType,
    reference_id: String,
    reference_table: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

fn ok_json<T: Serialize>(value: T) -> Response {
    Json(value).into_response()
}

fn created_json<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

/// Deserialize an action body, mapping missing/malformed fields to the
/// action's own validation message.
fn parse_body<T: DeserializeOwned>(body: serde_json::Value, err: &'static str) -> Result<T> {
    serde_json::from_value(body).map_err(|_| AppError::BadRequest(err.to_string()))
}

fn require_non_empty(value: &str, err: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(err.to_string()));
    }
    Ok(())
}

pub async fn payments_get(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Response> {
    let conn = state.db.get()?;

    match query.action.as_deref() {
        Some("plans") => Ok(ok_json(queries::list_active_plans(&conn)?)),
        Some("plan_by_type") => {
            let plan_type = query
                .plan_type
                .ok_or_else(|| AppError::BadRequest("Plan type required".to_string()))?;
            let plan = queries::get_active_plan(&conn, plan_type)?
                .ok_or_not_found("Payment plan not found")?;
            Ok(ok_json(plan))
        }
        Some("dealer_membership") => {
            let dealer_id = query
                .dealer_id
                .ok_or_else(|| AppError::BadRequest("Dealer ID required".to_string()))?;
            // Absent membership is a JSON null, not a 404.
            Ok(ok_json(queries::get_membership_for_dealer(&conn, &dealer_id)?))
        }
        Some("featured_cars") => Ok(ok_json(queries::list_active_featured_cars(&conn)?)),
        Some("transaction") => {
            let id = query
                .id
                .ok_or_else(|| AppError::BadRequest("Transaction ID required".to_string()))?;
            let transaction =
                queries::get_transaction_by_id(&conn, &id)?.ok_or_not_found("Transaction not found")?;
            Ok(ok_json(transaction))
        }
        Some("admin_settings") => Ok(ok_json(queries::list_admin_settings(&conn)?)),
        Some("can_list_car") => {
            let user_id = query
                .user_id
                .ok_or_else(|| AppError::BadRequest("User ID required".to_string()))?;
            require_non_empty(&user_id, "User ID required")?;
            let eligibility = ledger::can_list_car(&conn, query.dealer_id.as_deref())?;
            Ok(ok_json(eligibility))
        }
        Some("payment_history") => {
            let user_id = query
                .user_id
                .ok_or_else(|| AppError::BadRequest("User ID required".to_string()))?;
            Ok(ok_json(queries::list_user_transactions(&conn, &user_id)?))
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}

pub async fn payments_post(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response> {
    match query.action.as_deref() {
        Some("purchase_listing") => {
            let req: PurchaseListingRequest = parse_body(body, msg::CAR_AND_USER_REQUIRED)?;
            require_non_empty(&req.car_id, msg::CAR_AND_USER_REQUIRED)?;
            require_non_empty(&req.user_id, msg::CAR_AND_USER_REQUIRED)?;

            let mut conn = state.db.get()?;
            let receipt = ledger::purchase_car_listing(&mut conn, &req.car_id, &req.user_id)?;
            Ok(created_json(receipt))
        }
        Some("purchase_featured") => {
            let req: PurchaseFeaturedRequest = parse_body(body, msg::CAR_AND_USER_REQUIRED)?;
            require_non_empty(&req.car_id, msg::CAR_AND_USER_REQUIRED)?;
            require_non_empty(&req.user_id, msg::CAR_AND_USER_REQUIRED)?;

            let mut conn = state.db.get()?;
            let receipt = ledger::purchase_featured_car(&mut conn, &req.car_id, &req.user_id)?;
            notify_featured(&conn, &state.base_url, &req.car_id);
            Ok(created_json(receipt))
        }
        Some("purchase_membership") => {
            let req: PurchaseMembershipRequest = parse_body(body, msg::DEALER_AND_USER_REQUIRED)?;
            require_non_empty(&req.dealer_account_id, msg::DEALER_AND_USER_REQUIRED)?;
            require_non_empty(&req.user_id, msg::DEALER_AND_USER_REQUIRED)?;

            let mut conn = state.db.get()?;
            let receipt = ledger::purchase_dealer_membership(
                &mut conn,
                &req.dealer_account_id,
                &req.user_id,
                state.grace_period_days,
            )?;
            Ok(created_json(receipt))
        }
        Some("renew_membership") => {
            let req: RenewMembershipRequest = parse_body(body, msg::MEMBERSHIP_AND_USER_REQUIRED)?;
            require_non_empty(&req.membership_id, msg::MEMBERSHIP_AND_USER_REQUIRED)?;
            require_non_empty(&req.user_id, msg::MEMBERSHIP_AND_USER_REQUIRED)?;

            let mut conn = state.db.get()?;
            let receipt = ledger::renew_dealer_membership(
                &mut conn,
                &req.membership_id,
                &req.user_id,
                state.renewal_policy,
                state.grace_period_days,
            )?;
            Ok(ok_json(receipt))
        }
        Some("process_gta_world_payment") => {
            let req: ProcessPaymentRequest = parse_body(body, msg::MISSING_PAYMENT_DATA)?;
            require_non_empty(&req.user_id, msg::MISSING_PAYMENT_DATA)?;
            require_non_empty(&req.reference_id, msg::MISSING_PAYMENT_DATA)?;
            require_non_empty(&req.reference_table, msg::MISSING_PAYMENT_DATA)?;
            if req.amount <= 0 {
                return Err(AppError::BadRequest(msg::MISSING_PAYMENT_DATA.to_string()));
            }

            let mut conn = state.db.get()?;
            let (receipt, settled) = ledger::process_external_payment(
                &mut conn,
                &req.user_id,
                req.payment_type,
                &req.reference_id,
                &req.reference_table,
            )?;

            if matches!(req.payment_type, PaymentType::Membership | PaymentType::Renewal) {
                notify_dealer_payment(&conn, &settled.user_id, settled.amount);
            }

            Ok(ok_json(receipt))
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}

pub async fn payments_put(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response> {
    match query.action.as_deref() {
        Some("update_setting") => {
            let req: UpdateAdminSetting =
                parse_body(body, "Setting key and value required")?;
            require_non_empty(&req.setting_key, "Setting key and value required")?;

            let conn = state.db.get()?;
            if queries::update_admin_setting(&conn, &req.setting_key, &req.setting_value)? {
                Ok(ok_json(MessageResponse {
                    message: "Setting updated successfully",
                }))
            } else {
                Err(AppError::NotFound(
                    "Setting not found or not editable".to_string(),
                ))
            }
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}

/// Queue the `new-featured` notification. Optional side effect of a
/// featured purchase; never fails the purchase.
fn notify_featured(conn: &rusqlite::Connection, base_url: &str, car_id: &str) {
    let car = match queries::get_car_with_names(conn, car_id) {
        Ok(Some(car)) => car,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!("Featured notification lookup failed: {}", e);
            return;
        }
    };

    webhooks::enqueue_best_effort(
        conn,
        "new-featured",
        json!({
            "username": car.seller_name,
            "make": car.make_name,
            "model": car.model_name,
            "price": car.car.price,
            "posting_url": format!("{}/cars/{}", base_url, car.car.id),
        }),
    );
}

/// Queue the `dealer-payment` notification after a membership settlement.
fn notify_dealer_payment(conn: &rusqlite::Connection, user_id: &str, amount: i64) {
    let username = match queries::get_user_by_id(conn, user_id) {
        Ok(Some(user)) => user.name,
        _ => user_id.to_string(),
    };

    webhooks::enqueue_best_effort(
        conn,
        "dealer-payment",
        json!({
            "username": username,
            "amount": amount,
            "plan": "Dealer Membership",
        }),
    );
}
