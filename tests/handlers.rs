//! HTTP-surface dispatch tests, calling the handlers directly

mod common;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::*;
use serde_json::{json, Value};

use carspot::extractors::{Json, Query};
use carspot::handlers::cars;
use carspot::handlers::payments::{self, PaymentsQuery};
use carspot::handlers::webhooks::{self, WebhooksQuery};

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body was not JSON")
}

fn payments_query(action: &str) -> PaymentsQuery {
    PaymentsQuery {
        action: Some(action.to_string()),
        user_id: None,
        dealer_id: None,
        id: None,
        plan_type: None,
    }
}

fn webhooks_query(action: &str) -> WebhooksQuery {
    WebhooksQuery {
        action: Some(action.to_string()),
    }
}

// ============ /api/payments ============

#[tokio::test]
async fn test_can_list_car_for_private_seller() {
    let state = test_state();
    {
        let conn = state.db.get().unwrap();
        seed_standard_plans(&conn);
    }

    let mut query = payments_query("can_list_car");
    query.user_id = Some("cs_usr_anyone".to_string());

    let response = payments::payments_get(State(state), Query(query))
        .await
        .expect("Handler failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["can_list"], true);
    assert_eq!(body["requires_payment"], true);
    assert_eq!(body["payment_amount"], 1_500);
    assert_eq!(body["reason"], "Private seller - payment required");
}

#[tokio::test]
async fn test_invalid_action_is_bad_request() {
    let state = test_state();

    let err = payments::payments_get(State(state), Query(payments_query("frobnicate")))
        .await
        .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_purchase_listing_returns_created() {
    let state = test_state();
    let (seller, car) = {
        let conn = state.db.get().unwrap();
        seed_standard_plans(&conn);
        let seller = create_test_user(&conn, "Seller");
        let car = create_test_car(&conn, &seller.id, None);
        (seller, car)
    };

    let response = payments::payments_post(
        State(state.clone()),
        Query(payments_query("purchase_listing")),
        Json(json!({"car_id": car.id, "user_id": seller.id})),
    )
    .await
    .expect("Handler failed");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["id"].as_str().unwrap().starts_with("cs_pay_"));
    assert_eq!(body["amount"], 1_500);
    assert!(body["expires_at"].is_i64());
}

#[tokio::test]
async fn test_purchase_listing_with_missing_fields_is_rejected() {
    let state = test_state();

    let err = payments::payments_post(
        State(state),
        Query(payments_query("purchase_listing")),
        Json(json!({"car_id": "cs_car_x"})),
    )
    .await
    .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Car ID and User ID required");
}

#[tokio::test]
async fn test_membership_purchase_and_settlement_flow() {
    let state = test_state();
    let (user, dealer) = {
        let conn = state.db.get().unwrap();
        seed_standard_plans(&conn);
        create_test_dealer(&conn, "Flow")
    };

    let response = payments::payments_post(
        State(state.clone()),
        Query(payments_query("purchase_membership")),
        Json(json!({"dealer_account_id": dealer.id, "user_id": user.id})),
    )
    .await
    .expect("Purchase failed");
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = body_json(response).await;
    let membership_id = receipt["id"].as_str().unwrap().to_string();
    assert_eq!(receipt["amount"], 25_000);

    let response = payments::payments_post(
        State(state.clone()),
        Query(payments_query("process_gta_world_payment")),
        Json(json!({
            "amount": 25_000,
            "user_id": user.id,
            "payment_type": "membership",
            "reference_id": membership_id,
            "reference_table": "dealer_memberships",
        })),
    )
    .await
    .expect("Settlement failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["gta_world_transaction_id"]
        .as_str()
        .unwrap()
        .starts_with("GTW_"));
    assert_eq!(body["status"], "completed");

    // The settlement queued a dealer-payment notification as a side effect
    let conn = state.db.get().unwrap();
    let queued: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM webhook_events WHERE webhook_id = 'dealer-payment'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(queued, 1);
}

#[tokio::test]
async fn test_renew_membership_returns_ok() {
    let state = test_state();
    let (user, membership_id) = {
        let conn = state.db.get().unwrap();
        seed_standard_plans(&conn);
        let (user, dealer) = create_test_dealer(&conn, "Renewer");
        let ts = chrono::Utc::now().timestamp();
        let membership = queries::upsert_membership(
            &conn,
            &dealer.id,
            25_000,
            ts,
            ts + 10 * 86_400,
            ts + 10 * 86_400,
            ts + 40 * 86_400,
        )
        .unwrap();
        (user, membership.id)
    };

    let response = payments::payments_post(
        State(state),
        Query(payments_query("renew_membership")),
        Json(json!({"membership_id": membership_id, "user_id": user.id})),
    )
    .await
    .expect("Handler failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["amount"], 25_000);
    assert!(body["expires_at"].is_i64());
    assert_eq!(body["next_payment_date"], body["expires_at"]);
}

#[tokio::test]
async fn test_update_setting_respects_editability() {
    let state = test_state();

    let response = payments::payments_put(
        State(state.clone()),
        Query(payments_query("update_setting")),
        Json(json!({"setting_key": "site_name", "setting_value": "CarSpot QA"})),
    )
    .await
    .expect("Handler failed");
    assert_eq!(response.status(), StatusCode::OK);

    // schema_version is seeded non-editable
    let err = payments::payments_put(
        State(state),
        Query(payments_query("update_setting")),
        Json(json!({"setting_key": "schema_version", "setting_value": "2"})),
    )
    .await
    .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payment_history_lists_user_transactions() {
    let state = test_state();
    let (seller, car) = {
        let conn = state.db.get().unwrap();
        seed_standard_plans(&conn);
        let seller = create_test_user(&conn, "Historian");
        let car = create_test_car(&conn, &seller.id, None);
        (seller, car)
    };

    payments::payments_post(
        State(state.clone()),
        Query(payments_query("purchase_listing")),
        Json(json!({"car_id": car.id, "user_id": seller.id})),
    )
    .await
    .expect("Purchase failed");

    let mut query = payments_query("payment_history");
    query.user_id = Some(seller.id.clone());
    let response = payments::payments_get(State(state), Query(query))
        .await
        .expect("Handler failed");

    let body = body_json(response).await;
    let history = body.as_array().expect("History should be a list");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["payment_type"], "listing");
    assert_eq!(history[0]["status"], "pending");
}

// ============ /api/webhooks ============

#[tokio::test]
async fn test_get_configs_returns_stock_set() {
    let state = test_state();

    let response = webhooks::webhooks_get(State(state), Query(webhooks_query("get_configs")))
        .await
        .expect("Handler failed");

    let body = body_json(response).await;
    assert_eq!(body["configs"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn test_trigger_without_url_returns_formatted_message() {
    let state = test_state();

    let response = webhooks::webhooks_post(
        State(state),
        Query(webhooks_query("trigger")),
        Json(json!({"webhook_id": "new-user", "data": {"username": "Ada"}})),
    )
    .await
    .expect("Handler failed");

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["formatted_message"], "👋 **Ada** has joined CarSpot!");
}

#[tokio::test]
async fn test_trigger_disabled_webhook_is_rejected() {
    let state = test_state();
    {
        let conn = state.db.get().unwrap();
        queries::update_webhook_config_fields(&conn, "new-user", None, Some(false), None).unwrap();
    }

    let err = webhooks::webhooks_post(
        State(state),
        Query(webhooks_query("trigger")),
        Json(json!({"webhook_id": "new-user", "data": {}})),
    )
    .await
    .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_config_applies_allowlisted_fields_only() {
    let state = test_state();

    let response = webhooks::webhooks_put(
        State(state.clone()),
        Query(webhooks_query("update_config")),
        Json(json!({
            "webhook_id": "new-user",
            "updates": {"enabled": false, "webhook_id": "hijacked", "bogus": 1}
        })),
    )
    .await
    .expect("Handler failed");
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let config = queries::get_webhook_config(&conn, "new-user")
        .unwrap()
        .expect("Config renamed or lost");
    assert!(!config.enabled);
}

#[tokio::test]
async fn test_update_config_with_no_valid_fields_is_rejected() {
    let state = test_state();

    let err = webhooks::webhooks_put(
        State(state),
        Query(webhooks_query("update_config")),
        Json(json!({"webhook_id": "new-user", "updates": {"bogus": 1}})),
    )
    .await
    .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

// ============ /api/cars ============

#[tokio::test]
async fn test_cars_catalog_reads() {
    let state = test_state();
    let (make, dealer) = {
        let conn = state.db.get().unwrap();
        let make = queries::create_car_make(&conn, "bmw", "BMW").unwrap();
        let model = queries::create_car_model(&conn, &make.id, "m3", "M3").unwrap();
        let (user, dealer) = create_test_dealer(&conn, "Inventory");
        queries::create_car(
            &conn,
            &CreateCar {
                seller_id: user.id.clone(),
                dealer_id: Some(dealer.id.clone()),
                make_id: make.id.clone(),
                model_id: model.id,
                price: 52_000,
            },
        )
        .unwrap();
        (make, dealer)
    };

    let response = cars::cars_get(
        State(state.clone()),
        Query(cars::CarsQuery {
            action: Some("models".to_string()),
            make_id: Some(make.id),
            dealer_id: None,
        }),
    )
    .await
    .expect("Handler failed");
    let body = body_json(response).await;
    assert_eq!(body["models"].as_array().unwrap().len(), 1);
    assert_eq!(body["models"][0]["display_name"], "M3");

    let response = cars::cars_get(
        State(state),
        Query(cars::CarsQuery {
            action: Some("dealer".to_string()),
            make_id: None,
            dealer_id: Some(dealer.id),
        }),
    )
    .await
    .expect("Handler failed");
    let body = body_json(response).await;
    let cars = body["cars"].as_array().unwrap();
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0]["make_name"], "BMW");
    assert_eq!(cars[0]["seller_name"], "Inventory");
}
