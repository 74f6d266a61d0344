//! Webhook queue, template and retry-accounting tests

mod common;

use std::sync::Mutex;

use common::*;
use serde_json::json;

use carspot::webhooks::discord::{DeliveryOutcome, WebhookDelivery};
use carspot::webhooks::{self, processor, template};

/// Stub delivery: URLs containing "fail" fail with HTTP 500, everything
/// else succeeds with 204. Calls are recorded for order assertions.
#[derive(Default)]
struct StubDelivery {
    calls: Mutex<Vec<(String, String)>>,
}

impl StubDelivery {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl WebhookDelivery for StubDelivery {
    async fn deliver(&self, url: &str, content: &str) -> DeliveryOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), content.to_string()));

        if url.contains("fail") {
            DeliveryOutcome {
                success: false,
                http_status: Some(500),
                body: "stub failure".to_string(),
            }
        } else {
            DeliveryOutcome {
                success: true,
                http_status: Some(204),
                body: String::new(),
            }
        }
    }
}

fn set_config_url(conn: &rusqlite::Connection, webhook_id: &str, url: &str) {
    queries::update_webhook_config_fields(conn, webhook_id, Some(url), None, None)
        .expect("Failed to set config url");
}

// ============ Template Rendering ============

#[test]
fn test_template_round_trip() {
    let message = template::render(
        "Hi {name}, car {make} {model}",
        &json!({"name": "Bob", "make": "BMW", "model": "M3"}),
    );
    assert_eq!(message, "Hi Bob, car BMW M3");
}

#[test]
fn test_template_missing_key_is_visible_not_raw() {
    let message = template::render("Hi {name}, car {make}", &json!({"name": "Bob"}));
    assert!(!message.contains("{make}"));
    assert!(message.contains("make"));
    assert_eq!(message, "Hi Bob, car (missing: make)");
}

#[test]
fn test_stock_new_user_template_renders() {
    let stock = webhooks::stock_template("new-user").expect("Missing stock template");
    let message = template::render(stock, &json!({"username": "Ada"}));
    assert_eq!(message, "👋 **Ada** has joined CarSpot!");
}

// ============ Seeding & Config Management ============

#[test]
fn test_stock_configs_seeded_once() {
    let conn = setup_test_db();

    let configs = queries::list_webhook_configs(&conn).expect("Query failed");
    assert_eq!(configs.len(), 9);

    let new_user = queries::get_webhook_config(&conn, "new-user")
        .expect("Query failed")
        .expect("Config not found");
    assert!(new_user.enabled);
    assert!(new_user.url.is_empty());
    assert_eq!(new_user.webhook_type, WebhookType::Private);

    // Re-running init must not duplicate or overwrite
    init_db(&conn).expect("Re-init failed");
    let configs = queries::list_webhook_configs(&conn).expect("Query failed");
    assert_eq!(configs.len(), 9);
}

#[test]
fn test_save_config_preserves_template_when_absent() {
    let conn = setup_test_db();
    let before = queries::get_webhook_config(&conn, "sold")
        .expect("Query failed")
        .expect("Config not found");

    queries::save_webhook_config(
        &conn,
        &SaveWebhookConfig {
            webhook_id: "sold".to_string(),
            url: "https://discord.example/hook".to_string(),
            enabled: true,
            message_template: None,
        },
    )
    .expect("Save failed");

    let after = queries::get_webhook_config(&conn, "sold")
        .expect("Query failed")
        .expect("Config not found");
    assert_eq!(after.url, "https://discord.example/hook");
    assert_eq!(after.message_template, before.message_template);
}

#[test]
fn test_save_config_restores_stock_template_on_insert() {
    let conn = setup_test_db();
    conn.execute("DELETE FROM webhook_configs WHERE webhook_id = 'sold'", [])
        .expect("Delete failed");

    queries::save_webhook_config(
        &conn,
        &SaveWebhookConfig {
            webhook_id: "sold".to_string(),
            url: String::new(),
            enabled: true,
            message_template: None,
        },
    )
    .expect("Save failed");

    let config = queries::get_webhook_config(&conn, "sold")
        .expect("Query failed")
        .expect("Config not found");
    assert_eq!(
        config.message_template.as_str(),
        webhooks::stock_template("sold").unwrap()
    );
}

// ============ Enqueue & Claim ============

#[test]
fn test_enqueue_is_durable_and_pending() {
    let conn = setup_test_db();

    let event = webhooks::enqueue(&conn, "new-user", json!({"username": "Ada"}))
        .expect("Enqueue failed");

    let stored = queries::get_webhook_event_by_id(&conn, &event.id)
        .expect("Query failed")
        .expect("Event not found");
    assert_eq!(stored.status, EventStatus::Pending);
    assert_eq!(stored.attempts, 0);
    assert_eq!(stored.event_data["username"], "Ada");
}

#[test]
fn test_claim_is_fifo_and_respects_batch_size() {
    let conn = setup_test_db();

    let first = webhooks::enqueue(&conn, "new-user", json!({"username": "a"})).unwrap();
    let second = webhooks::enqueue(&conn, "new-user", json!({"username": "b"})).unwrap();
    let third = webhooks::enqueue(&conn, "new-user", json!({"username": "c"})).unwrap();
    set_event_created_at(&conn, &first.id, 100);
    set_event_created_at(&conn, &second.id, 200);
    set_event_created_at(&conn, &third.id, 300);

    let claimed = queries::claim_deliverable_events(&conn, 2, 3).expect("Claim failed");

    assert_eq!(claimed.len(), 2);
    assert_eq!(claimed[0].id, first.id);
    assert_eq!(claimed[1].id, second.id);
    for event in &claimed {
        let stored = queries::get_webhook_event_by_id(&conn, &event.id)
            .expect("Query failed")
            .expect("Event not found");
        assert_eq!(stored.status, EventStatus::Processing);
    }

    // The third event is still pending for the next batch
    let stored = queries::get_webhook_event_by_id(&conn, &third.id)
        .expect("Query failed")
        .expect("Event not found");
    assert_eq!(stored.status, EventStatus::Pending);
}

#[test]
fn test_claimed_events_are_invisible_to_second_claim() {
    let conn = setup_test_db();
    webhooks::enqueue(&conn, "new-user", json!({"username": "a"})).unwrap();

    let first = queries::claim_deliverable_events(&conn, 10, 3).expect("Claim failed");
    let second = queries::claim_deliverable_events(&conn, 10, 3).expect("Claim failed");

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn test_claim_skips_disabled_configs() {
    let conn = setup_test_db();
    webhooks::enqueue(&conn, "new-user", json!({"username": "a"})).unwrap();
    queries::update_webhook_config_fields(&conn, "new-user", None, Some(false), None)
        .expect("Disable failed");

    let claimed = queries::claim_deliverable_events(&conn, 10, 3).expect("Claim failed");

    assert!(claimed.is_empty());
}

// ============ Batch Processing ============

#[tokio::test]
async fn test_event_without_url_is_acknowledged_as_sent() {
    let conn = setup_test_db();
    let stub = StubDelivery::default();
    let event = webhooks::enqueue(&conn, "new-user", json!({"username": "Ada"})).unwrap();

    let summary = processor::process_pending(&conn, &stub, 10, 3)
        .await
        .expect("Batch failed");

    assert_eq!(summary.claimed, 1);
    assert_eq!(summary.sent, 1);
    assert!(stub.calls().is_empty(), "No network call for empty URL");

    let stored = queries::get_webhook_event_by_id(&conn, &event.id)
        .expect("Query failed")
        .expect("Event not found");
    assert_eq!(stored.status, EventStatus::Sent);
    assert_eq!(
        stored.response_message.as_deref(),
        Some("No delivery target configured")
    );
}

#[tokio::test]
async fn test_successful_delivery_records_response() {
    let conn = setup_test_db();
    let stub = StubDelivery::default();
    set_config_url(&conn, "new-user", "https://discord.example/ok");
    let event = webhooks::enqueue(&conn, "new-user", json!({"username": "Ada"})).unwrap();

    let summary = processor::process_pending(&conn, &stub, 10, 3)
        .await
        .expect("Batch failed");

    assert_eq!(summary.sent, 1);
    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "👋 **Ada** has joined CarSpot!");

    let stored = queries::get_webhook_event_by_id(&conn, &event.id)
        .expect("Query failed")
        .expect("Event not found");
    assert_eq!(stored.status, EventStatus::Sent);
    assert_eq!(stored.response_code, Some(204));
    assert_eq!(stored.attempts, 0);
}

#[tokio::test]
async fn test_one_failing_event_does_not_abort_the_batch() {
    let conn = setup_test_db();
    let stub = StubDelivery::default();
    set_config_url(&conn, "new-user", "https://discord.example/ok");
    set_config_url(&conn, "sold", "https://discord.example/fail");
    set_config_url(&conn, "new-postings", "https://discord.example/ok");

    let first = webhooks::enqueue(&conn, "new-user", json!({"username": "a"})).unwrap();
    let second = webhooks::enqueue(&conn, "sold", json!({})).unwrap();
    let third = webhooks::enqueue(&conn, "new-postings", json!({})).unwrap();
    set_event_created_at(&conn, &first.id, 100);
    set_event_created_at(&conn, &second.id, 200);
    set_event_created_at(&conn, &third.id, 300);

    let summary = processor::process_pending(&conn, &stub, 10, 3)
        .await
        .expect("Batch failed");

    assert_eq!(summary.claimed, 3);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.dead, 0);

    let statuses: Vec<EventStatus> = [&first, &second, &third]
        .iter()
        .map(|e| {
            queries::get_webhook_event_by_id(&conn, &e.id)
                .expect("Query failed")
                .expect("Event not found")
                .status
        })
        .collect();
    assert_eq!(
        statuses,
        vec![EventStatus::Sent, EventStatus::Failed, EventStatus::Sent]
    );
}

#[tokio::test]
async fn test_failed_event_is_readmitted_then_parked_dead() {
    let conn = setup_test_db();
    let stub = StubDelivery::default();
    set_config_url(&conn, "sold", "https://discord.example/fail");
    let event = webhooks::enqueue(&conn, "sold", json!({})).unwrap();

    // Attempt 1: failed, still deliverable
    let summary = processor::process_pending(&conn, &stub, 10, 2)
        .await
        .expect("Batch failed");
    assert_eq!(summary.failed, 1);
    let stored = queries::get_webhook_event_by_id(&conn, &event.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, EventStatus::Failed);
    assert_eq!(stored.attempts, 1);
    assert_eq!(stored.response_code, Some(500));

    // Attempt 2: ceiling reached, parked dead
    let summary = processor::process_pending(&conn, &stub, 10, 2)
        .await
        .expect("Batch failed");
    assert_eq!(summary.dead, 1);
    let stored = queries::get_webhook_event_by_id(&conn, &event.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, EventStatus::Dead);
    assert_eq!(stored.attempts, 2);

    // Dead events never re-enter the pool
    let summary = processor::process_pending(&conn, &stub, 10, 2)
        .await
        .expect("Batch failed");
    assert_eq!(summary.claimed, 0);
    assert_eq!(stub.calls().len(), 2);
}

#[tokio::test]
async fn test_empty_pool_is_a_noop() {
    let conn = setup_test_db();
    let stub = StubDelivery::default();

    let summary = processor::process_pending(&conn, &stub, 10, 3)
        .await
        .expect("Batch failed");

    assert_eq!(summary.claimed, 0);
    assert!(stub.calls().is_empty());
}
