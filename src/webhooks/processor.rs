//! Batch queue processor.
//!
//! Claims deliverable events out of the `pending`/`failed` pool, renders
//! their templates and delivers them, recording per-event outcomes. Each
//! event is processed in isolation: one failing delivery never aborts the
//! rest of the batch.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::models::{EventStatus, WebhookEvent};

use super::discord::WebhookDelivery;
use super::template;

/// Accounting for one processor run.
#[derive(Debug, Default, Serialize)]
pub struct ProcessSummary {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
    pub dead: usize,
}

/// Drain one batch of pending webhook events.
///
/// Events are claimed atomically (flipped to `processing`) before any
/// network I/O, so a concurrent processor invocation cannot double-deliver.
/// A crash after the claim leaves events in `processing`; they stay out of
/// the pool until re-triggered, which is the safe direction for
/// at-least-once delivery to a chat channel.
pub async fn process_pending<D: WebhookDelivery>(
    conn: &Connection,
    delivery: &D,
    batch_size: i64,
    max_attempts: i64,
) -> Result<ProcessSummary> {
    let events = queries::claim_deliverable_events(conn, batch_size, max_attempts)?;

    let mut summary = ProcessSummary {
        claimed: events.len(),
        ..Default::default()
    };

    for event in events {
        match process_one(conn, delivery, &event, max_attempts).await {
            Ok(EventStatus::Sent) => summary.sent += 1,
            Ok(EventStatus::Dead) => summary.dead += 1,
            Ok(_) => summary.failed += 1,
            Err(e) => {
                // Bookkeeping itself failed; isolate the event and move on.
                tracing::error!("Webhook event {} processing error: {}", event.id, e);
                summary.failed += 1;
                let _ = queries::mark_event_failed(
                    conn,
                    &event.id,
                    None,
                    &e.to_string(),
                    max_attempts,
                );
            }
        }
    }

    if summary.claimed > 0 {
        tracing::info!(
            "Webhook batch: {} claimed, {} sent, {} failed, {} dead",
            summary.claimed,
            summary.sent,
            summary.failed,
            summary.dead
        );
    }

    Ok(summary)
}

async fn process_one<D: WebhookDelivery>(
    conn: &Connection,
    delivery: &D,
    event: &WebhookEvent,
    max_attempts: i64,
) -> Result<EventStatus> {
    let Some(config) = queries::get_webhook_config(conn, &event.webhook_id)? else {
        // Config deleted between claim and processing.
        return queries::mark_event_failed(
            conn,
            &event.id,
            None,
            "Webhook config missing",
            max_attempts,
        );
    };

    let message = template::render(&config.message_template, &event.event_data);

    if config.url.is_empty() {
        // Acknowledged, not delivered.
        queries::mark_event_sent(conn, &event.id, None, "No delivery target configured")?;
        return Ok(EventStatus::Sent);
    }

    let outcome = delivery.deliver(&config.url, &message).await;

    if outcome.success {
        queries::mark_event_sent(conn, &event.id, outcome.http_status, &outcome.body)?;
        Ok(EventStatus::Sent)
    } else {
        tracing::warn!(
            "Webhook '{}' delivery failed (event {}, status {:?})",
            event.webhook_id,
            event.id,
            outcome.http_status
        );
        queries::mark_event_failed(
            conn,
            &event.id,
            outcome.http_status,
            &outcome.body,
            max_attempts,
        )
    }
}
