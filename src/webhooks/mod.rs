//! Webhook notification queue.
//!
//! Domain actions record notification intents as durable `webhook_events`
//! rows (`enqueue`); a separate processor renders them through per-event
//! message templates and delivers them to Discord with retry and failure
//! accounting. Enqueue and delivery are fully decoupled: the request that
//! triggered an event returns before any network I/O happens.

pub mod discord;
pub mod processor;
pub mod template;

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::WebhookEvent;

/// A stock notification config seeded at first startup.
pub struct StockConfig {
    pub webhook_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub webhook_type: &'static str,
    pub message_template: &'static str,
}

/// The stock CarSpot notification set. Operators point each at a Discord
/// webhook URL from the staff panel; URLs start out empty (events are
/// acknowledged but not delivered).
pub const STOCK_CONFIGS: &[StockConfig] = &[
    StockConfig {
        webhook_id: "new-postings",
        name: "New Postings",
        description: "Triggered when a user or dealer posts a new vehicle",
        webhook_type: "public",
        message_template: "🚗 **{username}** posted a new vehicle!\n**{make} {model}** - ${price}\n[View Posting]({posting_url})",
    },
    StockConfig {
        webhook_id: "new-featured",
        name: "New Featured",
        description: "Triggered when a vehicle becomes featured",
        webhook_type: "public",
        message_template: "⭐ **{username}** has a new featured vehicle!\n**{make} {model}** - ${price}\n[View Featured Posting]({posting_url})",
    },
    StockConfig {
        webhook_id: "price-alert",
        name: "Price Changes",
        description: "Triggered when vehicle prices change",
        webhook_type: "public",
        message_template: "💰 **Price Update** for {make} {model}\n**Old Price:** ${old_price} → **New Price:** ${new_price}\n[View Posting]({posting_url})",
    },
    StockConfig {
        webhook_id: "sold",
        name: "Vehicle Sold",
        description: "Triggered when a vehicle is marked as sold",
        webhook_type: "public",
        message_template: "✅ **{make} {model}** has been sold!\n**Seller:** {username}\n**Final Price:** ${price}",
    },
    StockConfig {
        webhook_id: "new-user",
        name: "New User Registration",
        description: "Triggered when a new user joins CarSpot",
        webhook_type: "private",
        message_template: "👋 **{username}** has joined CarSpot!",
    },
    StockConfig {
        webhook_id: "dealer-application",
        name: "Dealer Application",
        description: "Triggered when someone applies to become a dealer",
        webhook_type: "private",
        message_template: "🏢 **{username}** has applied to become a dealer!\n[Review Application]({application_url})",
    },
    StockConfig {
        webhook_id: "dealer-payment",
        name: "Dealer Payment",
        description: "Triggered when a dealer pays their membership dues",
        webhook_type: "private",
        message_template: "💳 **{username}** has paid their dealer membership dues!\n**Amount:** ${amount}\n**Plan:** {plan}",
    },
    StockConfig {
        webhook_id: "tickets",
        name: "Support Tickets",
        description: "Triggered for ticket updates (creation, assignment, resolution)",
        webhook_type: "system",
        message_template: "🎫 **{action}**\n**User:** {username}\n**Subject:** {subject}\n**Status:** {status}\n[View Ticket]({ticket_url})",
    },
    StockConfig {
        webhook_id: "reports",
        name: "System Reports",
        description: "Triggered for report updates (creation, investigation, resolution)",
        webhook_type: "system",
        message_template: "🚨 **{action}**\n**Reporter:** {username}\n**Type:** {report_type}\n**Content:** {content}\n[View Report]({report_url})",
    },
];

/// The stock template for a known webhook id, if any.
pub fn stock_template(webhook_id: &str) -> Option<&'static str> {
    STOCK_CONFIGS
        .iter()
        .find(|c| c.webhook_id == webhook_id)
        .map(|c| c.message_template)
}

/// Durably record a notification intent for later delivery.
pub fn enqueue(
    conn: &Connection,
    webhook_id: &str,
    event_data: serde_json::Value,
) -> Result<WebhookEvent> {
    queries::enqueue_webhook_event(conn, webhook_id, &event_data)
}

/// Enqueue as an optional side effect of a primary operation: failures
/// are logged and never propagate to the caller.
pub fn enqueue_best_effort(conn: &Connection, webhook_id: &str, event_data: serde_json::Value) {
    if let Err(e) = enqueue(conn, webhook_id, event_data) {
        tracing::warn!("Failed to enqueue '{}' webhook event: {}", webhook_id, e);
    }
}
