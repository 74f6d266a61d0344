//! Discord incoming-webhook delivery.

use std::time::Duration;

use serde_json::json;

/// A hung Discord endpoint must only cost this one event, never the batch.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord truncation guard for stored response bodies.
const MAX_STORED_BODY: usize = 500;

/// Outcome of one delivery attempt. Transport errors are folded in
/// (`http_status: None`) so callers never have to unwind across the
/// batch loop.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub http_status: Option<i64>,
    pub body: String,
}

/// Seam between the queue processor and the wire, so the processor can be
/// exercised with a stub.
pub trait WebhookDelivery {
    fn deliver(
        &self,
        url: &str,
        content: &str,
    ) -> impl std::future::Future<Output = DeliveryOutcome> + Send;
}

/// Delivery client for Discord incoming webhooks: POST
/// `{"content": message}`, success is HTTP 200 or 204 (Discord returns
/// 204 No Content unless `?wait=true` is used).
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
}

impl DiscordClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl WebhookDelivery for DiscordClient {
    async fn deliver(&self, url: &str, content: &str) -> DeliveryOutcome {
        let response = self
            .client
            .post(url)
            .json(&json!({ "content": content }))
            .timeout(DELIVERY_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16() as i64;
                let success = status == 200 || status == 204;
                let mut body = resp.text().await.unwrap_or_default();
                if body.len() > MAX_STORED_BODY {
                    let mut cut = MAX_STORED_BODY;
                    while !body.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    body.truncate(cut);
                }
                DeliveryOutcome {
                    success,
                    http_status: Some(status),
                    body,
                }
            }
            Err(e) => DeliveryOutcome {
                success: false,
                http_status: None,
                body: format!("delivery error: {}", e),
            },
        }
    }
}
