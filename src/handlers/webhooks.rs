//! The `/api/webhooks` surface: notification config management and the
//! synchronous manual trigger. The batch queue drain has no HTTP surface;
//! it runs as a background task or via `--process-webhooks`.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{SaveWebhookConfig, UpdateWebhookConfig, WebhookConfig};
use crate::webhooks::discord::{DiscordClient, WebhookDelivery};
use crate::webhooks::template;

#[derive(Debug, Deserialize)]
pub struct WebhooksQuery {
    pub action: Option<String>,
}

#[derive(Serialize)]
struct ConfigsResponse {
    configs: Vec<WebhookConfig>,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
struct TriggerRequest {
    webhook_id: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Result of a synchronous manual trigger. Unlike the queue path, the
/// caller sees the delivery outcome inline.
#[derive(Serialize)]
struct TriggerResponse {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_code: Option<i64>,
}

pub async fn webhooks_get(
    State(state): State<AppState>,
    Query(query): Query<WebhooksQuery>,
) -> Result<Response> {
    match query.action.as_deref() {
        Some("get_configs") => {
            let conn = state.db.get()?;
            let configs = queries::list_webhook_configs(&conn)?;
            Ok(Json(ConfigsResponse { configs }).into_response())
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}

pub async fn webhooks_post(
    State(state): State<AppState>,
    Query(query): Query<WebhooksQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response> {
    match query.action.as_deref() {
        Some("save_config") => {
            let input: SaveWebhookConfig = serde_json::from_value(body)
                .map_err(|_| AppError::BadRequest(msg::WEBHOOK_ID_REQUIRED.to_string()))?;
            if input.webhook_id.trim().is_empty() {
                return Err(AppError::BadRequest(msg::WEBHOOK_ID_REQUIRED.to_string()));
            }

            let conn = state.db.get()?;
            queries::save_webhook_config(&conn, &input)?;
            Ok(Json(MessageResponse {
                success: true,
                message: "Webhook configuration saved successfully",
            })
            .into_response())
        }
        Some("trigger") => {
            let req: TriggerRequest = serde_json::from_value(body)
                .map_err(|_| AppError::BadRequest(msg::WEBHOOK_ID_REQUIRED.to_string()))?;
            if req.webhook_id.trim().is_empty() {
                return Err(AppError::BadRequest(msg::WEBHOOK_ID_REQUIRED.to_string()));
            }

            let config = {
                let conn = state.db.get()?;
                queries::get_enabled_webhook_config(&conn, &req.webhook_id)?.ok_or_else(|| {
                    AppError::BadRequest("Webhook not found or disabled".to_string())
                })?
            };

            let message = template::render(&config.message_template, &req.data);

            if config.url.is_empty() {
                return Ok(Json(TriggerResponse {
                    success: true,
                    message: "Webhook triggered (no delivery target configured)",
                    formatted_message: Some(message),
                    http_code: None,
                })
                .into_response());
            }

            let client = DiscordClient::new(state.http.clone());
            let outcome = client.deliver(&config.url, &message).await;
            if !outcome.success {
                return Err(AppError::Upstream(format!(
                    "Webhook delivery failed (status {}): {}",
                    outcome
                        .http_status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                    outcome.body
                )));
            }

            Ok(Json(TriggerResponse {
                success: true,
                message: "Webhook triggered successfully",
                formatted_message: None,
                http_code: outcome.http_status,
            })
            .into_response())
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}

pub async fn webhooks_put(
    State(state): State<AppState>,
    Query(query): Query<WebhooksQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response> {
    match query.action.as_deref() {
        Some("update_config") => {
            let input: UpdateWebhookConfig = serde_json::from_value(body)
                .map_err(|_| AppError::BadRequest(msg::WEBHOOK_ID_REQUIRED.to_string()))?;
            if input.webhook_id.trim().is_empty() {
                return Err(AppError::BadRequest(msg::WEBHOOK_ID_REQUIRED.to_string()));
            }

            // Explicit allowlist; everything else in `updates` is ignored.
            // An empty template never overwrites a stored one.
            let url = input.updates.get("url").and_then(|v| v.as_str());
            let enabled = input.updates.get("enabled").and_then(|v| v.as_bool());
            let message_template = input
                .updates
                .get("message_template")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty());

            if url.is_none() && enabled.is_none() && message_template.is_none() {
                return Err(AppError::BadRequest("No valid fields to update".to_string()));
            }

            let conn = state.db.get()?;
            let updated = queries::update_webhook_config_fields(
                &conn,
                &input.webhook_id,
                url,
                enabled,
                message_template,
            )?;
            if !updated {
                return Err(AppError::NotFound("Webhook config not found".to_string()));
            }

            Ok(Json(MessageResponse {
                success: true,
                message: "Webhook configuration updated successfully",
            })
            .into_response())
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}
