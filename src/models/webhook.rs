use serde::{Deserialize, Serialize};

/// Static per-event notification configuration. `url` may be empty, in
/// which case events for it are acknowledged but not delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: i64,
    pub webhook_id: String,
    pub name: String,
    pub description: String,
    pub webhook_type: WebhookType,
    pub url: String,
    pub enabled: bool,
    pub message_template: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookType {
    Public,
    Private,
    System,
}

impl WebhookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for WebhookType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "system" => Ok(Self::System),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for WebhookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A durable record of a notification intent, decoupled from delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub webhook_id: String,
    /// Flat JSON object; values substitute `{key}` tokens in the template.
    pub event_data: serde_json::Value,
    pub status: EventStatus,
    pub response_code: Option<i64>,
    pub response_message: Option<String>,
    pub attempts: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Lifecycle of a webhook event.
///
/// `pending -> processing` when a batch claims it, then `sent` on
/// success. Failures record `failed` and stay deliverable until the
/// attempt ceiling, after which the event is parked as `dead` and needs
/// manual re-triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Dead,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Dead => "dead",
        }
    }
}

impl std::str::FromStr for EventStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "dead" => Ok(Self::Dead),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body for `POST /api/webhooks?action=save_config`.
#[derive(Debug, Deserialize)]
pub struct SaveWebhookConfig {
    pub webhook_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Absent means "preserve the stored template".
    #[serde(default)]
    pub message_template: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Body for `PUT /api/webhooks?action=update_config`. Only `url`,
/// `enabled` and `message_template` are applied; anything else in
/// `updates` is ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateWebhookConfig {
    pub webhook_id: String,
    pub updates: serde_json::Map<String, serde_json::Value>,
}
