use serde::{Deserialize, Serialize};

/// A key-value platform setting. Only rows with `is_editable` may be
/// changed through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSetting {
    pub setting_key: String,
    pub setting_value: String,
    pub is_editable: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminSetting {
    pub setting_key: String,
    pub setting_value: String,
}
