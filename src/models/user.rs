use serde::{Deserialize, Serialize};

/// A marketplace user. Identity and session handling live in an external
/// collaborator; this row exists for foreign keys and display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub discord: Option<String>,
    pub created_at: i64,
}

/// A dealer account owned by a user. Membership state hangs off this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerAccount {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: i64,
}
