use serde::{Deserialize, Serialize};

/// One row in the append-only money-movement ledger.
///
/// Every purchase or renewal writes exactly one `pending` row at creation
/// and exactly one transition to `completed` once the GTA-World gateway
/// confirms. `(payment_type, reference_id, reference_table)` uniquely
/// identifies the entitlement row the transaction settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub payment_type: PaymentType,
    pub reference_id: String,
    pub reference_table: String,
    pub status: TransactionStatus,
    pub gta_world_transaction_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Listing,
    Featured,
    Membership,
    Renewal,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Featured => "featured",
            Self::Membership => "membership",
            Self::Renewal => "renewal",
        }
    }
}

impl std::str::FromStr for PaymentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listing" => Ok(Self::Listing),
            "featured" => Ok(Self::Featured),
            "membership" => Ok(Self::Membership),
            "renewal" => Ok(Self::Renewal),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
