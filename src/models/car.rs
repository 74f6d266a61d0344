use serde::{Deserialize, Serialize};

/// A vehicle listing. The ledger touches `status`, `listing_payment_id`,
/// `listing_expires_at`, `is_featured` and `featured_until`; everything
/// else is catalog data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub seller_id: String,
    pub dealer_id: Option<String>,
    pub make_id: String,
    pub model_id: String,
    pub price: i64,
    pub status: CarStatus,
    pub is_featured: bool,
    pub featured_until: Option<i64>,
    pub listing_payment_id: Option<String>,
    pub listing_expires_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    Draft,
    Active,
    Sold,
    Expired,
    Removed,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Expired => "expired",
            Self::Removed => "removed",
        }
    }
}

impl std::str::FromStr for CarStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "sold" => Ok(Self::Sold),
            "expired" => Ok(Self::Expired),
            "removed" => Ok(Self::Removed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data required to create a car listing row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCar {
    pub seller_id: String,
    #[serde(default)]
    pub dealer_id: Option<String>,
    pub make_id: String,
    pub model_id: String,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarMake {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarModel {
    pub id: String,
    pub make_id: String,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub sort_order: i64,
}

/// A car row joined with its display names for inventory listings.
#[derive(Debug, Clone, Serialize)]
pub struct CarWithNames {
    #[serde(flatten)]
    pub car: Car,
    pub make_name: String,
    pub model_name: String,
    pub seller_name: String,
}
