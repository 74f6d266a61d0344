use serde::{Deserialize, Serialize};

/// One row per paid listing purchase. `cars.listing_expires_at` is
/// denormalized from `listing_end_date` for fast expiry queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarListingPayment {
    pub id: String,
    pub car_id: String,
    pub user_id: String,
    pub plan_id: String,
    pub amount: i64,
    pub listing_start_date: i64,
    pub listing_end_date: i64,
    pub payment_status: EntitlementStatus,
    pub created_at: i64,
}

/// A featured-placement purchase. The car counts as featured while `now`
/// is in `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedCar {
    pub id: String,
    pub car_id: String,
    pub user_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub payment_status: EntitlementStatus,
    pub created_at: i64,
}

/// Settlement state of an entitlement row. Rows are written `provisional`
/// at purchase time and flipped to `paid` by external settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    Provisional,
    Paid,
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisional => "provisional",
            Self::Paid => "paid",
        }
    }
}

impl std::str::FromStr for EntitlementStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provisional" => Ok(Self::Provisional),
            "paid" => Ok(Self::Paid),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
