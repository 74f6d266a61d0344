use serde::{Deserialize, Serialize};

/// A purchasable plan from the immutable pricing catalog.
///
/// Listing and membership plans are day-based; featured plans are
/// hour-based. Prices are integer minor-currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: String,
    pub name: String,
    pub plan_type: PlanType,
    pub price: i64,
    pub duration_days: Option<i64>,
    pub duration_hours: Option<i64>,
    pub is_active: bool,
}

/// Data required to create a catalog plan (seeding and admin tooling).
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentPlan {
    pub name: String,
    pub plan_type: PlanType,
    pub price: i64,
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub duration_hours: Option<i64>,
}

/// What a payment plan entitles the buyer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Listing,
    Featured,
    Membership,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Featured => "featured",
            Self::Membership => "membership",
        }
    }
}

impl std::str::FromStr for PlanType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listing" => Ok(Self::Listing),
            "featured" => Ok(Self::Featured),
            "membership" => Ok(Self::Membership),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
