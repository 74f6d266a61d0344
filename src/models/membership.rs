use serde::{Deserialize, Serialize};

/// A dealer account's membership row. One row per dealer account,
/// upserted on repurchase.
///
/// Entitlement is granted the moment the membership is written (`active`),
/// while the matching payment transaction is still `pending` - the
/// provisional-trust model. The pending ledger row is the record that
/// settlement is still owed.
///
/// Invariant: `grace_period_end > end_date`. While `now` is before
/// `grace_period_end` the dealer keeps listing rights even after
/// `end_date` has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerMembership {
    pub id: String,
    pub dealer_account_id: String,
    pub status: MembershipStatus,
    pub start_date: i64,
    pub end_date: i64,
    pub monthly_fee: i64,
    pub next_payment_date: i64,
    pub grace_period_end: i64,
    pub last_payment_date: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Expired,
    Provisional,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Provisional => "provisional",
        }
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "provisional" => Ok(Self::Provisional),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a renewal's new expiry is anchored.
///
/// `ExtendFromExpiry` extends from `max(now, end_date)` so renewing early
/// never forfeits remaining paid time. `ExtendFromNow` reproduces the
/// legacy behavior of resetting the window from the renewal moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalPolicy {
    ExtendFromNow,
    ExtendFromExpiry,
}

impl std::str::FromStr for RenewalPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extend_from_now" => Ok(Self::ExtendFromNow),
            "extend_from_expiry" => Ok(Self::ExtendFromExpiry),
            _ => Err(()),
        }
    }
}
