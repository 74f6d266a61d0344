//! Prefixed ID generation for CarSpot entities.
//!
//! All IDs use a `cs_` brand prefix so application identifiers can never
//! collide with GTA-World gateway transaction IDs (`GTW_...`) or Discord
//! snowflakes that also pass through the system.
//!
//! Format: `cs_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// Entity types that have prefixed IDs in CarSpot.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    DealerAccount,
    Car,
    CarMake,
    CarModel,
    PaymentPlan,
    Membership,
    ListingPayment,
    FeaturedCar,
    Transaction,
    WebhookEvent,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityType::User => "cs_usr_",
            EntityType::DealerAccount => "cs_dlr_",
            EntityType::Car => "cs_car_",
            EntityType::CarMake => "cs_make_",
            EntityType::CarModel => "cs_model_",
            EntityType::PaymentPlan => "cs_plan_",
            EntityType::Membership => "cs_mem_",
            EntityType::ListingPayment => "cs_pay_",
            EntityType::FeaturedCar => "cs_feat_",
            EntityType::Transaction => "cs_txn_",
            EntityType::WebhookEvent => "cs_evt_",
        }
    }
}

/// Generate a new prefixed ID for the given entity type.
pub fn generate(entity: EntityType) -> String {
    format!("{}{}", entity.prefix(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_carry_prefix() {
        let id = generate(EntityType::Transaction);
        assert!(id.starts_with("cs_txn_"));
        assert_eq!(id.len(), "cs_txn_".len() + 32);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate(EntityType::Car);
        let b = generate(EntityType::Car);
        assert_ne!(a, b);
    }
}
