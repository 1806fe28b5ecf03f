use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription tier, derived from `plan_id` by a case-folded prefix match:
/// any plan id starting with "pro" is `Pro`, everything else is `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    pub fn from_plan_id(plan_id: &str) -> Self {
        if plan_id.to_ascii_lowercase().starts_with("pro") {
            Tier::Pro
        } else {
            Tier::Free
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_billing_id: String,
    pub plan_id: String,
    pub status: String,
    pub term_start: DateTime<Utc>,
    pub term_end: DateTime<Utc>,
    pub cancellation_reason: Option<String>,
}

impl Subscription {
    pub fn tier(&self) -> Tier {
        Tier::from_plan_id(&self.plan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert_eq!(Tier::from_plan_id("PRO_MONTHLY"), Tier::Pro);
        assert_eq!(Tier::from_plan_id("pro-annual"), Tier::Pro);
        assert_eq!(Tier::from_plan_id("ProMax"), Tier::Pro);
    }

    #[test]
    fn anything_else_is_free() {
        assert_eq!(Tier::from_plan_id("free"), Tier::Free);
        assert_eq!(Tier::from_plan_id("starter"), Tier::Free);
        assert_eq!(Tier::from_plan_id(""), Tier::Free);
    }
}
