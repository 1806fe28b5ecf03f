//! Daily execution quota and static creation caps, grounded on
//! `rate_limiter_service.py`. Both check paths fail open: if the
//! coordination store is unreachable, the caller is allowed through and a
//! sentinel limit is reported rather than surfacing an infra error.

use async_trait::async_trait;

use crate::coordination::CoordinationStore;
use crate::domain::Tier;

pub const DAILY_QUOTA_TTL_SECS: u64 = 86_400;

fn daily_quota_for(tier: Tier) -> u64 {
    match tier {
        Tier::Free => 100,
        Tier::Pro => 10,
    }
}

fn url_creation_cap_for(tier: Tier) -> u64 {
    match tier {
        Tier::Free => 10,
        Tier::Pro => 10,
    }
}

fn job_creation_cap_for(tier: Tier) -> u64 {
    match tier {
        Tier::Free => 10,
        Tier::Pro => 100,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub current: u64,
    pub limit: u64,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check_rate_limit(&self, webhook_id: uuid::Uuid, tier: Tier) -> QuotaCheck;
    async fn increment(&self, webhook_id: uuid::Uuid) -> anyhow::Result<u64>;
}

pub struct CoordinationRateLimiter<S: CoordinationStore> {
    store: S,
}

impl<S: CoordinationStore> CoordinationRateLimiter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(webhook_id: uuid::Uuid) -> String {
        format!("rl:webhook:{webhook_id}")
    }
}

#[async_trait]
impl<S: CoordinationStore + Send + Sync> RateLimiter for CoordinationRateLimiter<S> {
    async fn check_rate_limit(&self, webhook_id: uuid::Uuid, tier: Tier) -> QuotaCheck {
        let limit = daily_quota_for(tier);
        let key = Self::key(webhook_id);

        match self.store.get(&key).await {
            Ok(Some(current)) => QuotaCheck {
                allowed: current < limit,
                current,
                limit,
            },
            Ok(None) => QuotaCheck {
                allowed: true,
                current: 0,
                limit,
            },
            Err(_) => QuotaCheck {
                // fail open: never block on a store outage, report the pro
                // limit as the sentinel per rate_limiter_service.py's
                // fallback value.
                allowed: true,
                current: 0,
                limit: daily_quota_for(Tier::Pro),
            },
        }
    }

    async fn increment(&self, webhook_id: uuid::Uuid) -> anyhow::Result<u64> {
        let key = Self::key(webhook_id);
        let new_count = self.store.incr(&key).await?;
        if new_count == 1 {
            self.store.expire(&key, DAILY_QUOTA_TTL_SECS).await?;
        }
        Ok(new_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationKind {
    Url,
    Job,
}

pub fn check_creation_cap(kind: CreationKind, tier: Tier, current_count: u64) -> QuotaCheck {
    let limit = match kind {
        CreationKind::Url => url_creation_cap_for(tier),
        CreationKind::Job => job_creation_cap_for(tier),
    };
    QuotaCheck {
        allowed: current_count < limit,
        current: current_count,
        limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_quota_preserves_the_literal_tier_inversion() {
        // Free tier has a *higher* daily quota than pro, per the original
        // rate_limiter_service.py RATE_LIMITS table. This looks backwards
        // and is preserved intentionally.
        assert_eq!(daily_quota_for(Tier::Free), 100);
        assert_eq!(daily_quota_for(Tier::Pro), 10);
    }

    #[test]
    fn job_creation_cap_favors_pro() {
        assert_eq!(job_creation_cap_for(Tier::Free), 10);
        assert_eq!(job_creation_cap_for(Tier::Pro), 100);
    }

    #[test]
    fn url_creation_cap_is_equal_across_tiers() {
        assert_eq!(url_creation_cap_for(Tier::Free), 10);
        assert_eq!(url_creation_cap_for(Tier::Pro), 10);
    }

    #[test]
    fn creation_cap_rejects_at_limit() {
        let check = check_creation_cap(CreationKind::Job, Tier::Free, 10);
        assert!(!check.allowed);
        let check = check_creation_cap(CreationKind::Job, Tier::Free, 9);
        assert!(check.allowed);
    }
}
