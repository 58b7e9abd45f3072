use std::collections::BTreeSet;

use crate::identity::UserId;

use super::domain::{Badge, BadgeKey, ClaimKey};

/// Per-user record of claimed quests.
pub trait ClaimStore: Send + Sync {
    fn is_claimed(&self, user: &UserId, key: &ClaimKey) -> Result<bool, StoreError>;
    /// Recording an existing claim is a no-op; returns whether a new row was written.
    fn record_claim(&self, user: &UserId, key: &ClaimKey) -> Result<bool, StoreError>;
    /// Undoes a claim whose reward could not be applied. Releasing an absent claim is a no-op.
    fn release_claim(&self, user: &UserId, key: &ClaimKey) -> Result<(), StoreError>;
    fn claimed_keys(&self, user: &UserId) -> Result<BTreeSet<ClaimKey>, StoreError>;
}

/// Per-user badge collection.
pub trait BadgeStore: Send + Sync {
    fn has_badge(&self, user: &UserId, key: &BadgeKey) -> Result<bool, StoreError>;
    /// Granting an owned badge is a no-op; returns whether the badge was new.
    fn grant_badge(&self, user: &UserId, badge: &Badge) -> Result<bool, StoreError>;
    fn badges(&self, user: &UserId) -> Result<Vec<Badge>, StoreError>;
}

/// Accumulated bonus XP (quest claims, verified-hour awards).
pub trait XpLedger: Send + Sync {
    fn bonus_xp(&self, user: &UserId) -> Result<i64, StoreError>;
    fn credit(&self, user: &UserId, amount: u32) -> Result<i64, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("progression store unavailable: {0}")]
    Unavailable(String),
}

/// Source of verified volunteer hours for XP derivation.
pub trait HoursSource: Send + Sync {
    fn verified_hours(&self, user: &UserId) -> Result<f64, StoreError>;
}
