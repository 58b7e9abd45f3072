use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::identity::{IdentityError, IdentityProvider, UserId};
use crate::workflows::progression::domain::{Badge, BadgeKey, ClaimKey, QuestFacts};
use crate::workflows::progression::repository::{
    BadgeStore, ClaimStore, HoursSource, StoreError, XpLedger,
};
use crate::workflows::progression::{ProgressionService, ProgressionState};

pub(super) fn student() -> UserId {
    UserId("student-ana".to_string())
}

pub(super) fn blank_facts() -> QuestFacts {
    QuestFacts::default()
}

pub(super) fn onboarded_facts() -> QuestFacts {
    QuestFacts {
        full_name: "Ana Lucero".to_string(),
        interests: "food banks, tutoring".to_string(),
        email_verified: true,
        total_hours: 5.0,
        availability: "weekends".to_string(),
        applied_count: 2,
        saved_count: 3,
        location: "Des Moines".to_string(),
        about: "Sophomore who likes to help".to_string(),
        level: 1,
    }
}

pub(super) fn build_service() -> (
    ProgressionService<MemoryClaims, MemoryBadges, MemoryLedger>,
    Arc<MemoryClaims>,
    Arc<MemoryBadges>,
    Arc<MemoryLedger>,
) {
    let claims = Arc::new(MemoryClaims::default());
    let badges = Arc::new(MemoryBadges::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = ProgressionService::new(claims.clone(), badges.clone(), ledger.clone());
    (service, claims, badges, ledger)
}

pub(super) fn build_state(
    service: ProgressionService<MemoryClaims, MemoryBadges, MemoryLedger>,
    hours: f64,
) -> ProgressionState<MemoryClaims, MemoryBadges, MemoryLedger> {
    ProgressionState {
        service: Arc::new(service),
        identity: Arc::new(StaticIdentity::single("tok-ana", student())),
        hours: Arc::new(StaticHours(hours)),
    }
}

#[derive(Default)]
pub(super) struct MemoryClaims {
    claims: Mutex<HashMap<UserId, BTreeSet<ClaimKey>>>,
}

impl ClaimStore for MemoryClaims {
    fn is_claimed(&self, user: &UserId, key: &ClaimKey) -> Result<bool, StoreError> {
        let guard = self.claims.lock().expect("claims mutex poisoned");
        Ok(guard.get(user).is_some_and(|keys| keys.contains(key)))
    }

    fn record_claim(&self, user: &UserId, key: &ClaimKey) -> Result<bool, StoreError> {
        let mut guard = self.claims.lock().expect("claims mutex poisoned");
        Ok(guard.entry(user.clone()).or_default().insert(key.clone()))
    }

    fn release_claim(&self, user: &UserId, key: &ClaimKey) -> Result<(), StoreError> {
        let mut guard = self.claims.lock().expect("claims mutex poisoned");
        if let Some(keys) = guard.get_mut(user) {
            keys.remove(key);
        }
        Ok(())
    }

    fn claimed_keys(&self, user: &UserId) -> Result<BTreeSet<ClaimKey>, StoreError> {
        let guard = self.claims.lock().expect("claims mutex poisoned");
        Ok(guard.get(user).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(super) struct MemoryBadges {
    badges: Mutex<HashMap<UserId, BTreeMap<BadgeKey, Badge>>>,
}

impl BadgeStore for MemoryBadges {
    fn has_badge(&self, user: &UserId, key: &BadgeKey) -> Result<bool, StoreError> {
        let guard = self.badges.lock().expect("badge mutex poisoned");
        Ok(guard.get(user).is_some_and(|owned| owned.contains_key(key)))
    }

    fn grant_badge(&self, user: &UserId, badge: &Badge) -> Result<bool, StoreError> {
        let mut guard = self.badges.lock().expect("badge mutex poisoned");
        let owned = guard.entry(user.clone()).or_default();
        if owned.contains_key(&badge.key) {
            return Ok(false);
        }
        owned.insert(badge.key.clone(), badge.clone());
        Ok(true)
    }

    fn badges(&self, user: &UserId) -> Result<Vec<Badge>, StoreError> {
        let guard = self.badges.lock().expect("badge mutex poisoned");
        Ok(guard
            .get(user)
            .map(|owned| owned.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    balances: Mutex<HashMap<UserId, i64>>,
}

impl MemoryLedger {
    pub(super) fn set(&self, user: &UserId, amount: i64) {
        self.balances
            .lock()
            .expect("ledger mutex poisoned")
            .insert(user.clone(), amount);
    }
}

impl XpLedger for MemoryLedger {
    fn bonus_xp(&self, user: &UserId) -> Result<i64, StoreError> {
        let guard = self.balances.lock().expect("ledger mutex poisoned");
        Ok(guard.get(user).copied().unwrap_or(0))
    }

    fn credit(&self, user: &UserId, amount: u32) -> Result<i64, StoreError> {
        let mut guard = self.balances.lock().expect("ledger mutex poisoned");
        let balance = guard.entry(user.clone()).or_insert(0);
        *balance += i64::from(amount);
        Ok(*balance)
    }
}

/// Ledger whose first `failures` credits fail before it starts accepting them.
pub(super) struct FlakyLedger {
    inner: MemoryLedger,
    failures: Mutex<u32>,
}

impl FlakyLedger {
    pub(super) fn failing(failures: u32) -> Self {
        Self {
            inner: MemoryLedger::default(),
            failures: Mutex::new(failures),
        }
    }
}

impl XpLedger for FlakyLedger {
    fn bonus_xp(&self, user: &UserId) -> Result<i64, StoreError> {
        self.inner.bonus_xp(user)
    }

    fn credit(&self, user: &UserId, amount: u32) -> Result<i64, StoreError> {
        let mut remaining = self.failures.lock().expect("ledger mutex poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(StoreError::Unavailable("ledger write timed out".to_string()));
        }
        drop(remaining);
        self.inner.credit(user, amount)
    }
}

/// Claim store whose backend is offline.
pub(super) struct OfflineClaims;

impl ClaimStore for OfflineClaims {
    fn is_claimed(&self, _user: &UserId, _key: &ClaimKey) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("claims offline".to_string()))
    }

    fn record_claim(&self, _user: &UserId, _key: &ClaimKey) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("claims offline".to_string()))
    }

    fn release_claim(&self, _user: &UserId, _key: &ClaimKey) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("claims offline".to_string()))
    }

    fn claimed_keys(&self, _user: &UserId) -> Result<BTreeSet<ClaimKey>, StoreError> {
        Err(StoreError::Unavailable("claims offline".to_string()))
    }
}

pub(super) struct StaticIdentity {
    sessions: HashMap<String, UserId>,
}

impl StaticIdentity {
    pub(super) fn single(token: &str, user: UserId) -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(token.to_string(), user);
        Self { sessions }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self, token: &str) -> Result<Option<UserId>, IdentityError> {
        Ok(self.sessions.get(token).cloned())
    }
}

pub(super) struct StaticHours(pub(super) f64);

impl HoursSource for StaticHours {
    fn verified_hours(&self, _user: &UserId) -> Result<f64, StoreError> {
        Ok(self.0)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
