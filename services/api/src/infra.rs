use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use volunteer_hub::identity::{IdentityError, IdentityProvider, UserId};
use volunteer_hub::workflows::applications::{
    AcceptanceMode, Application, ApplicationId, ApplicationRepository, ApplicationService,
    ApplicationStatus, Notification, NotificationError, NotificationPublisher, Opportunity,
    OpportunityDirectory, OpportunityId, RepositoryError,
};
use volunteer_hub::workflows::progression::{
    Badge, BadgeKey, BadgeStore, ClaimKey, ClaimStore, ProgressionService, StoreError, XpLedger,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Applications =
    ApplicationService<InMemoryApplications, InMemoryOpportunities, InMemoryNotifications>;
pub(crate) type Progression = ProgressionService<InMemoryClaims, InMemoryBadges, InMemoryLedger>;

/// Services wired against the in-memory adapters.
pub(crate) struct Platform {
    pub(crate) applications: Arc<Applications>,
    pub(crate) progression: Arc<Progression>,
    pub(crate) notifications: Arc<InMemoryNotifications>,
    pub(crate) identity: Arc<TokenDirectory>,
}

impl Platform {
    pub(crate) fn in_memory(mode: AcceptanceMode, identity: TokenDirectory) -> Self {
        let notifications = Arc::new(InMemoryNotifications::default());
        let applications = Arc::new(ApplicationService::new(
            Arc::new(InMemoryApplications::default()),
            Arc::new(InMemoryOpportunities::default()),
            notifications.clone(),
            mode,
        ));
        let progression = Arc::new(ProgressionService::new(
            Arc::new(InMemoryClaims::default()),
            Arc::new(InMemoryBadges::default()),
            Arc::new(InMemoryLedger::default()),
        ));

        Self {
            applications,
            progression,
            notifications,
            identity: Arc::new(identity),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplications {
    records: Arc<Mutex<BTreeMap<ApplicationId, Application>>>,
}

fn accepted_count(
    records: &BTreeMap<ApplicationId, Application>,
    opportunity: &OpportunityId,
) -> u64 {
    records
        .values()
        .filter(|record| {
            &record.opportunity_id == opportunity && record.status == ApplicationStatus::Accepted
        })
        .count() as u64
}

/// Whether the student already has an active application to the same opportunity.
fn holds_active(
    records: &BTreeMap<ApplicationId, Application>,
    application: &Application,
) -> bool {
    records.values().any(|existing| {
        existing.student_id == application.student_id
            && existing.opportunity_id == application.opportunity_id
            && existing.status.is_active()
    })
}

impl ApplicationRepository for InMemoryApplications {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) || holds_active(&guard, &application) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn count_accepted(&self, opportunity: &OpportunityId) -> Result<u64, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(accepted_count(&guard, opportunity))
    }

    fn list_for_opportunity(
        &self,
        opportunity: &OpportunityId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.opportunity_id == opportunity)
            .cloned()
            .collect())
    }

    fn list_for_student(&self, student: &UserId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.student_id == student)
            .cloned()
            .collect())
    }

    fn accept_if_below_capacity(
        &self,
        application: &ApplicationId,
        opportunity: &OpportunityId,
        slots: u32,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if accepted_count(&guard, opportunity) >= u64::from(slots) {
            return Ok(false);
        }
        let record = guard
            .get_mut(application)
            .ok_or(RepositoryError::NotFound)?;
        record.status = ApplicationStatus::Accepted;
        record.updated_at = chrono::Utc::now();
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOpportunities {
    records: Arc<Mutex<HashMap<OpportunityId, Opportunity>>>,
}

impl OpportunityDirectory for InMemoryOpportunities {
    fn insert(&self, opportunity: Opportunity) -> Result<Opportunity, RepositoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        if guard.contains_key(&opportunity.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(opportunity.id.clone(), opportunity.clone());
        Ok(opportunity)
    }

    fn fetch(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for InMemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotifications {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

#[derive(Default)]
pub(crate) struct InMemoryClaims {
    claims: Mutex<HashMap<UserId, BTreeSet<ClaimKey>>>,
}

impl ClaimStore for InMemoryClaims {
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
pub(crate) struct InMemoryBadges {
    badges: Mutex<HashMap<UserId, BTreeMap<BadgeKey, Badge>>>,
}

impl BadgeStore for InMemoryBadges {
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
pub(crate) struct InMemoryLedger {
    balances: Mutex<HashMap<UserId, i64>>,
}

impl XpLedger for InMemoryLedger {
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

/// Static bearer-token to user map for local runs.
#[derive(Debug, Default, Clone)]
pub(crate) struct TokenDirectory {
    sessions: HashMap<String, UserId>,
}

impl TokenDirectory {
    pub(crate) fn from_sessions(sessions: impl IntoIterator<Item = (String, UserId)>) -> Self {
        Self {
            sessions: sessions.into_iter().collect(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl IdentityProvider for TokenDirectory {
    fn current_user(&self, token: &str) -> Result<Option<UserId>, IdentityError> {
        Ok(self.sessions.get(token).cloned())
    }
}

/// Parses `TOKEN=USER_ID` session arguments.
pub(crate) fn parse_session(raw: &str) -> Result<(String, UserId), String> {
    let (token, user) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TOKEN=USER_ID, found '{raw}'"))?;
    let (token, user) = (token.trim(), user.trim());
    if token.is_empty() || user.is_empty() {
        return Err(format!("token and user id must be non-empty in '{raw}'"));
    }
    Ok((token.to_string(), UserId(user.to_string())))
}

pub(crate) fn parse_acceptance_mode(raw: &str) -> Result<AcceptanceMode, String> {
    AcceptanceMode::parse(raw)
        .ok_or_else(|| format!("unknown acceptance mode '{raw}' (atomic | read_then_write)"))
}
