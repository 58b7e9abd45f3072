use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::identity::UserId;

use super::domain::{Badge, Quest, QuestFacts, QuestKey};
use super::engine::{claim_quest, compute_quests, ClaimDecision};
use super::repository::{BadgeStore, ClaimStore, StoreError, XpLedger};
use super::xp::XpProgress;

/// Composes the pure quest engine with claim, badge, and XP persistence.
pub struct ProgressionService<C, B, L> {
    claims: Arc<C>,
    badges: Arc<B>,
    ledger: Arc<L>,
}

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub quest: QuestKey,
    pub claimed: bool,
    pub xp_awarded: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_granted: Option<Badge>,
}

impl ClaimReceipt {
    fn rejected(quest: QuestKey) -> Self {
        Self {
            quest,
            claimed: false,
            xp_awarded: 0,
            badge_granted: None,
        }
    }
}

impl<C, B, L> ProgressionService<C, B, L>
where
    C: ClaimStore + 'static,
    B: BadgeStore + 'static,
    L: XpLedger + 'static,
{
    pub fn new(claims: Arc<C>, badges: Arc<B>, ledger: Arc<L>) -> Self {
        Self {
            claims,
            badges,
            ledger,
        }
    }

    /// Ordered quest list for `user`.
    pub fn quests(&self, user: &UserId, facts: &QuestFacts) -> Result<Vec<Quest>, ProgressionError> {
        let claimed = self.claims.claimed_keys(user)?;
        Ok(compute_quests(facts, &claimed))
    }

    /// Claims `quest_key` if it is done and unclaimed. Never grants twice.
    pub fn claim(
        &self,
        user: &UserId,
        quest_key: &QuestKey,
        facts: &QuestFacts,
    ) -> Result<ClaimReceipt, ProgressionError> {
        let quest = self
            .quests(user, facts)?
            .into_iter()
            .find(|quest| &quest.key == quest_key)
            .ok_or_else(|| ProgressionError::UnknownQuest(quest_key.clone()))?;

        let Some(decision) = claim_quest(&quest) else {
            debug!(%user, quest = %quest.key, done = quest.is_done, claimed = quest.claimed, "claim precondition not met");
            return Ok(ClaimReceipt::rejected(quest.key));
        };

        if !self.claims.record_claim(user, &decision.claim_key)? {
            debug!(%user, claim_key = %decision.claim_key, "claim already recorded");
            return Ok(ClaimReceipt::rejected(quest.key));
        }

        let (badge_granted, bonus_xp) = match self.apply_rewards(user, &decision) {
            Ok(applied) => applied,
            Err(error) => {
                if let Err(release) = self.claims.release_claim(user, &decision.claim_key) {
                    warn!(%user, claim_key = %decision.claim_key, %release, "claim left recorded without its reward");
                }
                return Err(error);
            }
        };

        info!(
            %user,
            quest = %quest.key,
            xp = decision.xp_reward,
            bonus_xp,
            badge = badge_granted.as_ref().map(|badge| badge.key.0.as_str()),
            "quest claimed"
        );

        Ok(ClaimReceipt {
            quest: quest.key,
            claimed: true,
            xp_awarded: decision.xp_reward,
            badge_granted,
        })
    }

    /// Grants the badge and credits XP for a freshly recorded claim.
    /// Returns the badge if this call granted it, plus the new bonus XP.
    fn apply_rewards(
        &self,
        user: &UserId,
        decision: &ClaimDecision,
    ) -> Result<(Option<Badge>, i64), ProgressionError> {
        let mut granted = None;
        if let Some(badge) = &decision.badge {
            if self.badges.grant_badge(user, badge)? {
                granted = Some(badge.clone());
            }
        }
        let bonus_xp = self.ledger.credit(user, decision.xp_reward)?;
        Ok((granted, bonus_xp))
    }

    /// XP and level from verified hours plus the ledger's bonus XP.
    pub fn progress(&self, user: &UserId, total_hours: f64) -> Result<XpProgress, ProgressionError> {
        let bonus_xp = self.ledger.bonus_xp(user)?;
        Ok(XpProgress::derive(total_hours, bonus_xp))
    }

    pub fn badges(&self, user: &UserId) -> Result<Vec<Badge>, ProgressionError> {
        Ok(self.badges.badges(user)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("unknown quest '{0}'")]
    UnknownQuest(QuestKey),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProgressionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProgressionError::UnknownQuest(_) => StatusCode::NOT_FOUND,
            ProgressionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
