use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a quest within its tier (e.g. `basics`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestKey(pub String);

/// Identifier under which a claim is recorded per user (e.g. `l0_basics`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimKey(pub String);

/// Identifier for a collectable badge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BadgeKey(pub String);

impl fmt::Display for QuestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl fmt::Display for BadgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Badge handed out the first time a quest is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub key: BadgeKey,
    pub label: String,
}

/// Snapshot of everything the quest predicates look at. Supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestFacts {
    pub full_name: String,
    pub interests: String,
    pub email_verified: bool,
    pub total_hours: f64,
    pub availability: String,
    pub applied_count: u32,
    pub saved_count: u32,
    pub location: String,
    pub about: String,
    pub level: i32,
}

impl QuestFacts {
    pub fn has_full_name(&self) -> bool {
        is_set(&self.full_name)
    }

    pub fn has_interests(&self) -> bool {
        is_set(&self.interests)
    }

    pub fn has_availability(&self) -> bool {
        is_set(&self.availability)
    }

    pub fn has_location(&self) -> bool {
        is_set(&self.location)
    }

    pub fn has_about(&self) -> bool {
        is_set(&self.about)
    }
}

fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

/// The two fixed quest tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestTier {
    Starter,
    Explorer,
}

impl QuestTier {
    /// Tier a profile at `level` would be offered when filtering by level.
    pub const fn for_level(level: i32) -> Self {
        if level <= 0 {
            QuestTier::Starter
        } else {
            QuestTier::Explorer
        }
    }
}

/// A quest with its completion and claim state resolved for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub key: QuestKey,
    pub title: String,
    pub tier: QuestTier,
    pub xp_reward: u32,
    pub is_done: bool,
    pub claim_key: ClaimKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_on_claim: Option<Badge>,
    pub claimed: bool,
}

impl Quest {
    pub fn claimable(&self) -> bool {
        self.is_done && !self.claimed
    }

    /// Display bucket: ready to claim first, then open quests, then claimed ones.
    pub const fn priority(&self) -> u8 {
        if self.claimed {
            0
        } else if self.is_done {
            3
        } else {
            1
        }
    }
}
