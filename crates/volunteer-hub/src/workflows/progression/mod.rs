//! Gamified progression: quest definitions, claim bookkeeping, and XP levels.
//!
//! The engine is pure. [`ProgressionService`] layers the claim, badge, and XP
//! stores on top so a claim is recorded once and its reward applied once.

pub mod catalog;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;
pub mod xp;

#[cfg(test)]
mod tests;

pub use domain::{Badge, BadgeKey, ClaimKey, Quest, QuestFacts, QuestKey, QuestTier};
pub use engine::{claim_quest, compute_quests, quests_for_level, ClaimDecision};
pub use repository::{BadgeStore, ClaimStore, HoursSource, StoreError, XpLedger};
pub use router::{progression_router, ProgressionState};
pub use service::{ClaimReceipt, ProgressionError, ProgressionService};
pub use xp::{XpProgress, MAX_XP_PER_LEVEL};
