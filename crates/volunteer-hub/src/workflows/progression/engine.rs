use std::cmp::Reverse;
use std::collections::BTreeSet;

use super::catalog::{all_templates, tier_templates, QuestTemplate};
use super::domain::{Badge, ClaimKey, Quest, QuestFacts, QuestKey, QuestTier};

/// Resolves both tiers against `facts` and the user's claimed set, ordered for display.
pub fn compute_quests(facts: &QuestFacts, claimed: &BTreeSet<ClaimKey>) -> Vec<Quest> {
    let mut quests: Vec<Quest> = all_templates()
        .map(|template| resolve(template, facts, claimed))
        .collect();
    sort_quests(&mut quests);
    quests
}

/// Same as [`compute_quests`] restricted to the tier matching `facts.level`.
pub fn quests_for_level(facts: &QuestFacts, claimed: &BTreeSet<ClaimKey>) -> Vec<Quest> {
    let tier = QuestTier::for_level(facts.level);
    let mut quests: Vec<Quest> = tier_templates(tier)
        .iter()
        .map(|template| resolve(template, facts, claimed))
        .collect();
    sort_quests(&mut quests);
    quests
}

/// Bucket descending (3, 1, 0), then key ascending.
pub fn sort_quests(quests: &mut [Quest]) {
    quests.sort_by(|left, right| {
        (Reverse(left.priority()), &left.key).cmp(&(Reverse(right.priority()), &right.key))
    });
}

fn resolve(template: &QuestTemplate, facts: &QuestFacts, claimed: &BTreeSet<ClaimKey>) -> Quest {
    let claim_key = template.claim_key();
    Quest {
        key: QuestKey(template.key.to_string()),
        title: template.title.to_string(),
        tier: template.tier,
        xp_reward: template.xp_reward,
        is_done: template.is_done(facts),
        claimed: claimed.contains(&claim_key),
        claim_key,
        badge_on_claim: template.badge(),
    }
}

/// Side effects a successful claim asks the caller to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDecision {
    pub claim_key: ClaimKey,
    pub xp_reward: u32,
    pub badge: Option<Badge>,
}

/// Returns the reward to apply, or `None` when the quest is not done or already claimed.
pub fn claim_quest(quest: &Quest) -> Option<ClaimDecision> {
    if !quest.claimable() {
        return None;
    }

    Some(ClaimDecision {
        claim_key: quest.claim_key.clone(),
        xp_reward: quest.xp_reward,
        badge: quest.badge_on_claim.clone(),
    })
}
