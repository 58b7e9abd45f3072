use super::domain::{Badge, BadgeKey, ClaimKey, QuestFacts, QuestTier};

/// Static quest definition; completion is derived from a facts snapshot.
pub struct QuestTemplate {
    pub key: &'static str,
    pub title: &'static str,
    pub tier: QuestTier,
    pub xp_reward: u32,
    pub claim_key: &'static str,
    pub badge: Option<(&'static str, &'static str)>,
    pub predicate: fn(&QuestFacts) -> bool,
}

impl QuestTemplate {
    pub fn is_done(&self, facts: &QuestFacts) -> bool {
        (self.predicate)(facts)
    }

    pub fn claim_key(&self) -> ClaimKey {
        ClaimKey(self.claim_key.to_string())
    }

    pub fn badge(&self) -> Option<Badge> {
        self.badge.map(|(key, label)| Badge {
            key: BadgeKey(key.to_string()),
            label: label.to_string(),
        })
    }
}

pub const STARTER_QUESTS: &[QuestTemplate] = &[
    QuestTemplate {
        key: "basics",
        title: "Add your full name",
        tier: QuestTier::Starter,
        xp_reward: 20,
        claim_key: "l0_basics",
        badge: None,
        predicate: QuestFacts::has_full_name,
    },
    QuestTemplate {
        key: "interests",
        title: "Tell us what causes you care about",
        tier: QuestTier::Starter,
        xp_reward: 20,
        claim_key: "l0_interests",
        badge: None,
        predicate: QuestFacts::has_interests,
    },
    QuestTemplate {
        key: "applied",
        title: "Apply to your first opportunity",
        tier: QuestTier::Starter,
        xp_reward: 30,
        claim_key: "l0_applied",
        badge: Some(("first_application", "First Application")),
        predicate: |facts| facts.applied_count > 0,
    },
    QuestTemplate {
        key: "verify_email",
        title: "Verify your email address",
        tier: QuestTier::Starter,
        xp_reward: 15,
        claim_key: "l0_verify_email",
        badge: None,
        predicate: |facts| facts.email_verified,
    },
    QuestTemplate {
        key: "availability",
        title: "Share your availability",
        tier: QuestTier::Starter,
        xp_reward: 15,
        claim_key: "l0_availability",
        badge: None,
        predicate: QuestFacts::has_availability,
    },
    QuestTemplate {
        key: "save_any",
        title: "Save an opportunity for later",
        tier: QuestTier::Starter,
        xp_reward: 10,
        claim_key: "l0_save_any",
        badge: None,
        predicate: |facts| facts.saved_count > 0,
    },
];

pub const EXPLORER_QUESTS: &[QuestTemplate] = &[
    QuestTemplate {
        key: "about",
        title: "Write a short bio",
        tier: QuestTier::Explorer,
        xp_reward: 20,
        claim_key: "l1_about",
        badge: None,
        predicate: QuestFacts::has_about,
    },
    QuestTemplate {
        key: "location",
        title: "Add your location",
        tier: QuestTier::Explorer,
        xp_reward: 15,
        claim_key: "l1_location",
        badge: None,
        predicate: QuestFacts::has_location,
    },
    QuestTemplate {
        key: "applied2",
        title: "Apply to two opportunities",
        tier: QuestTier::Explorer,
        xp_reward: 40,
        claim_key: "l1_applied2",
        badge: None,
        predicate: |facts| facts.applied_count >= 2,
    },
    QuestTemplate {
        key: "hours5",
        title: "Log five verified hours",
        tier: QuestTier::Explorer,
        xp_reward: 50,
        claim_key: "l1_hours5",
        badge: Some(("five_hours", "5 Hours Served")),
        predicate: |facts| facts.total_hours >= 5.0,
    },
    QuestTemplate {
        key: "saved3",
        title: "Save three opportunities",
        tier: QuestTier::Explorer,
        xp_reward: 20,
        claim_key: "l1_saved3",
        badge: None,
        predicate: |facts| facts.saved_count >= 3,
    },
];

/// Templates for a single tier.
pub fn tier_templates(tier: QuestTier) -> &'static [QuestTemplate] {
    match tier {
        QuestTier::Starter => STARTER_QUESTS,
        QuestTier::Explorer => EXPLORER_QUESTS,
    }
}

/// Every template across both tiers.
pub fn all_templates() -> impl Iterator<Item = &'static QuestTemplate> {
    STARTER_QUESTS.iter().chain(EXPLORER_QUESTS.iter())
}
