use serde::{Deserialize, Serialize};

pub const XP_PER_HOUR: f64 = 10.0;
pub const MAX_XP_PER_LEVEL: u64 = 100;

/// Derived XP and level for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpProgress {
    pub xp: u64,
    pub level: u64,
    pub xp_in_level: u64,
    pub max_xp_per_level: u64,
}

impl XpProgress {
    /// `floor(hours * 10) + max(0, bonus)`, split into 100-XP levels.
    pub fn derive(total_hours: f64, bonus_xp: i64) -> Self {
        let hours_xp = if total_hours.is_finite() && total_hours > 0.0 {
            (total_hours * XP_PER_HOUR).floor() as u64
        } else {
            0
        };
        let xp = hours_xp.saturating_add(bonus_xp.max(0) as u64);

        Self {
            xp,
            level: xp / MAX_XP_PER_LEVEL,
            xp_in_level: xp % MAX_XP_PER_LEVEL,
            max_xp_per_level: MAX_XP_PER_LEVEL,
        }
    }
}
