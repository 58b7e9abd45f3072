use serde::{Deserialize, Serialize};

use super::domain::OpportunityCapacity;

/// Whether a fresh application is promoted straight to `accepted`.
///
/// Requires the FCFS flag, a defined positive slot count, and room below it.
pub fn decide_acceptance(capacity: &OpportunityCapacity, current_accepted: u64) -> bool {
    match capacity.slots {
        Some(slots) if capacity.fcfs && slots > 0 => current_accepted < u64::from(slots),
        _ => false,
    }
}

/// How the count-then-promote step reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceMode {
    /// Count and promote in one conditional write; slots cannot be overshot.
    #[default]
    Atomic,
    /// Separate count read and status write. Concurrent applicants can both
    /// observe free capacity and overshoot `slots`.
    ReadThenWrite,
}

impl AcceptanceMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "atomic" => Some(Self::Atomic),
            "read_then_write" | "legacy" => Some(Self::ReadThenWrite),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AcceptanceMode::Atomic => "atomic",
            AcceptanceMode::ReadThenWrite => "read_then_write",
        }
    }
}
