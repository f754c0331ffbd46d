//! Rank ladder derived from the XP counter.
//!
//! # Responsibility
//! - Map one scalar XP value onto tier / subrank / progress.
//! - Own the ladder dimensions (`RankConfig`) and XP clamping rules.
//!
//! # Invariants
//! - Rank is always derived from XP and never persisted.
//! - `xp_to_rank` is pure and total: every `i64` input yields a rank.
//! - Subrank counts down as XP grows (`subranks_per_tier` is entry level,
//!   `1` is tier complete).

use serde::{Deserialize, Serialize};

/// Display names for the default eight-tier ladder, lowest first.
pub const TIER_NAMES: &[&str] = &[
    "Bronze",
    "Silver",
    "Gold",
    "Platinum",
    "Diamond",
    "Master",
    "Grandmaster",
    "Champion",
];

/// Ladder dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankConfig {
    pub tier_count: u32,
    pub subranks_per_tier: u32,
    pub xp_per_subrank: u32,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            tier_count: 8,
            subranks_per_tier: 5,
            xp_per_subrank: 500,
        }
    }
}

impl RankConfig {
    /// XP covered by one full tier. Saturates at `i64::MAX`.
    pub fn tier_span(&self) -> i64 {
        i64::from(self.subranks_per_tier).saturating_mul(i64::from(self.xp_per_subrank))
    }

    /// Highest reachable XP value. Saturates at `i64::MAX`.
    pub fn max_xp(&self) -> i64 {
        i64::from(self.tier_count).saturating_mul(self.tier_span())
    }

    /// Clamps `xp` into `[0, max_xp]`.
    pub fn clamp_xp(&self, xp: i64) -> i64 {
        xp.clamp(0, self.max_xp())
    }

    fn is_degenerate(&self) -> bool {
        self.tier_count == 0 || self.subranks_per_tier == 0 || self.xp_per_subrank == 0
    }
}

/// Derived position on the ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rank {
    /// Zero-based tier index in `[0, tier_count)`.
    pub tier_index: u32,
    /// Position inside the tier in `[1, subranks_per_tier]`.
    pub subrank: u32,
    /// Fraction of the current tier completed, in `[0, 1]`.
    pub progress_in_tier: f64,
    /// Fraction of the current subrank completed, in `[0, 1]`.
    pub progress_in_subrank: f64,
}

impl Rank {
    /// Human label such as `Silver 5`.
    pub fn title(&self) -> String {
        format!("{} {}", tier_name(self.tier_index), self.subrank)
    }
}

/// Returns the display name of one tier, falling back to `Tier N` past the
/// named ladder.
pub fn tier_name(tier_index: u32) -> String {
    TIER_NAMES
        .get(tier_index as usize)
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| format!("Tier {}", tier_index + 1))
}

/// Maps an XP counter onto the ladder described by `config`.
///
/// Input is clamped first, so negative or oversized values land on the
/// first or last rank respectively.
pub fn xp_to_rank(xp: i64, config: &RankConfig) -> Rank {
    if config.is_degenerate() {
        return Rank {
            tier_index: 0,
            subrank: config.subranks_per_tier.max(1),
            progress_in_tier: 0.0,
            progress_in_subrank: 0.0,
        };
    }

    let xp = config.clamp_xp(xp);
    if xp == config.max_xp() {
        return Rank {
            tier_index: config.tier_count - 1,
            subrank: 1,
            progress_in_tier: 1.0,
            progress_in_subrank: 1.0,
        };
    }

    let tier_span = config.tier_span();
    let per_subrank = i64::from(config.xp_per_subrank);
    let tier_index = xp / tier_span;
    let within_tier = xp - tier_index * tier_span;
    let subrank = (i64::from(config.subranks_per_tier) - within_tier / per_subrank).max(1);

    Rank {
        tier_index: tier_index as u32,
        subrank: subrank as u32,
        progress_in_tier: within_tier as f64 / tier_span as f64,
        progress_in_subrank: (within_tier % per_subrank) as f64 / per_subrank as f64,
    }
}

/// XP still missing before the next subrank step; `0` at the top of the ladder.
pub fn xp_to_next_subrank(xp: i64, config: &RankConfig) -> i64 {
    if config.is_degenerate() {
        return 0;
    }
    let xp = config.clamp_xp(xp);
    if xp == config.max_xp() {
        return 0;
    }
    let per_subrank = i64::from(config.xp_per_subrank);
    per_subrank - (xp % config.tier_span()) % per_subrank
}
