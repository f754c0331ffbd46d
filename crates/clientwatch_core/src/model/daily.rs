//! Daily challenge slot.
//!
//! # Responsibility
//! - Hold today's three challenges drawn from a fixed pool.
//! - Regenerate and reroll picks without duplicates.
//!
//! # Invariants
//! - A fresh slot holds exactly `DAILY_SLOT_COUNT` distinct pool entries.
//! - A slot whose `date` is not today, or whose length is wrong, is stale.
//! - Item ids are pool ids, so "already present" is an id comparison.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of challenges offered per day.
pub const DAILY_SLOT_COUNT: usize = 3;

/// Static pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub xp: i64,
}

const fn challenge(id: &'static str, label: &'static str, xp: i64) -> ChallengeTemplate {
    ChallengeTemplate { id, label, xp }
}

/// Pool that daily picks are drawn from.
pub const CHALLENGE_POOL: &[ChallengeTemplate] = &[
    challenge("dc-calls-5", "Make 5 prospecting calls", 150),
    challenge("dc-emails-10", "Send 10 personalised emails", 120),
    challenge("dc-linkedin-3", "Connect with 3 decision makers", 90),
    challenge("dc-post-1", "Publish one piece of content", 80),
    challenge("dc-reviews-1", "Ask a happy client for a review", 100),
    challenge("dc-pipeline", "Update every open lead status", 60),
    challenge("dc-followups-3", "Follow up with 3 stale leads", 110),
    challenge("dc-meeting-1", "Book one meeting", 200),
    challenge("dc-proposal-1", "Send one proposal", 180),
    challenge("dc-research-15", "Research 15 new prospects", 70),
];

/// One drawn challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyItem {
    pub id: String,
    pub label: String,
    pub xp: i64,
    #[serde(default)]
    pub done: bool,
}

impl From<&ChallengeTemplate> for DailyItem {
    fn from(template: &ChallengeTemplate) -> Self {
        Self {
            id: template.id.to_string(),
            label: template.label.to_string(),
            xp: template.xp,
            done: false,
        }
    }
}

/// Date-stamped set of today's challenges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailySlot {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub items: Vec<DailyItem>,
}

impl DailySlot {
    /// Draws a fresh slot for `date` without replacement.
    pub fn generate<R: Rng + ?Sized>(date: &str, rng: &mut R) -> Self {
        Self {
            date: date.to_string(),
            items: CHALLENGE_POOL
                .choose_multiple(rng, DAILY_SLOT_COUNT)
                .map(DailyItem::from)
                .collect(),
        }
    }

    /// Whether this slot must be regenerated for `today`.
    pub fn is_stale(&self, today: &str) -> bool {
        self.date != today || self.items.len() != DAILY_SLOT_COUNT
    }

    /// Replaces item `id` with a pool entry not currently present.
    ///
    /// Falls back to the whole pool when every entry is already present.
    /// Returns `false` when `id` is not in the slot.
    pub fn reroll<R: Rng + ?Sized>(&mut self, id: &str, rng: &mut R) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };

        let candidates: Vec<&ChallengeTemplate> = CHALLENGE_POOL
            .iter()
            .filter(|template| !self.items.iter().any(|item| item.id == template.id))
            .collect();
        let replacement = if candidates.is_empty() {
            CHALLENGE_POOL.choose(rng)
        } else {
            candidates.choose(rng).copied()
        };

        if let Some(template) = replacement {
            self.items[index] = DailyItem::from(template);
        }
        true
    }
}
