//! Daily login rewards: a repeating calendar driven by the claim streak.
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{KEY_DAILY, MS_PER_DAY};
use crate::storage::StoredBlob;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DailyError {
    #[error("today's reward was already claimed")]
    AlreadyClaimed,
    #[error("clock went backwards: last claim {last}, today {today}")]
    ClockWentBackwards { last: GameDay, today: GameDay },
    #[error("reward calendar is empty")]
    EmptyCalendar,
}

/// Whole UTC days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameDay(pub u32);

impl GameDay {
    /// Day containing the given millisecond timestamp (e.g. `Date.now()`).
    /// Timestamps before the epoch clamp to day 0.
    #[must_use]
    pub fn from_timestamp_ms(ms: i64) -> Self {
        let days = ms.div_euclid(MS_PER_DAY).max(0);
        Self(u32::try_from(days).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
        let days = date.signed_duration_since(epoch).num_days().max(0);
        Self(u32::try_from(days).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
        epoch
            .checked_add_days(Days::new(u64::from(self.0)))
            .unwrap_or(NaiveDate::MAX)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    #[must_use]
    pub const fn is_day_after(self, earlier: Self) -> bool {
        matches!(earlier.0.checked_add(1), Some(d) if d == self.0)
    }
}

impl fmt::Display for GameDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    pub item_id: String,
    #[serde(default = "one")]
    pub qty: u32,
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReward {
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub item: Option<ItemGrant>,
}

#[derive(Debug, Deserialize)]
struct CalendarFile {
    rewards: Vec<DailyReward>,
}

/// Rewards for consecutive claim days; wraps after the last entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CalendarFile")]
pub struct RewardCalendar {
    rewards: Vec<DailyReward>,
}

impl TryFrom<CalendarFile> for RewardCalendar {
    type Error = DailyError;

    fn try_from(file: CalendarFile) -> Result<Self, Self::Error> {
        Self::new(file.rewards)
    }
}

impl RewardCalendar {
    /// # Errors
    ///
    /// Returns `EmptyCalendar` when no rewards are given.
    pub fn new(rewards: Vec<DailyReward>) -> Result<Self, DailyError> {
        if rewards.is_empty() {
            return Err(DailyError::EmptyCalendar);
        }
        Ok(Self { rewards })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Reward for the given 1-based streak day.
    #[must_use]
    pub fn reward_for_streak(&self, streak: u32) -> &DailyReward {
        let idx = (streak.max(1) - 1) as usize % self.rewards.len();
        &self.rewards[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailyReward> {
        self.rewards.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRewardState {
    #[serde(default)]
    pub last_claim: Option<GameDay>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub total_claims: u32,
}

impl StoredBlob for DailyRewardState {
    const KEY: &'static str = KEY_DAILY;
}

impl DailyRewardState {
    /// Whether a claim on `today` would succeed.
    #[must_use]
    pub fn can_claim(&self, today: GameDay) -> bool {
        self.last_claim.is_none_or(|last| today > last)
    }

    /// Streak as it stands on `today`; a missed day shows as 0.
    #[must_use]
    pub fn current_streak(&self, today: GameDay) -> u32 {
        match self.last_claim {
            Some(last) if last == today || today.is_day_after(last) => self.streak,
            _ => 0,
        }
    }

    /// Streak value a claim on `today` would produce.
    #[must_use]
    pub fn streak_after_claim(&self, today: GameDay) -> u32 {
        match self.last_claim {
            Some(last) if today.is_day_after(last) => self.streak.saturating_add(1),
            _ => 1,
        }
    }

    /// Reward the next claim would pay, or `None` if today is already claimed.
    #[must_use]
    pub fn next_reward<'a>(&self, calendar: &'a RewardCalendar, today: GameDay) -> Option<&'a DailyReward> {
        self.can_claim(today)
            .then(|| calendar.reward_for_streak(self.streak_after_claim(today)))
    }

    /// Claim today's reward. Consecutive days extend the streak; any gap
    /// restarts it at 1.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClaimed` for a second claim on the same day and
    /// `ClockWentBackwards` when `today` precedes the last claim.
    pub fn claim(&mut self, calendar: &RewardCalendar, today: GameDay) -> Result<DailyReward, DailyError> {
        if let Some(last) = self.last_claim {
            if today == last {
                return Err(DailyError::AlreadyClaimed);
            }
            if today < last {
                return Err(DailyError::ClockWentBackwards { last, today });
            }
        }
        self.streak = self.streak_after_claim(today);
        self.best_streak = self.best_streak.max(self.streak);
        self.total_claims = self.total_claims.saturating_add(1);
        self.last_claim = Some(today);
        Ok(calendar.reward_for_streak(self.streak).clone())
    }
}
