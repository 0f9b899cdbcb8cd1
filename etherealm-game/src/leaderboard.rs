//! Device-local leaderboard: best score per address, highest first.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::address::Address;
use crate::constants::{KEY_LEADERBOARD, LEADERBOARD_CAPACITY};
use crate::daily::GameDay;
use crate::storage::StoredBlob;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub address: Address,
    pub name: String,
    pub score: u64,
    #[serde(default)]
    pub level: u32,
    pub day: GameDay,
}

/// Outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// New or improved entry, now at this 1-based rank.
    Ranked(usize),
    /// Did not beat the address's existing score.
    NotImproved,
    /// Improved, but fell below the board cutoff.
    BelowCutoff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,
}

impl StoredBlob for Leaderboard {
    const KEY: &'static str = KEY_LEADERBOARD;
}

fn rank_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.day.cmp(&b.day))
        .then_with(|| a.address.cmp(&b.address))
}

impl Leaderboard {
    /// Record a score. Only an address's best score is kept; ties go to the
    /// earlier day, then the lower address.
    pub fn submit(&mut self, entry: LeaderboardEntry) -> Submission {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.address == entry.address) {
            if entry.score <= existing.score {
                // Keep profile details fresh even when the score stands.
                existing.name.clone_from(&entry.name);
                existing.level = existing.level.max(entry.level);
                return Submission::NotImproved;
            }
            *existing = entry.clone();
        } else {
            self.entries.push(entry.clone());
        }
        self.entries.sort_by(rank_order);
        self.entries.truncate(LEADERBOARD_CAPACITY);
        self.rank_of(&entry.address)
            .map_or(Submission::BelowCutoff, Submission::Ranked)
    }

    #[must_use]
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// 1-based rank of `address`, if on the board.
    #[must_use]
    pub fn rank_of(&self, address: &Address) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| &e.address == address)
            .map(|pos| pos + 1)
    }

    #[must_use]
    pub fn entry_for(&self, address: &Address) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| &e.address == address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0_u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn entry(n: u8, score: u64, day: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            address: addr(n),
            name: format!("p{n}"),
            score,
            level: 1,
            day: GameDay(day),
        }
    }

    #[test]
    fn board_orders_by_score_then_day_then_address() {
        let mut board = Leaderboard::default();
        board.submit(entry(3, 50, 2));
        board.submit(entry(1, 90, 5));
        board.submit(entry(2, 50, 1));
        board.submit(entry(4, 50, 1));
        let order: Vec<u8> = board.entries.iter().map(|e| e.address.as_bytes()[19]).collect();
        assert_eq!(order, vec![1, 2, 4, 3]);
        assert_eq!(board.rank_of(&addr(4)), Some(3));
        assert_eq!(board.top(2).len(), 2);
        assert_eq!(board.top(10).len(), 4);
    }

    #[test]
    fn only_best_score_per_address_is_kept() {
        let mut board = Leaderboard::default();
        assert_eq!(board.submit(entry(1, 100, 1)), Submission::Ranked(1));
        let mut renamed = entry(1, 80, 2);
        renamed.name = "renamed".into();
        renamed.level = 9;
        assert_eq!(board.submit(renamed), Submission::NotImproved);
        let kept = board.entry_for(&addr(1)).unwrap();
        assert_eq!(kept.score, 100);
        assert_eq!(kept.name, "renamed");
        assert_eq!(kept.level, 9);
        assert_eq!(board.submit(entry(1, 150, 3)), Submission::Ranked(1));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn board_is_capped() {
        let mut board = Leaderboard::default();
        for n in 0..=u8::try_from(LEADERBOARD_CAPACITY).unwrap() {
            board.submit(entry(n, 1_000 + u64::from(n), 1));
        }
        assert_eq!(board.len(), LEADERBOARD_CAPACITY);
        assert_eq!(board.submit(entry(250, 1, 1)), Submission::BelowCutoff);
        assert!(board.rank_of(&addr(0)).is_none());
    }
}
