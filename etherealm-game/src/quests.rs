//! Daily quests: a small rotating set of objectives rolled per account per day.
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;

use crate::constants::{DAILY_QUEST_COUNT, KEY_QUESTS};
use crate::daily::{DailyReward, GameDay};
use crate::seed::daily_rng;
use crate::storage::StoredBlob;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestError {
    #[error("quest {0} is not active today")]
    UnknownQuest(String),
    #[error("quest {id} is not complete ({progress}/{target})")]
    NotComplete { id: String, progress: u32, target: u32 },
    #[error("quest {0} reward already claimed")]
    AlreadyClaimed(String),
    #[error("invalid quest catalog: {0}")]
    InvalidCatalog(String),
}

/// Something the player did that quests can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    BattleWon,
    BattleLost,
    GoldEarned { amount: u64 },
    ItemEquipped,
    SkillPointSpent,
    DailyClaimed,
    TokensSent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestObjective {
    WinBattles,
    PlayBattles,
    EarnGold,
    EquipItems,
    SpendSkillPoints,
    ClaimDailyReward,
    SendTokens,
}

impl QuestObjective {
    /// Progress `event` contributes toward this objective.
    #[must_use]
    pub fn progress_for(self, event: GameEvent) -> u32 {
        match (self, event) {
            (Self::WinBattles, GameEvent::BattleWon)
            | (Self::PlayBattles, GameEvent::BattleWon | GameEvent::BattleLost)
            | (Self::EquipItems, GameEvent::ItemEquipped)
            | (Self::SpendSkillPoints, GameEvent::SkillPointSpent)
            | (Self::ClaimDailyReward, GameEvent::DailyClaimed)
            | (Self::SendTokens, GameEvent::TokensSent) => 1,
            (Self::EarnGold, GameEvent::GoldEarned { amount }) => {
                u32::try_from(amount).unwrap_or(u32::MAX)
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDef {
    pub id: String,
    pub name: String,
    pub objective: QuestObjective,
    pub target: u32,
    #[serde(default)]
    pub reward: DailyReward,
}

#[derive(Debug, Deserialize)]
struct QuestFile {
    quests: Vec<QuestDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "QuestFile")]
pub struct QuestCatalog {
    quests: Vec<QuestDef>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TryFrom<QuestFile> for QuestCatalog {
    type Error = QuestError;

    fn try_from(file: QuestFile) -> Result<Self, Self::Error> {
        Self::new(file.quests)
    }
}

impl QuestCatalog {
    /// # Errors
    ///
    /// Returns `InvalidCatalog` for duplicate ids or zero targets.
    pub fn new(quests: Vec<QuestDef>) -> Result<Self, QuestError> {
        let mut index = HashMap::with_capacity(quests.len());
        for (pos, quest) in quests.iter().enumerate() {
            if quest.target == 0 {
                return Err(QuestError::InvalidCatalog(format!("{} has target 0", quest.id)));
            }
            if index.insert(quest.id.clone(), pos).is_some() {
                return Err(QuestError::InvalidCatalog(format!("duplicate quest {}", quest.id)));
            }
        }
        Ok(Self { quests, index })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&QuestDef> {
        self.index.get(id).map(|&pos| &self.quests[pos])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestDef> {
        self.quests.iter()
    }

    fn position(&self, id: &str) -> usize {
        self.index.get(id).copied().unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: String,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub claimed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    #[serde(default)]
    pub day: Option<GameDay>,
    #[serde(default)]
    pub active: SmallVec<[QuestProgress; DAILY_QUEST_COUNT]>,
}

impl StoredBlob for QuestLog {
    const KEY: &'static str = KEY_QUESTS;
}

impl QuestLog {
    /// Roll today's quests if the log belongs to another day. Returns `true`
    /// when a new set was rolled. The roll is a pure function of
    /// `(account_seed, today)`.
    pub fn refresh(&mut self, catalog: &QuestCatalog, today: GameDay, account_seed: u64) -> bool {
        if self.day == Some(today) {
            return false;
        }
        let mut rng = daily_rng(account_seed, "quests", today);
        let mut picked: Vec<&QuestDef> = catalog
            .quests
            .choose_multiple(&mut rng, DAILY_QUEST_COUNT)
            .collect();
        picked.sort_by_key(|q| catalog.position(&q.id));
        self.active = picked
            .into_iter()
            .map(|q| QuestProgress {
                quest_id: q.id.clone(),
                progress: 0,
                claimed: false,
            })
            .collect();
        self.day = Some(today);
        log::debug!("rolled {} quests for {today}", self.active.len());
        true
    }

    /// Apply an event to every unclaimed quest. Returns ids that became
    /// complete because of this event.
    pub fn record(&mut self, catalog: &QuestCatalog, event: GameEvent) -> Vec<String> {
        let mut completed = Vec::new();
        for entry in self.active.iter_mut().filter(|e| !e.claimed) {
            let Some(def) = catalog.get(&entry.quest_id) else {
                continue;
            };
            let delta = def.objective.progress_for(event);
            if delta == 0 || entry.progress >= def.target {
                continue;
            }
            entry.progress = entry.progress.saturating_add(delta).min(def.target);
            if entry.progress >= def.target {
                completed.push(entry.quest_id.clone());
            }
        }
        completed
    }

    #[must_use]
    pub fn is_complete(&self, catalog: &QuestCatalog, id: &str) -> bool {
        self.active
            .iter()
            .find(|e| e.quest_id == id)
            .zip(catalog.get(id))
            .is_some_and(|(entry, def)| entry.progress >= def.target)
    }

    /// Mark a completed quest as claimed and return its reward.
    ///
    /// # Errors
    ///
    /// Fails for quests not active today, incomplete quests, and quests that
    /// were already claimed.
    pub fn claim(&mut self, catalog: &QuestCatalog, id: &str) -> Result<DailyReward, QuestError> {
        let def = catalog
            .get(id)
            .ok_or_else(|| QuestError::UnknownQuest(id.to_string()))?;
        let entry = self
            .active
            .iter_mut()
            .find(|e| e.quest_id == id)
            .ok_or_else(|| QuestError::UnknownQuest(id.to_string()))?;
        if entry.claimed {
            return Err(QuestError::AlreadyClaimed(id.to_string()));
        }
        if entry.progress < def.target {
            return Err(QuestError::NotComplete {
                id: id.to_string(),
                progress: entry.progress,
                target: def.target,
            });
        }
        entry.claimed = true;
        Ok(def.reward.clone())
    }

    /// Completed quests whose reward has not been claimed.
    #[must_use]
    pub fn claimable(&self, catalog: &QuestCatalog) -> Vec<&str> {
        self.active
            .iter()
            .filter(|e| !e.claimed && self.is_complete(catalog, &e.quest_id))
            .map(|e| e.quest_id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest(id: &str, objective: QuestObjective, target: u32) -> QuestDef {
        QuestDef {
            id: id.to_string(),
            name: id.to_string(),
            objective,
            target,
            reward: DailyReward {
                gold: 25,
                ..DailyReward::default()
            },
        }
    }

    fn catalog() -> QuestCatalog {
        QuestCatalog::new(vec![
            quest("win3", QuestObjective::WinBattles, 3),
            quest("play5", QuestObjective::PlayBattles, 5),
            quest("gold200", QuestObjective::EarnGold, 200),
            quest("equip1", QuestObjective::EquipItems, 1),
            quest("skill1", QuestObjective::SpendSkillPoints, 1),
            quest("login", QuestObjective::ClaimDailyReward, 1),
        ])
        .unwrap()
    }

    fn log_with(ids: &[&str]) -> QuestLog {
        QuestLog {
            day: Some(GameDay(1)),
            active: ids
                .iter()
                .map(|id| QuestProgress {
                    quest_id: (*id).to_string(),
                    progress: 0,
                    claimed: false,
                })
                .collect(),
        }
    }

    #[test]
    fn refresh_is_deterministic_per_day() {
        let cat = catalog();
        let mut a = QuestLog::default();
        let mut b = QuestLog::default();
        assert!(a.refresh(&cat, GameDay(500), 99));
        assert!(b.refresh(&cat, GameDay(500), 99));
        assert_eq!(a, b);
        assert_eq!(a.active.len(), DAILY_QUEST_COUNT);
        assert!(!a.refresh(&cat, GameDay(500), 99));
    }

    #[test]
    fn refresh_rolls_new_day_and_resets_progress() {
        let cat = catalog();
        let mut log = QuestLog::default();
        log.refresh(&cat, GameDay(1), 5);
        for entry in &mut log.active {
            entry.progress = 1;
        }
        assert!(log.refresh(&cat, GameDay(2), 5));
        assert!(log.active.iter().all(|e| e.progress == 0 && !e.claimed));
        assert_eq!(log.day, Some(GameDay(2)));
    }

    #[test]
    fn small_catalog_yields_every_quest() {
        let cat = QuestCatalog::new(vec![quest("only", QuestObjective::WinBattles, 1)]).unwrap();
        let mut log = QuestLog::default();
        log.refresh(&cat, GameDay(3), 1);
        assert_eq!(log.active.len(), 1);
    }

    #[test]
    fn events_advance_matching_objectives_and_clamp() {
        let cat = catalog();
        let mut log = log_with(&["win3", "play5", "gold200"]);
        log.record(&cat, GameEvent::BattleWon);
        log.record(&cat, GameEvent::BattleLost);
        let done = log.record(&cat, GameEvent::GoldEarned { amount: 500 });
        assert_eq!(done, vec!["gold200".to_string()]);
        assert_eq!(log.active[0].progress, 1);
        assert_eq!(log.active[1].progress, 2);
        assert_eq!(log.active[2].progress, 200);
        assert!(log.record(&cat, GameEvent::GoldEarned { amount: 1 }).is_empty());
    }

    #[test]
    fn claim_requires_completion_once() {
        let cat = catalog();
        let mut log = log_with(&["login", "equip1"]);
        assert_eq!(
            log.claim(&cat, "login"),
            Err(QuestError::NotComplete {
                id: "login".into(),
                progress: 0,
                target: 1
            })
        );
        log.record(&cat, GameEvent::DailyClaimed);
        assert_eq!(log.claimable(&cat), vec!["login"]);
        assert_eq!(log.claim(&cat, "login").unwrap().gold, 25);
        assert_eq!(
            log.claim(&cat, "login"),
            Err(QuestError::AlreadyClaimed("login".into()))
        );
        assert!(matches!(log.claim(&cat, "win3"), Err(QuestError::UnknownQuest(_))));
        assert!(log.claimable(&cat).is_empty());
    }

    #[test]
    fn catalog_rejects_zero_targets() {
        assert!(QuestCatalog::new(vec![quest("bad", QuestObjective::WinBattles, 0)]).is_err());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&GameEvent::GoldEarned { amount: 5 }).unwrap();
        assert_eq!(json, r#"{"type":"gold_earned","amount":5}"#);
    }
}
