use anyhow::Result;
use etherealm_game::GameData;
use std::sync::Arc;

use crate::player::RunMetrics;

mod catalog;

/// Inputs shared by every scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub data: Arc<GameData>,
    pub seed: u64,
    pub days: u32,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Smoke,
    DailyStreak,
    Grinder,
    Social,
    ChainMint,
}

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    kind: ScenarioKind,
}

const SCENARIOS: [Scenario; 5] = [
    Scenario {
        key: "smoke",
        name: "Smoke Test",
        description: "Mint a character and play a single day",
        kind: ScenarioKind::Smoke,
    },
    Scenario {
        key: "daily-streak",
        name: "Daily Streak",
        description: "Guest logs in daily, misses one day, and keeps claiming",
        kind: ScenarioKind::DailyStreak,
    },
    Scenario {
        key: "grinder",
        name: "Grinder",
        description: "One wallet plays every day: battles, quests, skills, gear, scores",
        kind: ScenarioKind::Grinder,
    },
    Scenario {
        key: "social",
        name: "Social",
        description: "Two wallets befriend, share a guild, and compete on the board",
        kind: ScenarioKind::Social,
    },
    Scenario {
        key: "chain-mint",
        name: "Chain Mint",
        description: "Mint, level, evolve and transfer against the mock chain",
        kind: ScenarioKind::ChainMint,
    },
];

impl Scenario {
    #[must_use]
    pub const fn kind(&self) -> ScenarioKind {
        self.kind
    }

    /// Play the scenario once and check its expectations.
    ///
    /// # Errors
    /// Returns the first failed step or expectation.
    pub async fn run(&self, ctx: &ScenarioCtx) -> Result<RunMetrics> {
        match self.kind {
            ScenarioKind::Smoke => catalog::smoke(ctx).await,
            ScenarioKind::DailyStreak => catalog::daily_streak(ctx),
            ScenarioKind::Grinder => catalog::grinder(ctx).await,
            ScenarioKind::Social => catalog::social(ctx).await,
            ScenarioKind::ChainMint => catalog::chain_mint(ctx).await,
        }
    }
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<Scenario> {
    let key = key.trim().to_ascii_lowercase();
    SCENARIOS.iter().copied().find(|s| s.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.key, s.description)).collect()
}

#[must_use]
pub fn all_keys() -> Vec<String> {
    SCENARIOS.iter().map(|s| s.key.to_string()).collect()
}
