//! Simulated players driving the core game client.
use anyhow::{Context, Result};
use etherealm_game::{
    Address, CharacterClass, EquipmentSlot, GameClient, GameData, GameDay, MemoryStore, MockChain,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;

/// First simulated day; any fixed day works since the clock is injected.
pub const START_DAY: GameDay = GameDay(20_000);

/// Order in which a player spends skill points.
const SKILL_PRIORITY: [&str; 6] = [
    "power_strike",
    "toughness",
    "swiftness",
    "iron_skin",
    "fortune",
    "berserk",
];

/// Counters gathered while a player plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    pub days_played: u32,
    pub battles: u32,
    pub wins: u32,
    pub quests_claimed: u32,
    pub items_bought: u32,
    pub skill_ranks: u32,
    pub final_level: u32,
    pub final_gold: u64,
    pub best_streak: u32,
    pub score: u64,
}

/// One device: shared storage, catalogs, and a mock chain funded for a
/// handful of wallets.
pub struct World {
    pub store: MemoryStore,
    pub data: Arc<GameData>,
    pub chain: MockChain,
}

impl World {
    pub const WALLETS: u8 = 4;
    pub const STARTING_TOKENS: u128 = 1_000;

    #[must_use]
    pub fn new(data: Arc<GameData>) -> Self {
        let chain = MockChain::new(data.chain.clone());
        let native = data.chain.mint_price.base_units().saturating_mul(10);
        for n in 1..=Self::WALLETS {
            chain.add_account(wallet(n), native, Self::STARTING_TOKENS);
        }
        Self {
            store: MemoryStore::new(),
            data,
            chain,
        }
    }

    #[must_use]
    pub fn guest(&self, seed: u64) -> Player {
        Player::new(GameClient::guest(self.store.clone(), Arc::clone(&self.data)), seed)
    }

    #[must_use]
    pub fn player(&self, n: u8, seed: u64) -> Player {
        let client = GameClient::for_account(self.store.clone(), Arc::clone(&self.data), wallet(n));
        Player::new(client, seed.wrapping_add(u64::from(n)))
    }
}

/// Deterministic wallet address for simulated player `n`.
#[must_use]
pub fn wallet(n: u8) -> Address {
    let mut bytes = [0_u8; 20];
    bytes[0] = 0xe7;
    bytes[19] = n;
    Address::from_bytes(bytes)
}

pub struct Player {
    pub client: GameClient<MemoryStore>,
    rng: ChaCha8Rng,
    pub metrics: RunMetrics,
}

impl Player {
    fn new(client: GameClient<MemoryStore>, seed: u64) -> Self {
        Self {
            client,
            rng: ChaCha8Rng::seed_from_u64(seed),
            metrics: RunMetrics::default(),
        }
    }

    /// Mint a character with a class picked by the player's RNG.
    ///
    /// # Errors
    /// Fails for guests and on chain errors.
    pub async fn mint(&mut self, world: &World, name: &str) -> Result<CharacterClass> {
        let class = CharacterClass::ALL[self.rng.gen_range(0..CharacterClass::ALL.len())];
        self.client
            .mint_character(&world.chain, name, class)
            .await
            .with_context(|| format!("minting {name}"))?;
        Ok(class)
    }

    fn has_character(&self) -> bool {
        self.client.roster().active().is_some()
    }

    /// One day of play: login reward, a few battles, quest rewards, then
    /// skills, gear and a leaderboard entry.
    ///
    /// # Errors
    /// Fails on any client error the scripted player should never hit.
    pub fn play_day(&mut self, day: GameDay) -> Result<()> {
        self.client.refresh_quests(day)?;
        self.client
            .claim_daily(day)
            .with_context(|| format!("claiming daily reward on day {day}"))?;
        let battles = self.rng.gen_range(3..=6);
        for _ in 0..battles {
            self.battle()?;
        }
        self.claim_quests()?;
        self.spend_skill_points()?;
        self.upgrade_gear()?;
        self.claim_quests()?;
        if self.client.owner().is_some() {
            self.submit_score(day)?;
        }
        self.metrics.days_played += 1;
        self.snapshot();
        Ok(())
    }

    fn battle(&mut self) -> Result<()> {
        let power = self.client.combat_stats().map_or(0, |s| s.power());
        #[allow(clippy::cast_precision_loss)]
        let odds = (0.55 + power as f64 / 1_000.0).clamp(0.35, 0.9);
        let won = self.rng.gen_bool(odds);
        let (gold, xp) = if won {
            (self.rng.gen_range(15..=35), self.rng.gen_range(40..=80))
        } else {
            (5, 10)
        };
        let xp = if self.has_character() { xp } else { 0 };
        let report = self.client.record_battle(won, gold, xp)?;
        self.metrics.battles += 1;
        if won {
            self.metrics.wins += 1;
        }
        if report.levels_gained > 0 {
            log::debug!("{} reached a new level", self.client.namespace().account());
        }
        Ok(())
    }

    fn claim_quests(&mut self) -> Result<()> {
        let ready: Vec<String> = self
            .client
            .quests()
            .claimable(&self.client.data().quests)
            .into_iter()
            .map(str::to_string)
            .collect();
        for id in ready {
            self.client.claim_quest(&id)?;
            self.metrics.quests_claimed += 1;
        }
        Ok(())
    }

    fn spend_skill_points(&mut self) -> Result<()> {
        'spend: while self.client.skills().unspent > 0 {
            for skill in SKILL_PRIORITY {
                if self.client.allocate_skill(skill).is_ok() {
                    self.metrics.skill_ranks += 1;
                    continue 'spend;
                }
            }
            break;
        }
        Ok(())
    }

    /// Buy and equip the cheapest affordable piece that beats the current
    /// one in each slot, selling what it replaces.
    fn upgrade_gear(&mut self) -> Result<()> {
        if !self.has_character() {
            return Ok(());
        }
        let data = self.client.data();
        let level = self.client.roster().active().map_or(1, |c| c.level);
        for slot in EquipmentSlot::ALL {
            let current = self
                .client
                .equipment()
                .equipped(slot)
                .and_then(|id| data.items.get(id))
                .map_or(0, |def| def.stats.power());
            let gold = self.client.inventory().gold;
            let upgrade = data.items.shop_listing().into_iter().find(|def| {
                def.kind.slot() == Some(slot)
                    && def.level_req <= level
                    && def.price <= gold
                    && def.stats.power() > current
            });
            let Some(def) = upgrade else { continue };
            self.client.buy(&def.id, 1)?;
            self.metrics.items_bought += 1;
            if let Some(old) = self.client.equip(&def.id)? {
                self.client.sell(&old, 1)?;
            }
        }
        Ok(())
    }

    fn submit_score(&mut self, day: GameDay) -> Result<()> {
        let Some(stats) = self.client.combat_stats() else {
            return Ok(());
        };
        let level = self.client.roster().active().map_or(1, |c| c.level);
        let score = u64::try_from(stats.power()).unwrap_or(0) * u64::from(level);
        self.client.submit_score(score, day)?;
        self.metrics.score = self.metrics.score.max(score);
        Ok(())
    }

    /// Copy end-of-day state into the metrics.
    pub fn snapshot(&mut self) {
        self.metrics.final_level = self.client.roster().active().map_or(0, |c| c.level);
        self.metrics.final_gold = self.client.inventory().gold;
        self.metrics.best_streak = self.client.daily().best_streak;
    }
}
