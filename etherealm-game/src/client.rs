//! Account-scoped facade over the storage-backed modules.
//!
//! Each operation loads the blobs it touches, applies the change to those
//! copies, and writes them back only once every step has succeeded. Blobs
//! changed together are committed as one [`WriteBatch`].
use anyhow::{Context, Result, bail};
use std::sync::Arc;

use crate::GameData;
use crate::address::{Address, TokenAmount};
use crate::chain::{ChainClient, SyncSummary, TxHash, WriteCall, sync_roster};
use crate::character::{CharacterClass, CharacterError, Roster, validate_name};
use crate::constants::SKILL_POINTS_PER_LEVEL;
use crate::daily::{DailyReward, DailyRewardState, GameDay};
use crate::equipment::{EquipmentSlot, Loadout};
use crate::inventory::Inventory;
use crate::items::StatBlock;
use crate::leaderboard::{Leaderboard, LeaderboardEntry, Submission};
use crate::quests::{GameEvent, QuestLog};
use crate::seed::account_seed;
use crate::shop;
use crate::skills::SkillBook;
use crate::social::{FriendList, GuildDirectory, LeaveOutcome};
use crate::storage::{KeyValueStore, Namespace, StoredBlob, WriteBatch};

/// Result of a finished battle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleReport {
    pub levels_gained: u32,
    pub completed_quests: Vec<String>,
}

/// What a claimed reward actually paid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardReceipt {
    pub reward: DailyReward,
    pub levels_gained: u32,
}

pub struct GameClient<S> {
    store: S,
    ns: Namespace,
    owner: Option<Address>,
    data: Arc<GameData>,
}

impl<S: KeyValueStore> GameClient<S> {
    /// Client for play before a wallet is connected.
    pub fn guest(store: S, data: Arc<GameData>) -> Self {
        Self {
            store,
            ns: Namespace::guest(),
            owner: None,
            data,
        }
    }

    pub fn for_account(store: S, data: Arc<GameData>, owner: Address) -> Self {
        Self {
            store,
            ns: Namespace::for_account(&owner),
            owner: Some(owner),
            data,
        }
    }

    #[must_use]
    pub const fn owner(&self) -> Option<Address> {
        self.owner
    }

    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.ns
    }

    #[must_use]
    pub fn data(&self) -> &GameData {
        &self.data
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn require_owner(&self) -> Result<Address> {
        match self.owner {
            Some(owner) => Ok(owner),
            None => bail!("connect a wallet first"),
        }
    }

    fn load<T: StoredBlob>(&self) -> T {
        T::load(&self.store, &self.ns)
    }

    fn load_global<T: StoredBlob>(&self) -> T {
        T::load(&self.store, &Namespace::global())
    }

    fn save<T: StoredBlob>(&self, blob: &T) -> Result<()> {
        blob.save(&self.store, &self.ns)
            .with_context(|| format!("saving {}", T::KEY))
    }

    fn save_global<T: StoredBlob>(&self, blob: &T) -> Result<()> {
        blob.save(&self.store, &Namespace::global())
            .with_context(|| format!("saving global {}", T::KEY))
    }

    fn commit(&self, batch: WriteBatch, what: &str) -> Result<()> {
        batch
            .commit(&self.store)
            .with_context(|| format!("saving {what}"))
    }

    #[must_use]
    pub fn inventory(&self) -> Inventory {
        self.load()
    }

    #[must_use]
    pub fn equipment(&self) -> Loadout {
        self.load()
    }

    #[must_use]
    pub fn skills(&self) -> SkillBook {
        self.load()
    }

    #[must_use]
    pub fn daily(&self) -> DailyRewardState {
        self.load()
    }

    #[must_use]
    pub fn quests(&self) -> QuestLog {
        self.load()
    }

    #[must_use]
    pub fn roster(&self) -> Roster {
        self.load()
    }

    #[must_use]
    pub fn friends(&self) -> FriendList {
        self.load()
    }

    #[must_use]
    pub fn leaderboard(&self) -> Leaderboard {
        self.load_global()
    }

    #[must_use]
    pub fn guilds(&self) -> GuildDirectory {
        self.load_global()
    }

    fn active_level(roster: &Roster) -> u32 {
        roster.active().map_or(1, |c| c.level)
    }

    /// Buy from the shop. Returns gold spent.
    ///
    /// # Errors
    ///
    /// Fails on unknown items, insufficient gold, or a full inventory.
    pub fn buy(&self, item_id: &str, qty: u32) -> Result<u64> {
        let mut inventory = self.inventory();
        let spent = shop::buy(&self.data.items, &mut inventory, item_id, qty)?;
        self.save(&inventory)?;
        Ok(spent)
    }

    /// Sell back to the shop. Returns gold received.
    ///
    /// # Errors
    ///
    /// Fails on unknown items or when not enough are held.
    pub fn sell(&self, item_id: &str, qty: u32) -> Result<u64> {
        let mut inventory = self.inventory();
        let earned = shop::sell(&self.data.items, &mut inventory, item_id, qty)?;
        let mut quests = self.quests();
        quests.record(&self.data.quests, GameEvent::GoldEarned { amount: earned });
        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &inventory)?;
        batch.stage(&self.ns, &quests)?;
        self.commit(batch, "sale")?;
        Ok(earned)
    }

    /// Equip an owned item at the active character's level.
    ///
    /// # Errors
    ///
    /// Fails under any equip rule; nothing is saved in that case.
    pub fn equip(&self, item_id: &str) -> Result<Option<String>> {
        let mut inventory = self.inventory();
        let mut loadout = self.equipment();
        let level = Self::active_level(&self.roster());
        let replaced = loadout.equip(&self.data.items, &mut inventory, item_id, level)?;
        let mut quests = self.quests();
        quests.record(&self.data.quests, GameEvent::ItemEquipped);
        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &inventory)?;
        batch.stage(&self.ns, &loadout)?;
        batch.stage(&self.ns, &quests)?;
        self.commit(batch, "equipment")?;
        Ok(replaced)
    }

    /// # Errors
    ///
    /// Fails for an empty slot or a full inventory.
    pub fn unequip(&self, slot: EquipmentSlot) -> Result<String> {
        let mut inventory = self.inventory();
        let mut loadout = self.equipment();
        let item = loadout.unequip(&self.data.items, &mut inventory, slot)?;
        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &inventory)?;
        batch.stage(&self.ns, &loadout)?;
        self.commit(batch, "equipment")?;
        Ok(item)
    }

    /// Spend points on one rank of a skill. Returns the new rank.
    ///
    /// # Errors
    ///
    /// Fails under any allocation rule.
    pub fn allocate_skill(&self, skill_id: &str) -> Result<u8> {
        let mut book = self.skills();
        let level = Self::active_level(&self.roster());
        let rank = book.allocate(&self.data.skills, skill_id, level)?;
        let mut quests = self.quests();
        quests.record(&self.data.quests, GameEvent::SkillPointSpent);
        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &book)?;
        batch.stage(&self.ns, &quests)?;
        self.commit(batch, "skill allocation")?;
        Ok(rank)
    }

    /// Refund all spent skill points.
    ///
    /// # Errors
    ///
    /// Fails when the skill book cannot be written.
    pub fn reset_skills(&self) -> Result<u32> {
        let mut book = self.skills();
        let refunded = book.reset();
        self.save(&book)?;
        Ok(refunded)
    }

    /// Add XP to the active character; each level gained grants skill points.
    fn grant_xp(roster: &mut Roster, skills: &mut SkillBook, xp: u64) -> Result<u32, CharacterError> {
        if xp == 0 {
            return Ok(0);
        }
        let levels = roster.active_mut()?.gain_xp(xp);
        skills.grant_points(levels * SKILL_POINTS_PER_LEVEL);
        Ok(levels)
    }

    /// Apply a reward to loaded state. XP is only granted when a character
    /// is active.
    fn apply_reward(
        &self,
        reward: &DailyReward,
        inventory: &mut Inventory,
        roster: &mut Roster,
        skills: &mut SkillBook,
        quests: &mut QuestLog,
    ) -> Result<u32> {
        inventory.add_gold(reward.gold);
        if let Some(grant) = &reward.item {
            inventory
                .add_item(&self.data.items, &grant.item_id, grant.qty)
                .with_context(|| format!("granting {}x {}", grant.qty, grant.item_id))?;
        }
        let levels = if roster.active().is_some() {
            Self::grant_xp(roster, skills, reward.xp)?
        } else {
            0
        };
        if reward.gold > 0 {
            quests.record(&self.data.quests, GameEvent::GoldEarned { amount: reward.gold });
        }
        Ok(levels)
    }

    /// Claim the daily login reward.
    ///
    /// # Errors
    ///
    /// Fails when today was already claimed, the clock went backwards, or the
    /// reward item does not fit.
    pub fn claim_daily(&self, today: GameDay) -> Result<RewardReceipt> {
        let mut daily = self.daily();
        let mut inventory = self.inventory();
        let mut roster = self.roster();
        let mut skills = self.skills();
        let mut quests = self.quests();
        quests.refresh(&self.data.quests, today, account_seed(self.ns.account()));

        let reward = daily.claim(&self.data.rewards, today)?;
        let levels_gained = self.apply_reward(&reward, &mut inventory, &mut roster, &mut skills, &mut quests)?;
        quests.record(&self.data.quests, GameEvent::DailyClaimed);

        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &daily)?;
        batch.stage(&self.ns, &inventory)?;
        batch.stage(&self.ns, &roster)?;
        batch.stage(&self.ns, &skills)?;
        batch.stage(&self.ns, &quests)?;
        self.commit(batch, "daily claim")?;
        log::debug!("{} claimed daily reward, streak {}", self.ns.account(), daily.streak);
        Ok(RewardReceipt { reward, levels_gained })
    }

    /// Roll today's quests if needed. Returns `true` when a new set was
    /// rolled.
    ///
    /// # Errors
    ///
    /// Fails when the quest log cannot be written.
    pub fn refresh_quests(&self, today: GameDay) -> Result<bool> {
        let mut quests = self.quests();
        let rolled = quests.refresh(&self.data.quests, today, account_seed(self.ns.account()));
        if rolled {
            self.save(&quests)?;
        }
        Ok(rolled)
    }

    /// # Errors
    ///
    /// Fails for inactive, incomplete, or already claimed quests.
    pub fn claim_quest(&self, quest_id: &str) -> Result<RewardReceipt> {
        let mut quests = self.quests();
        let mut inventory = self.inventory();
        let mut roster = self.roster();
        let mut skills = self.skills();
        let reward = quests.claim(&self.data.quests, quest_id)?;
        let levels_gained = self.apply_reward(&reward, &mut inventory, &mut roster, &mut skills, &mut quests)?;
        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &quests)?;
        batch.stage(&self.ns, &inventory)?;
        batch.stage(&self.ns, &roster)?;
        batch.stage(&self.ns, &skills)?;
        self.commit(batch, "quest claim")?;
        Ok(RewardReceipt { reward, levels_gained })
    }

    /// Record a finished battle: gold to the purse, XP to the active
    /// character, progress to today's quests, and guild XP for wins.
    ///
    /// # Errors
    ///
    /// Fails with `NoActiveCharacter` when XP is awarded without an active
    /// character.
    pub fn record_battle(&self, won: bool, gold: u64, xp: u64) -> Result<BattleReport> {
        let mut inventory = self.inventory();
        let mut roster = self.roster();
        let mut skills = self.skills();
        let mut quests = self.quests();

        let levels_gained = Self::grant_xp(&mut roster, &mut skills, xp)?;
        inventory.add_gold(gold);
        let outcome = if won { GameEvent::BattleWon } else { GameEvent::BattleLost };
        let mut completed_quests = quests.record(&self.data.quests, outcome);
        if gold > 0 {
            completed_quests.extend(quests.record(&self.data.quests, GameEvent::GoldEarned { amount: gold }));
        }

        let mut guilds = self.guilds();
        let contributed = match self.owner {
            Some(owner) if won && xp > 0 && guilds.guild_of(&owner).is_some() => {
                guilds.contribute(&owner, xp)?;
                true
            }
            _ => false,
        };

        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &inventory)?;
        batch.stage(&self.ns, &roster)?;
        batch.stage(&self.ns, &skills)?;
        batch.stage(&self.ns, &quests)?;
        if contributed {
            batch.stage(&Namespace::global(), &guilds)?;
        }
        self.commit(batch, "battle result")?;
        Ok(BattleReport {
            levels_gained,
            completed_quests,
        })
    }

    /// Submit a score to the device leaderboard under the active
    /// character's name.
    ///
    /// # Errors
    ///
    /// Fails for guests and when the board cannot be written.
    pub fn submit_score(&self, score: u64, today: GameDay) -> Result<Submission> {
        let owner = self.require_owner()?;
        let roster = self.roster();
        let (name, level) = roster
            .active()
            .map_or_else(|| (owner.short(), 1), |c| (c.name.clone(), c.level));
        let mut board = self.leaderboard();
        let outcome = board.submit(LeaderboardEntry {
            address: owner,
            name,
            score,
            level,
            day: today,
        });
        self.save_global(&board)?;
        Ok(outcome)
    }

    /// Effective stats of the active character with gear and skills.
    #[must_use]
    pub fn combat_stats(&self) -> Option<StatBlock> {
        let roster = self.roster();
        let character = roster.active()?;
        let gear = self.equipment().total_stats(&self.data.items);
        let skills = self.skills().total_stats(&self.data.skills);
        Some(character.combat_stats(gear, skills))
    }

    /// # Errors
    ///
    /// Returns `UnknownCharacter` when the token is not in the roster.
    pub fn select_character(&self, token_id: u64) -> Result<()> {
        let mut roster = self.roster();
        roster.select_active(token_id)?;
        self.save(&roster)
    }

    /// Forget every per-account blob. Shared blobs (leaderboard, guilds)
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Fails when the backend rejects a delete; nothing is removed then.
    pub fn reset_account(&self) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.stage_clear::<Inventory>(&self.ns);
        batch.stage_clear::<Loadout>(&self.ns);
        batch.stage_clear::<SkillBook>(&self.ns);
        batch.stage_clear::<Roster>(&self.ns);
        batch.stage_clear::<DailyRewardState>(&self.ns);
        batch.stage_clear::<QuestLog>(&self.ns);
        batch.stage_clear::<FriendList>(&self.ns);
        self.commit(batch, "account reset")?;
        log::info!("reset account {}", self.ns.account());
        Ok(())
    }

    /// Send a friend request. Both accounts live on this device, so the
    /// peer's list receives it directly. Returns `true` when the request
    /// met one from the peer and the two are now friends.
    ///
    /// # Errors
    ///
    /// Fails for guests and under any friend-list rule.
    pub fn send_friend_request(&self, to: Address, today: GameDay) -> Result<bool> {
        let me = self.require_owner()?;
        let peer_ns = Namespace::for_account(&to);
        let mut mine = self.friends();
        let mut theirs = FriendList::load(&self.store, &peer_ns);
        let matched = theirs.outgoing.iter().any(|r| r.peer == me);
        if matched {
            if !mine.incoming.iter().any(|r| r.peer == to) {
                mine.receive_request(&me, to, today)?;
            }
            mine.accept(to, today)?;
            theirs.receive_request(&to, me, today)?;
        } else {
            mine.send_request(&me, to, today)?;
            theirs.receive_request(&to, me, today)?;
        }
        self.commit_friends(&mine, &peer_ns, &theirs)?;
        Ok(matched)
    }

    fn commit_friends(&self, mine: &FriendList, peer_ns: &Namespace, theirs: &FriendList) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, mine)?;
        batch.stage(peer_ns, theirs)?;
        self.commit(batch, "friend lists")
    }

    /// Accept a pending request. The sender's list records the friendship
    /// even if its outgoing entry is gone (for example after a reset).
    ///
    /// # Errors
    ///
    /// Fails for guests, when `from` sent no request, or when either list is
    /// full.
    pub fn accept_friend(&self, from: Address, today: GameDay) -> Result<()> {
        let me = self.require_owner()?;
        let peer_ns = Namespace::for_account(&from);
        let mut mine = self.friends();
        let mut theirs = FriendList::load(&self.store, &peer_ns);
        mine.accept(from, today)?;
        theirs.confirm(&from, me, today)?;
        self.commit_friends(&mine, &peer_ns, &theirs)
    }

    /// Turn down a pending request; the sender's outgoing entry goes too.
    ///
    /// # Errors
    ///
    /// Fails for guests or when `from` sent no request.
    pub fn decline_friend(&self, from: Address) -> Result<()> {
        let me = self.require_owner()?;
        let peer_ns = Namespace::for_account(&from);
        let mut mine = self.friends();
        mine.decline(from)?;
        let mut theirs = FriendList::load(&self.store, &peer_ns);
        if theirs.outgoing.iter().any(|r| r.peer == me) {
            theirs.cancel_request(me)?;
        }
        self.commit_friends(&mine, &peer_ns, &theirs)
    }

    /// Withdraw a request we sent; it disappears from the recipient's inbox.
    ///
    /// # Errors
    ///
    /// Fails for guests or when no request to `to` is pending.
    pub fn cancel_friend_request(&self, to: Address) -> Result<()> {
        let me = self.require_owner()?;
        let peer_ns = Namespace::for_account(&to);
        let mut mine = self.friends();
        mine.cancel_request(to)?;
        let mut theirs = FriendList::load(&self.store, &peer_ns);
        if theirs.incoming.iter().any(|r| r.peer == me) {
            theirs.decline(me)?;
        }
        self.commit_friends(&mine, &peer_ns, &theirs)
    }

    /// Unfriend on both sides.
    ///
    /// # Errors
    ///
    /// Fails for guests or when `peer` is not a friend.
    pub fn remove_friend(&self, peer: Address) -> Result<()> {
        let me = self.require_owner()?;
        let peer_ns = Namespace::for_account(&peer);
        let mut mine = self.friends();
        mine.remove(&peer)?;
        let mut theirs = FriendList::load(&self.store, &peer_ns);
        if theirs.is_friend(&me) {
            theirs.remove(&me)?;
        }
        self.commit_friends(&mine, &peer_ns, &theirs)
    }

    /// # Errors
    ///
    /// Fails for guests and under any guild rule.
    pub fn create_guild(&self, name: &str, tag: &str, today: GameDay) -> Result<u64> {
        let me = self.require_owner()?;
        let mut guilds = self.guilds();
        let id = guilds.create(name, tag, me, today)?;
        self.save_global(&guilds)?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Fails for guests and under any guild rule.
    pub fn join_guild(&self, guild_id: u64, today: GameDay) -> Result<()> {
        let me = self.require_owner()?;
        let mut guilds = self.guilds();
        guilds.join(guild_id, me, today)?;
        self.save_global(&guilds)
    }

    /// # Errors
    ///
    /// Fails for guests and players outside any guild.
    pub fn leave_guild(&self) -> Result<LeaveOutcome> {
        let me = self.require_owner()?;
        let mut guilds = self.guilds();
        let outcome = guilds.leave(&me)?;
        self.save_global(&guilds)?;
        Ok(outcome)
    }

    /// Refresh the roster from the chain. Levels a known character gains
    /// from the chain grant skill points like levels earned in play.
    ///
    /// # Errors
    ///
    /// Fails for guests and on any chain error.
    pub async fn sync_characters<C: ChainClient>(&self, chain: &C) -> Result<SyncSummary> {
        let owner = self.require_owner()?;
        let characters = chain
            .characters_of(owner)
            .await
            .context("reading characters from chain")?;
        let mut roster = self.roster();
        let before: Vec<(u64, u32)> = roster.characters.iter().map(|c| (c.token_id, c.level)).collect();
        let summary = sync_roster(&mut roster, &characters);
        let gained: u32 = before
            .iter()
            .filter_map(|(token_id, level)| roster.get(*token_id).map(|c| c.level.saturating_sub(*level)))
            .sum();

        let mut batch = WriteBatch::new();
        batch.stage(&self.ns, &roster)?;
        if gained > 0 {
            let mut skills = self.skills();
            skills.grant_points(gained * SKILL_POINTS_PER_LEVEL);
            batch.stage(&self.ns, &skills)?;
        }
        self.commit(batch, "synced roster")?;
        Ok(summary)
    }

    /// Mint a character and pull it into the roster.
    ///
    /// # Errors
    ///
    /// Fails for guests, invalid names, and chain errors.
    pub async fn mint_character<C: ChainClient>(
        &self,
        chain: &C,
        name: &str,
        class: CharacterClass,
    ) -> Result<TxHash> {
        let owner = self.require_owner()?;
        let name = validate_name(name)?;
        chain.ensure_chain().await?;
        let tx = chain
            .write(owner, &WriteCall::MintCharacter { name, class })
            .await
            .context("minting character")?;
        self.sync_characters(chain).await?;
        Ok(tx)
    }

    /// Record the active character's level on-chain: one `levelUp` per
    /// level the chain is behind, or a single `levelUp` when it has caught
    /// up. Returns the last transaction.
    ///
    /// # Errors
    ///
    /// Fails without an active character or when the chain rejects a call.
    /// Level-ups mined before a failure stay on-chain and are picked up by
    /// the next sync.
    pub async fn level_up_on_chain<C: ChainClient>(&self, chain: &C) -> Result<TxHash> {
        let owner = self.require_owner()?;
        let (token_id, local_level) = self
            .roster()
            .active()
            .map(|c| (c.token_id, c.level))
            .ok_or(CharacterError::NoActiveCharacter)?;
        let chain_level = chain
            .character(token_id)
            .await
            .with_context(|| format!("reading character #{token_id}"))?
            .level;
        let steps = local_level.saturating_sub(chain_level).max(1);
        let mut last = None;
        for _ in 0..steps {
            let tx = chain
                .write(owner, &WriteCall::LevelUpCharacter { token_id })
                .await
                .with_context(|| format!("levelling character #{token_id}"))?;
            last = Some(tx);
        }
        self.sync_characters(chain).await?;
        last.context("no level-up was sent")
    }

    /// Evolve the active character on-chain.
    ///
    /// # Errors
    ///
    /// Fails without an active character or when the chain rejects the call.
    pub async fn evolve_on_chain<C: ChainClient>(&self, chain: &C) -> Result<TxHash> {
        let owner = self.require_owner()?;
        let token_id = self
            .roster()
            .active()
            .map(|c| c.token_id)
            .ok_or(CharacterError::NoActiveCharacter)?;
        let tx = chain
            .write(owner, &WriteCall::EvolveCharacter { token_id })
            .await
            .with_context(|| format!("evolving character #{token_id}"))?;
        self.sync_characters(chain).await?;
        Ok(tx)
    }

    /// Transfer game tokens and count it toward quests.
    ///
    /// # Errors
    ///
    /// Fails for guests and on chain errors.
    pub async fn send_tokens<C: ChainClient>(&self, chain: &C, to: Address, amount: TokenAmount) -> Result<TxHash> {
        let owner = self.require_owner()?;
        let tx = chain
            .write(owner, &WriteCall::TransferTokens { to, amount })
            .await
            .context("sending tokens")?;
        let mut quests = self.quests();
        quests.record(&self.data.quests, GameEvent::TokensSent);
        self.save(&quests)?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainError, MockChain};
    use crate::character::Character;
    use crate::equipment::EquipmentError;
    use crate::inventory::InventoryError;
    use crate::shop::ShopError;
    use crate::social::SocialError;
    use crate::storage::MemoryStore;
    use crate::storage::tests::{FlakyStore, snapshot};
    use futures::executor::block_on;

    fn player(n: u8) -> Address {
        let mut bytes = [0_u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn data() -> Arc<GameData> {
        Arc::new(GameData::builtin())
    }

    fn with_character(client: &GameClient<MemoryStore>) {
        let mut roster = client.roster();
        roster.upsert(Character::new(1, "Aria", CharacterClass::Warrior));
        client.save(&roster).unwrap();
    }

    #[test]
    fn failed_purchase_saves_nothing() {
        let store = MemoryStore::new();
        let client = GameClient::guest(store.clone(), data());
        let err = client.buy("ember_blade", 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShopError>(),
            Some(ShopError::Inventory(InventoryError::NotEnoughGold { .. }))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn buy_equip_and_stats() {
        let client = GameClient::guest(MemoryStore::new(), data());
        with_character(&client);
        let base = client.combat_stats().unwrap();
        client.buy("iron_sword", 1).unwrap();
        assert_eq!(client.equip("iron_sword").unwrap(), None);
        assert_eq!(client.inventory().count("iron_sword"), 0);
        let geared = client.combat_stats().unwrap();
        assert!(geared.attack > base.attack);
        assert_eq!(client.unequip(EquipmentSlot::Weapon).unwrap(), "iron_sword");
        assert_eq!(client.combat_stats().unwrap(), base);
    }

    #[test]
    fn battles_level_up_and_grant_skill_points() {
        let client = GameClient::guest(MemoryStore::new(), data());
        assert!(client.record_battle(true, 5, 10).is_err());
        with_character(&client);
        let report = client.record_battle(true, 5, 100).unwrap();
        assert_eq!(report.levels_gained, 1);
        assert_eq!(client.skills().unspent, SKILL_POINTS_PER_LEVEL);
        assert_eq!(client.roster().active().unwrap().level, 2);
        assert_eq!(client.inventory().gold, 105);
    }

    #[test]
    fn daily_claim_once_per_day() {
        let client = GameClient::guest(MemoryStore::new(), data());
        let receipt = client.claim_daily(GameDay(10)).unwrap();
        assert!(receipt.reward.gold > 0);
        assert!(client.claim_daily(GameDay(10)).is_err());
        assert_eq!(client.daily().streak, 1);
        assert_eq!(client.quests().day, Some(GameDay(10)));
        client.claim_daily(GameDay(11)).unwrap();
        assert_eq!(client.daily().streak, 2);
    }

    #[test]
    fn guests_cannot_use_account_features() {
        let client = GameClient::guest(MemoryStore::new(), data());
        assert!(client.submit_score(10, GameDay(1)).is_err());
        assert!(client.create_guild("Guests", "GST", GameDay(1)).is_err());
    }

    #[test]
    fn friend_requests_reach_the_peer() {
        let store = MemoryStore::new();
        let alice = GameClient::for_account(store.clone(), data(), player(1));
        let bob = GameClient::for_account(store, data(), player(2));
        assert!(!alice.send_friend_request(player(2), GameDay(1)).unwrap());
        assert_eq!(bob.friends().incoming.len(), 1);
        bob.accept_friend(player(1), GameDay(2)).unwrap();
        assert!(alice.friends().is_friend(&player(2)));
        assert!(bob.friends().is_friend(&player(1)));
        alice.remove_friend(player(2)).unwrap();
        assert!(!bob.friends().is_friend(&player(1)));
    }

    #[test]
    fn scores_land_on_the_shared_board() {
        let store = MemoryStore::new();
        let alice = GameClient::for_account(store.clone(), data(), player(1));
        let bob = GameClient::for_account(store, data(), player(2));
        assert_eq!(alice.submit_score(50, GameDay(1)).unwrap(), Submission::Ranked(1));
        assert_eq!(bob.submit_score(80, GameDay(1)).unwrap(), Submission::Ranked(1));
        assert_eq!(alice.leaderboard().rank_of(&player(1)), Some(2));
    }

    #[test]
    fn guild_wins_contribute_xp() {
        let client = GameClient::for_account(MemoryStore::new(), data(), player(1));
        with_character(&client);
        let id = client.create_guild("Iron Wolves", "IW", GameDay(1)).unwrap();
        client.record_battle(true, 0, 40).unwrap();
        client.record_battle(false, 0, 40).unwrap();
        assert_eq!(client.guilds().get(id).unwrap().xp, 40);
        assert_eq!(client.leave_guild().unwrap(), LeaveOutcome::Disbanded);
    }

    #[test]
    fn mint_and_sync_through_mock_chain() {
        let data = data();
        let chain = MockChain::new(data.chain.clone());
        chain.add_account(player(1), data.chain.mint_price.base_units() * 2, 0);
        let client = GameClient::for_account(MemoryStore::new(), data, player(1));
        block_on(async {
            client
                .mint_character(&chain, "  Aria ", CharacterClass::Mage)
                .await
                .unwrap();
            let roster = client.roster();
            assert_eq!(roster.active().unwrap().name, "Aria");
            client.level_up_on_chain(&chain).await.unwrap();
            assert_eq!(client.roster().active().unwrap().level, 2);
            assert_eq!(client.skills().total_points(), SKILL_POINTS_PER_LEVEL);
            assert!(client.mint_character(&chain, "x", CharacterClass::Mage).await.is_err());
            chain.set_chain_id(999);
            let err = client
                .mint_character(&chain, "Second", CharacterClass::Rogue)
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ChainError>(),
                Some(ChainError::WrongChain { .. })
            ));
        });
    }

    #[test]
    fn reset_clears_only_this_account() {
        let store = MemoryStore::new();
        let client = GameClient::for_account(store.clone(), data(), player(1));
        client.buy("health_potion", 1).unwrap();
        client.submit_score(5, GameDay(1)).unwrap();
        client.reset_account().unwrap();
        assert_eq!(client.inventory(), Inventory::default());
        assert_eq!(client.leaderboard().len(), 1);
    }

    #[test]
    fn chain_level_up_keeps_levels_earned_in_play() {
        let data = data();
        let chain = MockChain::new(data.chain.clone());
        chain.add_account(player(1), data.chain.mint_price.base_units(), 0);
        let client = GameClient::for_account(MemoryStore::new(), data, player(1));
        block_on(async {
            client
                .mint_character(&chain, "Aria", CharacterClass::Warrior)
                .await
                .unwrap();
            client.record_battle(true, 0, 500).unwrap();
            assert_eq!(client.roster().active().unwrap().level, 3);
            assert_eq!(client.skills().total_points(), 2 * SKILL_POINTS_PER_LEVEL);

            client.level_up_on_chain(&chain).await.unwrap();
            assert_eq!(chain.character(1).await.unwrap().level, 3);
            assert_eq!(chain.tx_count(), 3);
            let hero = client.roster().active().cloned().unwrap();
            assert_eq!(hero.level, 3);
            assert_eq!(client.skills().total_points(), (hero.level - 1) * SKILL_POINTS_PER_LEVEL);

            client.level_up_on_chain(&chain).await.unwrap();
            assert_eq!(client.roster().active().unwrap().level, 4);
            assert_eq!(client.skills().total_points(), 3 * SKILL_POINTS_PER_LEVEL);
        });
    }

    #[test]
    fn levels_gained_elsewhere_grant_skill_points_on_sync() {
        let data = data();
        let chain = MockChain::new(data.chain.clone());
        chain.add_account(player(1), data.chain.mint_price.base_units(), 0);
        let client = GameClient::for_account(MemoryStore::new(), data, player(1));
        block_on(async {
            client
                .mint_character(&chain, "Aria", CharacterClass::Mage)
                .await
                .unwrap();
            for _ in 0..2 {
                chain
                    .write(player(1), &WriteCall::LevelUpCharacter { token_id: 1 })
                    .await
                    .unwrap();
            }
            let summary = client.sync_characters(&chain).await.unwrap();
            assert_eq!(summary.updated, 1);
        });
        assert_eq!(client.roster().active().unwrap().level, 3);
        assert_eq!(client.skills().unspent, 2 * SKILL_POINTS_PER_LEVEL);
    }

    #[test]
    fn failed_write_rolls_back_the_whole_daily_claim() {
        let memory = MemoryStore::new();
        let flaky = GameClient::guest(FlakyStore::new(memory.clone(), 2), data());
        assert!(flaky.claim_daily(GameDay(10)).is_err());
        assert!(memory.is_empty());

        let client = GameClient::guest(memory.clone(), data());
        client.claim_daily(GameDay(10)).unwrap();
        let before = snapshot(&memory);
        let gold = client.inventory().gold;

        let flaky = GameClient::guest(FlakyStore::new(memory.clone(), 3), data());
        let err = flaky.claim_daily(GameDay(11)).unwrap_err();
        assert!(format!("{err:#}").contains("quota"));
        assert_eq!(snapshot(&memory), before);
        assert_eq!(client.daily().total_claims, 1);
        assert_eq!(client.inventory().gold, gold);

        client.claim_daily(GameDay(11)).unwrap();
        assert_eq!(client.daily().streak, 2);
    }

    #[test]
    fn failed_guild_write_rolls_back_the_battle() {
        let memory = MemoryStore::new();
        let client = GameClient::for_account(memory.clone(), data(), player(1));
        with_character(&client);
        client.create_guild("Iron Wolves", "IW", GameDay(1)).unwrap();
        let before = snapshot(&memory);

        let flaky = GameClient::for_account(FlakyStore::new(memory.clone(), 5), data(), player(1));
        assert!(flaky.record_battle(true, 10, 40).is_err());
        assert_eq!(snapshot(&memory), before);
    }

    #[test]
    fn failed_equip_saves_nothing() {
        let store = MemoryStore::new();
        let client = GameClient::guest(store.clone(), data());
        with_character(&client);
        client.record_battle(false, 100, 0).unwrap();
        client.buy("hunter_bow", 1).unwrap();
        let before = snapshot(&store);

        let err = client.equip("hunter_bow").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EquipmentError>(),
            Some(EquipmentError::LevelTooLow { required: 3, .. })
        ));
        assert!(client.equip("iron_sword").is_err());
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn corrupt_blob_reads_as_default_until_overwritten() {
        let store = MemoryStore::new();
        let client = GameClient::guest(store.clone(), data());
        let key = client.namespace().key(Inventory::KEY);
        store.set_item(&key, "{\"gold\": \"lots\"").unwrap();
        assert_eq!(client.inventory(), Inventory::default());

        client.buy("health_potion", 1).unwrap();
        assert_eq!(client.inventory().count("health_potion"), 1);
        assert!(store.get_item(&key).unwrap().unwrap().starts_with('{'));
    }

    #[test]
    fn declining_and_cancelling_clear_both_sides() {
        let store = MemoryStore::new();
        let alice = GameClient::for_account(store.clone(), data(), player(1));
        let bob = GameClient::for_account(store, data(), player(2));

        alice.send_friend_request(player(2), GameDay(1)).unwrap();
        bob.decline_friend(player(1)).unwrap();
        assert!(bob.friends().incoming.is_empty());
        assert!(alice.friends().outgoing.is_empty());
        let err = bob.decline_friend(player(1)).unwrap_err();
        assert_eq!(err.downcast_ref::<SocialError>(), Some(&SocialError::NoRequest(player(1))));

        alice.send_friend_request(player(2), GameDay(2)).unwrap();
        alice.cancel_friend_request(player(2)).unwrap();
        assert!(alice.friends().outgoing.is_empty());
        assert!(bob.friends().incoming.is_empty());
        assert!(alice.cancel_friend_request(player(2)).is_err());
    }

    #[test]
    fn accepting_after_the_sender_reset_befriends_both() {
        let store = MemoryStore::new();
        let alice = GameClient::for_account(store.clone(), data(), player(1));
        let bob = GameClient::for_account(store, data(), player(2));
        alice.send_friend_request(player(2), GameDay(1)).unwrap();
        alice.reset_account().unwrap();

        bob.accept_friend(player(1), GameDay(3)).unwrap();
        assert!(bob.friends().is_friend(&player(1)));
        let theirs = alice.friends();
        assert!(theirs.is_friend(&player(2)));
        assert!(theirs.incoming.is_empty());
    }
}
