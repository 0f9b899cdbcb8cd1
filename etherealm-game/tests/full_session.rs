use std::sync::Arc;

use etherealm_game::{
    Address, CharacterClass, ChainClient, EquipmentSlot, GameClient, GameData, GameDay, MemoryStore,
    MockChain, ReadCall, ReadResult, Submission, TokenAmount, constants::DAILY_QUEST_COUNT,
};
use futures::executor::block_on;

fn wallet(n: u8) -> Address {
    format!("0x{:040x}", n).parse().unwrap()
}

fn setup() -> (MemoryStore, Arc<GameData>, MockChain) {
    let data = Arc::new(GameData::builtin());
    let chain = MockChain::new(data.chain.clone());
    let price = data.chain.mint_price.base_units();
    chain.add_account(wallet(1), price * 3, 1_000);
    chain.add_account(wallet(2), price * 3, 0);
    (MemoryStore::new(), data, chain)
}

#[test]
fn week_of_play_for_a_connected_wallet() {
    let (store, data, chain) = setup();
    let client = GameClient::for_account(store.clone(), Arc::clone(&data), wallet(1));
    let start = GameDay(20_000);

    block_on(async {
        assert_eq!(chain.accounts().await.unwrap(), vec![wallet(1), wallet(2)]);
        client
            .mint_character(&chain, "Aria", CharacterClass::Warrior)
            .await
            .unwrap();
    });
    assert_eq!(client.roster().characters.len(), 1);

    let mut day = start;
    for _ in 0..7 {
        client.refresh_quests(day).unwrap();
        assert_eq!(client.quests().active.len(), DAILY_QUEST_COUNT);
        client.claim_daily(day).unwrap();
        for won in [true, true, false, true, true] {
            client.record_battle(won, 30, 60).unwrap();
        }
        let claimable: Vec<String> = client
            .quests()
            .claimable(&data.quests)
            .into_iter()
            .map(str::to_string)
            .collect();
        for id in claimable {
            client.claim_quest(&id).unwrap();
        }
        day = day.next();
    }

    let daily = client.daily();
    assert_eq!(daily.streak, 7);
    assert_eq!(daily.total_claims, 7);
    let hero = client.roster().active().cloned().unwrap();
    assert!(hero.level > 1, "a week of battles should level up");
    let book = client.skills();
    assert!(book.unspent >= hero.level - 1);

    client.allocate_skill("toughness").unwrap();
    client.allocate_skill("power_strike").unwrap();
    assert_eq!(client.skills().rank("toughness"), 1);

    client.buy("iron_sword", 1).unwrap();
    client.buy("leather_cap", 1).unwrap();
    client.equip("iron_sword").unwrap();
    client.equip("leather_cap").unwrap();
    let stats = client.combat_stats().unwrap();
    assert!(stats.attack > CharacterClass::Warrior.base_stats().attack);
    assert_eq!(client.equipment().equipped(EquipmentSlot::Head), Some("leather_cap"));

    let score = u64::try_from(stats.power()).unwrap();
    assert_eq!(client.submit_score(score, day).unwrap(), Submission::Ranked(1));
}

#[test]
fn missing_a_day_resets_the_streak() {
    let (store, data, _) = setup();
    let client = GameClient::for_account(store, data, wallet(1));
    client.claim_daily(GameDay(100)).unwrap();
    client.claim_daily(GameDay(101)).unwrap();
    client.claim_daily(GameDay(103)).unwrap();
    let daily = client.daily();
    assert_eq!(daily.streak, 1);
    assert_eq!(daily.best_streak, 2);
    assert!(client.claim_daily(GameDay(102)).is_err());
}

#[test]
fn accounts_on_one_device_stay_separate() {
    let (store, data, _) = setup();
    let guest = GameClient::guest(store.clone(), Arc::clone(&data));
    let alice = GameClient::for_account(store.clone(), Arc::clone(&data), wallet(1));
    guest.buy("health_potion", 2).unwrap();
    assert_eq!(guest.inventory().count("health_potion"), 2);
    assert_eq!(alice.inventory().count("health_potion"), 0);
    assert!(
        store
            .keys()
            .iter()
            .all(|k| k.starts_with("etherealm.guest."))
    );
}

#[test]
fn corrupted_blobs_fall_back_to_defaults() {
    use etherealm_game::KeyValueStore;

    let (store, data, _) = setup();
    let client = GameClient::for_account(store.clone(), data, wallet(1));
    client.buy("health_potion", 1).unwrap();
    let key = client.namespace().key("inventory");
    store.set_item(&key, "{\"stacks\": 12").unwrap();
    assert_eq!(client.inventory().count("health_potion"), 0);
    client.buy("health_potion", 1).unwrap();
    assert_eq!(client.inventory().count("health_potion"), 1);
}

#[test]
fn friends_guilds_and_tokens_between_two_wallets() {
    let (store, data, chain) = setup();
    let alice = GameClient::for_account(store.clone(), Arc::clone(&data), wallet(1));
    let bob = GameClient::for_account(store, Arc::clone(&data), wallet(2));
    let day = GameDay(500);

    alice.send_friend_request(wallet(2), day).unwrap();
    assert!(bob.send_friend_request(wallet(1), day).unwrap());
    assert!(alice.friends().is_friend(&wallet(2)));

    let guild = alice.create_guild("Moonlit Order", "MOON", day).unwrap();
    bob.join_guild(guild, day).unwrap();
    assert_eq!(bob.guilds().guild_of(&wallet(2)).map(|g| g.id), Some(guild));

    block_on(async {
        alice
            .send_tokens(&chain, wallet(2), TokenAmount::from_base_units(250))
            .await
            .unwrap();
        let balance = chain
            .read(&ReadCall::TokenBalance { owner: wallet(2) })
            .await
            .unwrap();
        assert_eq!(
            balance,
            ReadResult::Balance {
                amount: TokenAmount::from_base_units(250)
            }
        );
    });
    assert_eq!(chain.token_balance(&wallet(1)), 750);
}
