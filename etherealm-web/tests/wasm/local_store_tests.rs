use etherealm_game::{GameClient, GameData, Inventory, KeyValueStore, Namespace, StoredBlob};
use etherealm_web::{LocalStore, clock, dom};
use std::sync::Arc;
use wasm_bindgen_test::*;

fn fresh_store(prefix: &str) -> LocalStore {
    let store = LocalStore::new().expect("localStorage");
    for key in store.keys_with_prefix(prefix).expect("keys") {
        store.remove_item(&key).expect("remove");
    }
    store
}

#[wasm_bindgen_test]
fn dom_helpers_find_the_browser() {
    assert!(dom::window().is_some());
    assert!(dom::local_storage().is_ok());
}

#[wasm_bindgen_test]
fn local_store_round_trips_raw_values() {
    let store = fresh_store("etherealm.test.");
    assert_eq!(store.get_item("etherealm.test.a").unwrap(), None);
    store.set_item("etherealm.test.a", "{\"x\":1}").unwrap();
    assert_eq!(
        store.get_item("etherealm.test.a").unwrap().as_deref(),
        Some("{\"x\":1}")
    );
    assert_eq!(
        store.keys_with_prefix("etherealm.test.").unwrap(),
        vec!["etherealm.test.a".to_string()]
    );
    store.remove_item("etherealm.test.a").unwrap();
    assert_eq!(store.get_item("etherealm.test.a").unwrap(), None);
}

#[wasm_bindgen_test]
fn game_client_persists_into_local_storage() {
    let store = fresh_store("etherealm.guest.");
    let client = GameClient::guest(store.clone(), Arc::new(GameData::builtin()));
    client.buy("health_potion", 2).unwrap();
    client.claim_daily(clock::today()).unwrap();

    let reloaded = Inventory::load(&store, &Namespace::guest());
    assert_eq!(reloaded.count("health_potion"), 2);
    assert!(
        store
            .get_item(&Namespace::guest().key("daily"))
            .unwrap()
            .is_some()
    );
}
