#![cfg(target_arch = "wasm32")]

mod local_store_tests;
mod wallet_tests;

wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);
