//! Etherealm browser bindings
//!
//! Supplies the browser halves of the core seams: `localStorage` behind
//! [`etherealm_game::KeyValueStore`], the injected `window.ethereum` provider
//! behind [`etherealm_game::ChainClient`], and Yew hooks that keep components
//! in step with stored blobs and contract calls.
#![forbid(unsafe_code)]
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod clock;
pub mod dom;
pub mod hooks;
pub mod storage;
pub mod wallet;

pub use etherealm_game as game;
pub use storage::{LocalStore, WebStorageError};
pub use wallet::Eip1193Client;

/// Log level for the browser console; verbose in debug builds.
#[must_use]
pub const fn console_level() -> log::Level {
    if cfg!(debug_assertions) {
        log::Level::Debug
    } else {
        log::Level::Info
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // A second init (hot reload) keeps the first logger.
    let _ = console_log::init_with_level(console_level());
    log::info!("etherealm web bindings ready");
}
