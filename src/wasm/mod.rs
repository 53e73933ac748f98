//! WASM module: wallet bootstrap for the game page
//!
//! Two engines sit behind the same [`WalletBootstrap`](crate::WalletBootstrap):
//! - near-api-js, imported from the CDN on first use (what the page ships with)
//! - the Rust-native library over `fetch()` + `localStorage`
//!
//! Exports for page scripts:
//! - `initContract()`, `signIn()`, `startGame()` - page-wide bootstrap, mirrors
//!   the handle to `window.walletConnection`
//! - `NearLink` - explicit instance with an injected config

mod exports;
mod fetch;
mod js;
mod near_api;
pub(crate) mod storage;

pub use exports::{init_contract, sign_in, start_game, NearLink};
pub use fetch::FetchTransport;
pub use near_api::{NearApiJs, NearApiJsLoader};
pub use storage::{LocalStorage, LocationRedirect};

use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

macro_rules! log {
    ($($t:tt)*) => {
        crate::wasm::console_log(&format!($($t)*))
    }
}

pub(crate) use log;
