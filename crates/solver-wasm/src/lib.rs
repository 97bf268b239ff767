//! WebAssembly bindings for the share solver.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Loading a subscription and a get-work payload
//! - Searching for a share in caller-sized batches
//! - Reading statistics and the submission parameters
//! - Routing `log` output to the browser console

use wasm_bindgen::prelude::*;

pub mod logger;
pub mod miner;
pub mod state;

// Re-export main types for JS access
pub use miner::Miner;

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
