use wasm_bindgen::prelude::*;

pub mod board;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod game;
pub mod moves;
pub mod piece;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod types;
pub mod wasm;

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}
