// The binary in main.rs is a thin terminal front end; everything it drives
// lives here so integration tests and benches can reach it.

pub mod config;
pub mod engine;
pub mod event;
pub mod generator;
pub mod session;
pub mod store;
