//! Domain types and rules shared across the Mesa backend crates.

pub mod assets;
pub mod error;
pub mod job;
pub mod status;
pub mod storage;
pub mod types;
