//! # ClaimGuard Common Library
//!
//! Shared code for the ClaimGuard client crates:
//! - Common error type
//! - Layered configuration loading (CLI → ENV → TOML → defaults)
//! - Event types and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{ClaimEvent, EventBus};
