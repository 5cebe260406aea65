//! Core of the channel post bot: dialogue state machine, persistence
//! contracts, and the publisher.
//!
//! This crate is framework-agnostic. Telegram lives behind `MessagingPort`,
//! implemented in the adapter crate.

pub mod audit;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod publisher;
pub mod store;

pub use errors::{Error, Result};
