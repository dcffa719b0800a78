//! Core domain + application logic for the Starlight bot.
//!
//! This crate is framework-agnostic. Discord and SQLite live behind ports
//! (traits) implemented in adapter crates.

pub mod audit;
pub mod board;
pub mod config;
pub mod domain;
pub mod errors;
pub mod locks;
pub mod logging;
pub mod messaging;
pub mod review;
pub mod store;
pub mod tickets;

pub use errors::{Error, Refusal, Result};
