//! Bough Replay - runs one bookmark sync session from files on disk.
//!
//! The store starts from a JSON snapshot, the incoming records come from a
//! JSON array in the remote wire format, and the resulting store is written
//! back as a snapshot. Useful for reproducing a sync from captured data.

pub mod config;
pub mod error;
pub mod runner;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use runner::{replay, run, ReplaySummary};
