//! Engine Duel - a head-to-head tournament runner for UCI chess engines.
//!
//! Plays a configurable number of games between two engine executables with
//! a fixed per-move time budget, alternating colors every game, and
//! aggregates the outcomes into a score plus a persisted JSON record.
//!
//! # Modules
//!
//! - [`engine`] - process handle and UCI transport for one engine
//! - [`game`] - runs a single game between two handles
//! - [`tournament`] - game scheduling, color alternation, result aggregation
//! - [`report`] - console output and JSON persistence
//! - [`config`] - optional `duel.toml` configuration

pub mod config;
pub mod engine;
pub mod game;
pub mod report;
pub mod tournament;
