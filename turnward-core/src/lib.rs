//! `Turnward` Core: battle phase model and shared configuration
//!
//! This crate provides the phase enum, the static transition table,
//! the configuration schema and the error types shared between the
//! `turnward` runtime and any host embedding it.

pub mod config;
pub mod error;
pub mod phase;
pub mod transition;

pub use config::BattleConfig;
pub use error::{ConfigError, ExitCode, Result, TurnwardError};
pub use phase::BattlePhase;
pub use transition::{DenialReason, TransitionDenied, apply, can_transition, edges, legal_targets};
