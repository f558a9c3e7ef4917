//! `Turnward` - turn orchestration runtime for phase-driven puzzle battles
//!
//! This library owns the battle phase, admits or rejects player
//! operations, sequences each turn across the injected collaborators, and
//! recovers from stuck phases with watchdogs.

pub mod battle;
pub mod cli;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod observability;
pub mod sim;

pub use battle::{BattleEvent, BattleHandle, BattleOrchestrator};
pub use turnward_core::{BattleConfig, BattlePhase, TurnwardError};
