//! Battle configuration schema and validation.

pub mod schema;
pub mod validation;

pub use schema::{
    BattleConfig, EnemyConfig, GateConfig, OpeningConfig, SkillConfig, TurnConfig, WatchdogConfig,
};
pub use validation::{ValidationResult, Validator};
