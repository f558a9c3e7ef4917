//! Configuration schema types
//!
//! Every duration the runtime waits on lives here. Durations are written
//! as human strings (`"1s"`, `"1500ms"`, `"2s 500ms"`) and every field
//! defaults to the reference timing, so an empty document is a complete
//! configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for one battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BattleConfig {
    /// Admission control windows
    pub gate: GateConfig,

    /// Watchdog tick and budgets
    pub watchdog: WatchdogConfig,

    /// Turn sequence settle delays
    pub turn: TurnConfig,

    /// Enemy-attack resolution timings
    pub enemy: EnemyConfig,

    /// Skill follow-up timings
    pub skill: SkillConfig,

    /// Battle opening sequence
    pub opening: OpeningConfig,
}

// ============================================================================
// Operation Gate
// ============================================================================

/// Admission control windows.
///
/// The two windows are independent; after a turn both may be active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Minimum spacing between two accepted user operations
    #[serde(with = "humantime_serde")]
    pub duplicate_window: Duration,

    /// Input cooldown started at the end of every turn
    #[serde(with = "humantime_serde")]
    pub input_cooldown: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            duplicate_window: Duration::from_secs(1),
            input_cooldown: Duration::from_secs(1),
        }
    }
}

// ============================================================================
// Watchdogs
// ============================================================================

/// Watchdog tick and per-watchdog budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
    /// Period of the watchdog tick
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Budget for a user operation left in flight
    #[serde(with = "humantime_serde")]
    pub user_operation: Duration,

    /// Budget between two progress marks of a running turn
    #[serde(with = "humantime_serde")]
    pub turn_transition: Duration,

    /// Budget for a single stay in `EnemyAttack`
    #[serde(with = "humantime_serde")]
    pub enemy_attack: Duration,

    /// Budget for `PuzzleMatching` entered on an idle, full grid
    #[serde(with = "humantime_serde")]
    pub puzzle_matching_idle: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            user_operation: Duration::from_secs(10),
            turn_transition: Duration::from_secs(5),
            enemy_attack: Duration::from_secs(10),
            puzzle_matching_idle: Duration::from_millis(500),
        }
    }
}

// ============================================================================
// Turn Sequence
// ============================================================================

/// Fixed delays of the turn sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TurnConfig {
    /// Settle after the player attack completes
    #[serde(with = "humantime_serde")]
    pub post_player_attack_settle: Duration,

    /// Settle after the pending-skill detour
    #[serde(with = "humantime_serde")]
    pub post_skill_settle: Duration,

    /// Delay before entering `EnemyAttack`
    #[serde(with = "humantime_serde")]
    pub pre_enemy_settle: Duration,

    /// Delay after enemy resolution before input is released
    #[serde(with = "humantime_serde")]
    pub post_enemy_settle: Duration,

    /// Period used when polling collaborator busy predicates
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            post_player_attack_settle: Duration::from_millis(1500),
            post_skill_settle: Duration::from_millis(500),
            pre_enemy_settle: Duration::from_secs(2),
            post_enemy_settle: Duration::from_secs(2),
            poll_interval: Duration::from_millis(16),
        }
    }
}

// ============================================================================
// Enemy Resolution
// ============================================================================

/// Enemy-attack resolution timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnemyConfig {
    /// Gap between two enemy animations
    #[serde(with = "humantime_serde")]
    pub between_animations: Duration,

    /// Bound on waiting for the damage animation
    #[serde(with = "humantime_serde")]
    pub damage_wait_timeout: Duration,

    /// Settle after the damage animation
    #[serde(with = "humantime_serde")]
    pub damage_settle: Duration,

    /// Delay before the attack action fires
    #[serde(with = "humantime_serde")]
    pub pre_attack_delay: Duration,

    /// Bound on waiting for the attack to complete
    #[serde(with = "humantime_serde")]
    pub attack_timeout: Duration,

    /// Bound on waiting for each drop action
    #[serde(with = "humantime_serde")]
    pub drop_action_timeout: Duration,

    /// Gap between two drop actions
    #[serde(with = "humantime_serde")]
    pub drop_action_interval: Duration,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            between_animations: Duration::from_millis(500),
            damage_wait_timeout: Duration::from_secs(3),
            damage_settle: Duration::from_millis(200),
            pre_attack_delay: Duration::from_secs(2),
            attack_timeout: Duration::from_secs(5),
            drop_action_timeout: Duration::from_secs(2),
            drop_action_interval: Duration::from_millis(500),
        }
    }
}

// ============================================================================
// Skill Follow-up
// ============================================================================

/// Skill resolution coordinator timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkillConfig {
    /// Base wait for the board to settle after a skill animation.
    /// The follow-up waits twice this long.
    #[serde(with = "humantime_serde")]
    pub followup_base_timeout: Duration,

    /// Base wait used when the follow-up is started through the setter
    #[serde(with = "humantime_serde")]
    pub setter_base_timeout: Duration,

    /// Settle once the board is idle
    #[serde(with = "humantime_serde")]
    pub followup_settle: Duration,

    /// Bound on the after-process idle poll
    #[serde(with = "humantime_serde")]
    pub after_process_timeout: Duration,

    /// Settle after the after-process poll
    #[serde(with = "humantime_serde")]
    pub after_process_settle: Duration,

    /// Delay between entering `EnemyAttack` and running enemy resolution
    #[serde(with = "humantime_serde")]
    pub pre_enemy_delay: Duration,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            followup_base_timeout: Duration::from_secs(3),
            setter_base_timeout: Duration::from_secs(5),
            followup_settle: Duration::from_secs(2),
            after_process_timeout: Duration::from_secs(5),
            after_process_settle: Duration::from_millis(500),
            pre_enemy_delay: Duration::from_secs(2),
        }
    }
}

// ============================================================================
// Opening Sequence
// ============================================================================

/// Battle opening sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpeningConfig {
    /// Delay after the fade-out
    #[serde(with = "humantime_serde")]
    pub after_fade: Duration,

    /// Delay after the start banner
    #[serde(with = "humantime_serde")]
    pub after_start_text: Duration,

    /// Gap between spawn animations
    #[serde(with = "humantime_serde")]
    pub between_animations: Duration,

    /// Settle after the enemies spawn
    #[serde(with = "humantime_serde")]
    pub enemy_spawn_settle: Duration,

    /// Run the enemy's initial skill before the first turn
    pub enemy_initial_skill: bool,

    /// Lead time before the initial skill
    #[serde(with = "humantime_serde")]
    pub initial_skill_lead: Duration,

    /// Battle number shown on the start banner
    pub battle_count: u32,
}

impl Default for OpeningConfig {
    fn default() -> Self {
        Self {
            after_fade: Duration::from_secs(1),
            after_start_text: Duration::from_millis(300),
            between_animations: Duration::from_millis(500),
            enemy_spawn_settle: Duration::from_millis(100),
            enemy_initial_skill: true,
            initial_skill_lead: Duration::from_millis(500),
            battle_count: 1,
        }
    }
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: BattleConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, BattleConfig::default());
        assert_eq!(config.gate.duplicate_window, Duration::from_secs(1));
        assert_eq!(config.watchdog.enemy_attack, Duration::from_secs(10));
        assert_eq!(config.opening.battle_count, 1);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let yaml = "turn:\n  pre_enemy_settle: 750ms\n";
        let config: BattleConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.turn.pre_enemy_settle, Duration::from_millis(750));
        assert_eq!(config.turn.post_enemy_settle, Duration::from_secs(2));
    }

    #[test]
    fn compound_durations_parse() {
        let yaml = "skill:\n  followup_base_timeout: 2s 500ms\n";
        let config: BattleConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.skill.followup_base_timeout,
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn bad_duration_is_rejected() {
        let yaml = "gate:\n  input_cooldown: soon\n";
        assert!(serde_yaml::from_str::<BattleConfig>(yaml).is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "gate:\n  cooldown: 1s\n";
        assert!(serde_yaml::from_str::<BattleConfig>(yaml).is_err());
    }

    #[test]
    fn serializes_durations_as_strings() {
        let yaml = serde_yaml::to_string(&BattleConfig::default()).unwrap();
        assert!(yaml.contains("post_player_attack_settle: 1s 500ms"));
        let back: BattleConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, BattleConfig::default());
    }
}
