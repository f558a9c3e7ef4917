//! Configuration validation
//!
//! Semantic checks on a deserialized [`BattleConfig`]. Validation
//! collects every issue rather than stopping at the first one.

use std::time::Duration;

use crate::config::schema::BattleConfig;
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &BattleConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_periods(config);
        self.validate_budgets(config);
        self.validate_watchdog_coverage(config);
        self.validate_opening(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Periods
    // ========================================================================

    /// Tick and poll periods drive `tokio::time::interval`, which panics on
    /// a zero period.
    fn validate_periods(&mut self, config: &BattleConfig) {
        if config.watchdog.tick_interval.is_zero() {
            self.add_error("watchdog.tick_interval", "Tick interval must be greater than zero");
        }
        if config.turn.poll_interval.is_zero() {
            self.add_error("turn.poll_interval", "Poll interval must be greater than zero");
        }

        if config.turn.poll_interval > Duration::from_millis(250) {
            self.add_warning(
                "turn.poll_interval",
                "Poll interval above 250ms delays every busy-predicate wait",
            );
        }
        if config.watchdog.tick_interval > Duration::from_secs(1) {
            self.add_warning(
                "watchdog.tick_interval",
                "Tick interval above 1s makes every recovery late by up to one tick",
            );
        }
    }

    // ========================================================================
    // Budgets
    // ========================================================================

    fn validate_budgets(&mut self, config: &BattleConfig) {
        let budgets = [
            ("watchdog.user_operation", config.watchdog.user_operation),
            ("watchdog.turn_transition", config.watchdog.turn_transition),
            ("watchdog.enemy_attack", config.watchdog.enemy_attack),
            (
                "watchdog.puzzle_matching_idle",
                config.watchdog.puzzle_matching_idle,
            ),
            ("enemy.damage_wait_timeout", config.enemy.damage_wait_timeout),
            ("enemy.attack_timeout", config.enemy.attack_timeout),
            ("enemy.drop_action_timeout", config.enemy.drop_action_timeout),
            (
                "skill.followup_base_timeout",
                config.skill.followup_base_timeout,
            ),
            ("skill.setter_base_timeout", config.skill.setter_base_timeout),
            (
                "skill.after_process_timeout",
                config.skill.after_process_timeout,
            ),
        ];

        for (path, budget) in budgets {
            if budget.is_zero() {
                self.add_error(path, "Budget must be greater than zero");
            }
        }

        if config.watchdog.tick_interval >= config.watchdog.puzzle_matching_idle
            && !config.watchdog.puzzle_matching_idle.is_zero()
        {
            self.add_warning(
                "watchdog.puzzle_matching_idle",
                "Idle guard is not longer than one watchdog tick",
            );
        }
    }

    // ========================================================================
    // Watchdog coverage
    // ========================================================================

    /// The turn-transition watchdog measures time between progress marks,
    /// so a single step that waits longer than its budget is recovered
    /// while still healthy.
    fn validate_watchdog_coverage(&mut self, config: &BattleConfig) {
        let budget = config.watchdog.turn_transition;
        let steps = [
            ("turn.post_player_attack_settle", config.turn.post_player_attack_settle),
            ("turn.pre_enemy_settle", config.turn.pre_enemy_settle),
            ("turn.post_enemy_settle", config.turn.post_enemy_settle),
            ("enemy.pre_attack_delay", config.enemy.pre_attack_delay),
            ("enemy.attack_timeout", config.enemy.attack_timeout),
            ("enemy.damage_wait_timeout", config.enemy.damage_wait_timeout),
            ("skill.pre_enemy_delay", config.skill.pre_enemy_delay),
        ];

        for (path, wait) in steps {
            if wait > budget {
                self.add_warning(
                    path,
                    &format!(
                        "Step can wait {} which exceeds watchdog.turn_transition ({})",
                        humantime::format_duration(wait),
                        humantime::format_duration(budget),
                    ),
                );
            }
        }

        let enemy_worst = config.enemy.pre_attack_delay + config.enemy.attack_timeout;
        if enemy_worst > config.watchdog.enemy_attack {
            self.add_warning(
                "watchdog.enemy_attack",
                "EnemyAttack budget is shorter than the pre-attack delay plus attack timeout",
            );
        }
    }

    // ========================================================================
    // Opening
    // ========================================================================

    fn validate_opening(&mut self, config: &BattleConfig) {
        if config.opening.battle_count == 0 {
            self.add_error("opening.battle_count", "Battle count starts at 1");
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
