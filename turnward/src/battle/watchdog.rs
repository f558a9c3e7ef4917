//! Watchdog set.
//!
//! Each watchdog watches a start marker supplied on every tick. It fires
//! once when the elapsed time since the marker exceeds its budget, then
//! stays disarmed until the marker moves or the monitored condition goes
//! away. The recovery actions themselves live on the orchestrator.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use turnward_core::config::WatchdogConfig;

/// The configured watchdogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogKind {
    /// A user operation left in flight.
    UserOperation,
    /// A turn sequence that stopped making progress.
    TurnTransition,
    /// A single stay in `EnemyAttack`.
    EnemyAttack,
    /// A one-shot phase timeout, such as the puzzle-matching idle guard.
    PhaseTimeout,
}

impl WatchdogKind {
    /// Stable label for logs, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserOperation => "user_operation",
            Self::TurnTransition => "turn_transition",
            Self::EnemyAttack => "enemy_attack",
            Self::PhaseTimeout => "phase_timeout",
        }
    }
}

impl std::fmt::Display for WatchdogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct WatchdogEntry {
    budget: Duration,
    fired_for: Option<Instant>,
    fire_count: u64,
}

impl WatchdogEntry {
    const fn new(budget: Duration) -> Self {
        Self {
            budget,
            fired_for: None,
            fire_count: 0,
        }
    }
}

/// Budgets and arm state for every watchdog.
///
/// Entries sit in a `DashMap` so the tick task, one-shot phase timeouts
/// and status readers never contend on a single lock.
#[derive(Debug)]
pub struct WatchdogSet {
    entries: DashMap<WatchdogKind, WatchdogEntry>,
}

impl WatchdogSet {
    /// Creates the set from configured budgets.
    #[must_use]
    pub fn new(config: &WatchdogConfig) -> Self {
        let entries = DashMap::new();
        entries.insert(
            WatchdogKind::UserOperation,
            WatchdogEntry::new(config.user_operation),
        );
        entries.insert(
            WatchdogKind::TurnTransition,
            WatchdogEntry::new(config.turn_transition),
        );
        entries.insert(
            WatchdogKind::EnemyAttack,
            WatchdogEntry::new(config.enemy_attack),
        );
        entries.insert(
            WatchdogKind::PhaseTimeout,
            WatchdogEntry::new(config.puzzle_matching_idle),
        );
        Self { entries }
    }

    /// Evaluates one watchdog.
    ///
    /// `since` is the start marker of the monitored condition, `None`
    /// while the condition is false. Returns `true` exactly once per
    /// marker, when `now - since` exceeds the budget.
    pub fn check(&self, kind: WatchdogKind, since: Option<Instant>, now: Instant) -> bool {
        let Some(mut entry) = self.entries.get_mut(&kind) else {
            return false;
        };

        let Some(since) = since else {
            entry.fired_for = None;
            return false;
        };

        if entry.fired_for == Some(since) {
            return false;
        }
        if now.saturating_duration_since(since) <= entry.budget {
            return false;
        }

        entry.fired_for = Some(since);
        entry.fire_count += 1;
        true
    }

    /// Counts a recovery fired outside [`check`](Self::check).
    pub fn record_fire(&self, kind: WatchdogKind) {
        if let Some(mut entry) = self.entries.get_mut(&kind) {
            entry.fire_count += 1;
        }
    }

    /// Number of times `kind` has fired.
    #[must_use]
    pub fn fire_count(&self, kind: WatchdogKind) -> u64 {
        self.entries.get(&kind).map_or(0, |e| e.fire_count)
    }

    /// Configured budget of `kind`.
    #[must_use]
    pub fn budget(&self, kind: WatchdogKind) -> Duration {
        self.entries.get(&kind).map_or(Duration::ZERO, |e| e.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> WatchdogSet {
        WatchdogSet::new(&WatchdogConfig::default())
    }

    #[test]
    fn does_not_fire_at_exact_budget() {
        let set = set();
        let start = Instant::now();
        let at_budget = start + Duration::from_secs(10);
        assert!(!set.check(WatchdogKind::EnemyAttack, Some(start), at_budget));
        assert!(set.check(
            WatchdogKind::EnemyAttack,
            Some(start),
            at_budget + Duration::from_millis(100)
        ));
    }

    #[test]
    fn fires_once_per_marker() {
        let set = set();
        let start = Instant::now();
        let late = start + Duration::from_secs(11);
        assert!(set.check(WatchdogKind::EnemyAttack, Some(start), late));
        assert!(!set.check(WatchdogKind::EnemyAttack, Some(start), late));
        assert!(!set.check(
            WatchdogKind::EnemyAttack,
            Some(start),
            late + Duration::from_secs(30)
        ));
        assert_eq!(set.fire_count(WatchdogKind::EnemyAttack), 1);
    }

    #[test]
    fn rearms_when_condition_clears() {
        let set = set();
        let start = Instant::now();
        let late = start + Duration::from_secs(11);
        assert!(set.check(WatchdogKind::EnemyAttack, Some(start), late));
        assert!(!set.check(WatchdogKind::EnemyAttack, None, late));
        assert!(set.check(WatchdogKind::EnemyAttack, Some(start), late));
        assert_eq!(set.fire_count(WatchdogKind::EnemyAttack), 2);
    }

    #[test]
    fn rearms_when_marker_moves() {
        let set = set();
        let start = Instant::now();
        assert!(set.check(
            WatchdogKind::TurnTransition,
            Some(start),
            start + Duration::from_secs(6)
        ));
        let progressed = start + Duration::from_secs(6);
        assert!(!set.check(
            WatchdogKind::TurnTransition,
            Some(progressed),
            progressed + Duration::from_secs(1)
        ));
        assert!(set.check(
            WatchdogKind::TurnTransition,
            Some(progressed),
            progressed + Duration::from_secs(6)
        ));
    }

    #[test]
    fn watchdogs_are_independent() {
        let set = set();
        let start = Instant::now();
        let now = start + Duration::from_secs(6);
        assert!(set.check(WatchdogKind::TurnTransition, Some(start), now));
        assert!(!set.check(WatchdogKind::UserOperation, Some(start), now));
        assert_eq!(set.budget(WatchdogKind::UserOperation), Duration::from_secs(10));
    }
}
