//! Operation gate.
//!
//! Admission control for user operations and the at-most-one-turn guard.
//! The gate is plain data; the orchestrator keeps it behind a mutex and
//! passes in the current time and phase.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use turnward_core::BattlePhase;

/// Why a user operation was not admitted.
///
/// Variants are listed in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another system owns the battle.
    Takeover,
    /// The post-turn input cooldown is running.
    InputCooldown,
    /// The board is still settling after a skill.
    SkillFollowup,
    /// Operations are only taken in `BattleInProgress`.
    WrongPhase(BattlePhase),
    /// Too soon after the last accepted operation.
    Duplicate,
    /// An operation or a turn is already in flight.
    InFlight,
}

impl RejectReason {
    /// Stable label for logs, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Takeover => "takeover",
            Self::InputCooldown => "input_cooldown",
            Self::SkillFollowup => "skill_followup",
            Self::WrongPhase(_) => "wrong_phase",
            Self::Duplicate => "duplicate",
            Self::InFlight => "in_flight",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongPhase(phase) => write!(f, "wrong_phase ({phase})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Admission decision for a user operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The operation is now in flight.
    Accepted,
    /// The operation was ignored.
    Rejected(RejectReason),
}

impl Admission {
    /// Whether the operation was accepted.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Operation gate state.
#[derive(Debug)]
pub struct OperationGate {
    duplicate_window: Duration,
    last_operation_at: Option<Instant>,
    cooldown_until: Option<Instant>,
    user_operation_since: Option<Instant>,
    turn_since: Option<Instant>,
    skill_followup: bool,
}

/// Point-in-time copy of the gate flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateSnapshot {
    /// Input cooldown running.
    pub input_cooldown: bool,
    /// A user operation is in flight.
    pub user_operation_in_flight: bool,
    /// A turn sequence is in flight.
    pub turn_transition_in_flight: bool,
    /// Skill follow-up matching active.
    pub skill_followup: bool,
}

impl OperationGate {
    /// Creates an idle gate.
    #[must_use]
    pub const fn new(duplicate_window: Duration) -> Self {
        Self {
            duplicate_window,
            last_operation_at: None,
            cooldown_until: None,
            user_operation_since: None,
            turn_since: None,
            skill_followup: false,
        }
    }

    /// Decides whether a user operation is admitted.
    ///
    /// On acceptance the operation is recorded as in flight.
    pub fn try_accept_user_operation(
        &mut self,
        now: Instant,
        phase: BattlePhase,
        takeover: bool,
    ) -> Admission {
        if takeover {
            return Admission::Rejected(RejectReason::Takeover);
        }
        if self.is_input_cooldown(now) {
            return Admission::Rejected(RejectReason::InputCooldown);
        }
        if self.skill_followup {
            return Admission::Rejected(RejectReason::SkillFollowup);
        }
        if phase != BattlePhase::BattleInProgress {
            return Admission::Rejected(RejectReason::WrongPhase(phase));
        }
        if self
            .last_operation_at
            .is_some_and(|last| now.saturating_duration_since(last) < self.duplicate_window)
        {
            return Admission::Rejected(RejectReason::Duplicate);
        }
        if self.user_operation_since.is_some() || self.turn_since.is_some() {
            return Admission::Rejected(RejectReason::InFlight);
        }

        self.last_operation_at = Some(now);
        self.user_operation_since = Some(now);
        Admission::Accepted
    }

    /// Marks a turn sequence as in flight.
    ///
    /// Returns `false` if one already is.
    pub fn begin_turn_transition(&mut self, now: Instant) -> bool {
        if self.turn_since.is_some() {
            return false;
        }
        self.turn_since = Some(now);
        true
    }

    /// Clears the turn-in-flight flag. Idempotent.
    pub const fn end_turn_transition(&mut self) {
        self.turn_since = None;
    }

    /// Clears the user-operation-in-flight flag. Idempotent.
    pub const fn end_user_operation(&mut self) {
        self.user_operation_since = None;
    }

    /// Records that the running turn made progress.
    ///
    /// Both in-flight markers move to `now`, so their watchdogs measure
    /// time since the last step rather than since the turn began.
    pub const fn mark_turn_progress(&mut self, now: Instant) {
        if self.turn_since.is_some() {
            self.turn_since = Some(now);
        }
        if self.user_operation_since.is_some() {
            self.user_operation_since = Some(now);
        }
    }

    /// Starts the input cooldown, ending `duration` from `now`.
    pub fn begin_input_cooldown(&mut self, now: Instant, duration: Duration) {
        self.cooldown_until = Some(now + duration);
    }

    /// Whether the input cooldown is running at `now`.
    #[must_use]
    pub fn is_input_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Whether skill follow-up matching is active.
    #[must_use]
    pub const fn skill_followup(&self) -> bool {
        self.skill_followup
    }

    /// Sets the skill follow-up flag, returning whether it changed.
    pub const fn set_skill_followup(&mut self, active: bool) -> bool {
        let changed = self.skill_followup != active;
        self.skill_followup = active;
        changed
    }

    /// When the in-flight user operation started (or last progressed).
    #[must_use]
    pub const fn user_operation_since(&self) -> Option<Instant> {
        self.user_operation_since
    }

    /// When the in-flight turn last progressed.
    #[must_use]
    pub const fn turn_since(&self) -> Option<Instant> {
        self.turn_since
    }

    /// Copies the flags at `now`.
    #[must_use]
    pub fn snapshot(&self, now: Instant) -> GateSnapshot {
        GateSnapshot {
            input_cooldown: self.is_input_cooldown(now),
            user_operation_in_flight: self.user_operation_since.is_some(),
            turn_transition_in_flight: self.turn_since.is_some(),
            skill_followup: self.skill_followup,
        }
    }
}
