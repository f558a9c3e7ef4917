//! Battle runtime.
//!
//! [`BattleOrchestrator`] is the entry point. Collaborators deliver their
//! signals through a cloneable [`BattleHandle`]; the orchestrator consumes
//! them on its own event loop once started.

pub mod enemy_turn;
pub mod gate;
pub mod opening;
pub mod orchestrator;
pub mod register;
pub mod skill;
pub mod turn;
pub mod watchdog;

pub use gate::{Admission, GateSnapshot, OperationGate, RejectReason};
pub use opening::OpeningOutcome;
pub use orchestrator::{BattleBuilder, BattleOrchestrator, BattleStatus, WatchdogFires};
pub use register::{PhaseChange, PhaseRegister};
pub use skill::{FollowupGuard, FollowupOwner, FollowupSource, SkillFollowupToken};
pub use turn::{AbandonReason, TurnOutcome};
pub use watchdog::{WatchdogKind, WatchdogSet};

use tokio::sync::mpsc;

/// Signals raised by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleEvent {
    /// The matching engine finished resolving a player move.
    MatchCompleted,
    /// A skill animation started playing.
    SkillAnimationStarted,
    /// A skill animation finished.
    SkillAnimationCompleted,
}

/// Sender side of the orchestrator's event loop.
#[derive(Debug, Clone)]
pub struct BattleHandle {
    tx: mpsc::UnboundedSender<BattleEvent>,
}

impl BattleHandle {
    pub(crate) const fn new(tx: mpsc::UnboundedSender<BattleEvent>) -> Self {
        Self { tx }
    }

    /// Delivers an event; `false` once the orchestrator is gone.
    pub fn send(&self, event: BattleEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Shorthand for [`BattleEvent::MatchCompleted`].
    pub fn match_completed(&self) -> bool {
        self.send(BattleEvent::MatchCompleted)
    }

    /// Shorthand for [`BattleEvent::SkillAnimationStarted`].
    pub fn skill_animation_started(&self) -> bool {
        self.send(BattleEvent::SkillAnimationStarted)
    }

    /// Shorthand for [`BattleEvent::SkillAnimationCompleted`].
    pub fn skill_animation_completed(&self) -> bool {
        self.send(BattleEvent::SkillAnimationCompleted)
    }
}
