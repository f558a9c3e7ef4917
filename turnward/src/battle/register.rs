//! Phase register.
//!
//! Holds the current [`BattlePhase`], the instant it was entered, and a
//! recovery epoch. Every mutation goes through one of three entry points
//! serialized by an internal lock; reads are lock-free.
//!
//! - [`request`](PhaseRegister::request): table-checked transition.
//! - [`force_recover`](PhaseRegister::force_recover): watchdog recovery to
//!   `BattleInProgress`, bumping the epoch so stale continuations notice.
//! - [`mirror`](PhaseRegister::mirror): passive-mode copy of an external
//!   phase.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;
use turnward_core::{BattlePhase, TransitionDenied, transition};

/// Outcome of an accepted register mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    /// The register already held the requested phase.
    Unchanged(BattlePhase),
    /// The register moved from one phase to another.
    Changed {
        /// Previous phase.
        from: BattlePhase,
        /// New phase.
        to: BattlePhase,
    },
}

impl PhaseChange {
    /// Phase the register holds after the mutation.
    #[must_use]
    pub const fn phase(self) -> BattlePhase {
        match self {
            Self::Unchanged(phase) | Self::Changed { to: phase, .. } => phase,
        }
    }

    /// Whether the phase actually changed.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Single-writer phase register.
pub struct PhaseRegister {
    phase: AtomicU8,
    epoch: AtomicU64,
    entered_at: Mutex<Instant>,
    write: Mutex<()>,
}

impl PhaseRegister {
    /// Creates a register holding `initial`, entered at `now`.
    #[must_use]
    pub fn new(initial: BattlePhase, now: Instant) -> Self {
        Self {
            phase: AtomicU8::new(initial.ordinal()),
            epoch: AtomicU64::new(0),
            entered_at: Mutex::new(now),
            write: Mutex::new(()),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn current(&self) -> BattlePhase {
        // Only ordinals produced by `BattlePhase::ordinal` are ever stored.
        BattlePhase::from_ordinal(self.phase.load(Ordering::SeqCst))
            .unwrap_or(BattlePhase::BattleInProgress)
    }

    /// Returns the instant the current phase was entered.
    #[must_use]
    pub fn entered_at(&self) -> Instant {
        *self
            .entered_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the recovery epoch.
    ///
    /// Moves on every forced recovery or mirrored write that changed the
    /// phase, never on table transitions.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Requests a table-checked transition to `to`.
    ///
    /// Requesting the current phase succeeds without touching the entry
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionDenied`] when `current -> to` is not an edge.
    pub fn request(&self, to: BattlePhase, now: Instant) -> Result<PhaseChange, TransitionDenied> {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let from = self.current();
        transition::apply(from, to)?;
        if from == to {
            return Ok(PhaseChange::Unchanged(to));
        }
        self.store(to, now);
        Ok(PhaseChange::Changed { from, to })
    }

    /// Forces the register to `BattleInProgress`.
    ///
    /// Bypasses the table. The epoch moves only if the phase changed.
    pub fn force_recover(&self, now: Instant) -> PhaseChange {
        self.overwrite(BattlePhase::BattleInProgress, now)
    }

    /// Copies an externally owned phase into the register.
    ///
    /// Bypasses the table; the caller is responsible for only doing this
    /// while the runtime is passive.
    pub fn mirror(&self, phase: BattlePhase, now: Instant) -> PhaseChange {
        self.overwrite(phase, now)
    }

    fn overwrite(&self, to: BattlePhase, now: Instant) -> PhaseChange {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let from = self.current();
        if from == to {
            return PhaseChange::Unchanged(to);
        }
        self.store(to, now);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        PhaseChange::Changed { from, to }
    }

    fn store(&self, to: BattlePhase, now: Instant) {
        *self
            .entered_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = now;
        self.phase.store(to.ordinal(), Ordering::SeqCst);
    }
}

impl std::fmt::Debug for PhaseRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseRegister")
            .field("phase", &self.current())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use turnward_core::DenialReason;
    use BattlePhase::*;

    #[tokio::test(start_paused = true)]
    async fn legal_request_changes_phase_and_timestamp() {
        let start = Instant::now();
        let register = PhaseRegister::new(PlayerAttack, start);
        tokio::time::advance(Duration::from_secs(1)).await;

        let change = register.request(EnemyAttack, Instant::now()).unwrap();
        assert_eq!(
            change,
            PhaseChange::Changed {
                from: PlayerAttack,
                to: EnemyAttack
            }
        );
        assert_eq!(register.current(), EnemyAttack);
        assert_eq!(register.entered_at(), start + Duration::from_secs(1));
        assert_eq!(register.epoch(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn same_phase_request_keeps_timestamp() {
        let start = Instant::now();
        let register = PhaseRegister::new(EnemyAttack, start);
        tokio::time::advance(Duration::from_secs(4)).await;

        let change = register.request(EnemyAttack, Instant::now()).unwrap();
        assert_eq!(change, PhaseChange::Unchanged(EnemyAttack));
        assert!(!change.is_changed());
        assert_eq!(register.entered_at(), start);
    }

    #[test]
    fn illegal_request_leaves_register_untouched() {
        let register = PhaseRegister::new(BattleInProgress, Instant::now());
        let err = register.request(PlayerAttack, Instant::now()).unwrap_err();
        assert_eq!(err.reason, DenialReason::NotAnEdge);
        assert_eq!(register.current(), BattleInProgress);
    }

    #[test]
    fn force_recover_bumps_epoch_only_on_change() {
        let register = PhaseRegister::new(PlayerAttack, Instant::now());
        assert!(register.force_recover(Instant::now()).is_changed());
        assert_eq!(register.current(), BattleInProgress);
        assert_eq!(register.epoch(), 1);

        assert!(!register.force_recover(Instant::now()).is_changed());
        assert_eq!(register.epoch(), 1);
    }

    #[test]
    fn mirror_ignores_table() {
        let register = PhaseRegister::new(FadeOut, Instant::now());
        let change = register.mirror(SkillAfterProcess, Instant::now());
        assert_eq!(change.phase(), SkillAfterProcess);
        assert_eq!(register.epoch(), 1);
    }

    #[test]
    fn concurrent_requests_are_serialized() {
        let register = Arc::new(PhaseRegister::new(PuzzleMatching, Instant::now()));
        let handles: Vec<_> = [PlayerAttack, EnemyAttack]
            .into_iter()
            .map(|target| {
                let register = Arc::clone(&register);
                std::thread::spawn(move || register.request(target, Instant::now()))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let changed = results
            .iter()
            .filter(|r| matches!(r, Ok(c) if c.is_changed()))
            .count();
        // Both succeed only in the order PlayerAttack, EnemyAttack.
        assert!(changed >= 1);
        if changed == 2 {
            assert_eq!(register.current(), EnemyAttack);
        } else {
            assert_ne!(register.current(), PuzzleMatching);
        }
    }
}
