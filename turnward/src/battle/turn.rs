//! Turn sequence.
//!
//! One player move: the player attack, an optional pending-skill detour,
//! enemy resolution, and the return to `BattleInProgress`. At most one
//! turn runs at a time. A turn captures the recovery epoch when it starts
//! and stops silently at its next step once the epoch has moved, since the
//! recovery that moved it already cleaned up after it.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use turnward_core::{BattlePhase, TransitionDenied};

use super::orchestrator::BattleOrchestrator;
use super::skill::{FollowupGuard, FollowupOwner};
use crate::observability::events::Event;
use crate::observability::metrics;

/// Why a sequence stopped before its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// A forced recovery or a takeover happened meanwhile.
    Stale,
    /// A transition was refused while the sequence was still current.
    Denied(TransitionDenied),
}

impl AbandonReason {
    /// Stable label for logs, events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::Denied(_) => "denied",
        }
    }
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stale => f.write_str("stale"),
            Self::Denied(denied) => write!(f, "denied: {denied}"),
        }
    }
}

/// How a turn request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn ran to `BattleInProgress`.
    Completed {
        /// Turn number.
        turn: u64,
        /// Whether pending skills ran before the enemy.
        skill_detour: bool,
    },
    /// Another turn was already in flight.
    AlreadyRunning,
    /// The battle was not waiting for a move; nothing was touched.
    WrongPhase(BattlePhase),
    /// Another system owns the battle.
    Passive,
    /// The turn stopped part way.
    Abandoned {
        /// Turn number.
        turn: u64,
        /// Why it stopped.
        reason: AbandonReason,
    },
}

impl BattleOrchestrator {
    /// Handles the matching engine's "match process completed" signal by
    /// starting a turn in the background.
    pub fn on_match_completed(self: &Arc<Self>) {
        if self.is_new_system_active() {
            return;
        }
        let this = Arc::clone(self);
        self.spawn_guarded(async move {
            this.run_turn().await;
        });
    }

    /// Runs one turn sequence to completion.
    pub async fn run_turn(self: Arc<Self>) -> TurnOutcome {
        if self.is_new_system_active() {
            return TurnOutcome::Passive;
        }
        let phase = self.current_phase();
        if !accepts_turn_start(phase) {
            debug!(%phase, "match completion outside a turn start phase, ignoring");
            return TurnOutcome::WrongPhase(phase);
        }
        let now = self.clock.now();
        if !self.gate().begin_turn_transition(now) {
            debug!("turn already in flight, ignoring match completion");
            return TurnOutcome::AlreadyRunning;
        }

        // The phase can still move between the check and the first hop. A
        // refused hop means someone else owns the phase, so only the turn
        // flag is given back.
        let epoch = self.register.epoch();
        if let Err(reason) = self.enter_player_attack(epoch) {
            self.gate().end_turn_transition();
            let phase = self.current_phase();
            debug!(%phase, %reason, "turn start refused");
            return TurnOutcome::WrongPhase(phase);
        }
        self.set_input_blocked(true);

        let turn = self.turns_started.fetch_add(1, Ordering::SeqCst) + 1;
        info!(turn, "turn started");
        metrics::record_turn_started();
        self.emitter.emit(Event::TurnStarted {
            timestamp: Utc::now(),
            turn,
        });

        match self.turn_steps(epoch).await {
            Ok(skill_detour) => {
                self.turns_completed.fetch_add(1, Ordering::SeqCst);
                info!(turn, skill_detour, "turn completed");
                metrics::record_turn_completed();
                self.emitter.emit(Event::TurnCompleted {
                    timestamp: Utc::now(),
                    turn,
                    skill_detour,
                });
                TurnOutcome::Completed { turn, skill_detour }
            }
            Err(reason) => {
                if let AbandonReason::Denied(denied) = reason {
                    warn!(turn, %denied, "turn aborted, restoring control");
                    self.abort_turn();
                } else {
                    debug!(turn, "turn abandoned after recovery");
                }
                self.turns_abandoned.fetch_add(1, Ordering::SeqCst);
                metrics::record_turn_abandoned(reason.as_str());
                self.emitter.emit(Event::TurnAbandoned {
                    timestamp: Utc::now(),
                    turn,
                    reason: reason.to_string(),
                });
                TurnOutcome::Abandoned { turn, reason }
            }
        }
    }

    async fn turn_steps(self: &Arc<Self>, epoch: u64) -> Result<bool, AbandonReason> {
        let turn_config = &self.config.turn;

        // Player attack.
        self.mark_turn_progress();

        match &self.collaborators.player_attack {
            Some(player_attack) => player_attack.execute_attack_and_wait().await,
            None => warn!("no player attack, skipping"),
        }
        self.ensure_current(epoch)?;
        if let Some(matching) = &self.collaborators.matching {
            matching.clear_removed_count();
        }
        self.mark_turn_progress();
        self.stale_after(turn_config.post_player_attack_settle, epoch)
            .await?;

        // Pending skills run before the enemy acts.
        let mut followup: Option<FollowupGuard> = None;
        let pending = self
            .collaborators
            .skills
            .as_ref()
            .filter(|skills| skills.has_pending_skills());
        let skill_detour = pending.is_some();
        if let Some(skills) = pending {
            followup = self.followup.try_acquire(FollowupOwner::Turn);
            if followup.is_none() {
                debug!(holder = ?self.followup.holder(), "follow-up already held");
            }
            self.transition_step(BattlePhase::SkillAnimation, epoch)?;
            skills.execute_all_pending_skills().await;
            self.ensure_current(epoch)?;
            self.mark_turn_progress();

            self.transition_step(BattlePhase::SkillAfterProcess, epoch)?;
            self.stale_after(turn_config.post_skill_settle, epoch)
                .await?;
            self.mark_turn_progress();
        }

        // Enemy.
        self.stale_after(turn_config.pre_enemy_settle, epoch)
            .await?;
        self.transition_step(BattlePhase::EnemyAttack, epoch)?;
        drop(followup);
        self.mark_turn_progress();

        self.resolve_enemy_attack(epoch).await?;
        self.mark_turn_progress();

        // Hand control back.
        self.stale_after(turn_config.post_enemy_settle, epoch)
            .await?;
        self.set_input_blocked(false);
        {
            let now = self.clock.now();
            let mut gate = self.gate();
            gate.begin_input_cooldown(now, self.config.gate.input_cooldown);
            gate.end_user_operation();
            gate.end_turn_transition();
        }

        // Skills reserved during enemy resolution start the next round of
        // skill animation; the event-driven follow-up takes it from there.
        let late_skills = self
            .collaborators
            .skills
            .as_ref()
            .filter(|skills| skills.has_pending_skills());
        if let Some(skills) = late_skills {
            if self.transition_to(BattlePhase::SkillAnimation).is_ok() {
                let skills = Arc::clone(skills);
                self.spawn_guarded(async move {
                    skills.execute_all_pending_skills().await;
                });
            }
        }

        Ok(skill_detour)
    }

    /// `BattleInProgress` (via `PuzzleMatching`) to `PlayerAttack`.
    fn enter_player_attack(self: &Arc<Self>, epoch: u64) -> Result<(), AbandonReason> {
        if self.current_phase() == BattlePhase::BattleInProgress {
            self.transition_step(BattlePhase::PuzzleMatching, epoch)?;
        }
        self.transition_step(BattlePhase::PlayerAttack, epoch)
    }

    /// Releases everything a turn denied mid-sequence was holding and
    /// repairs the phase it had moved.
    fn abort_turn(self: &Arc<Self>) {
        {
            let mut gate = self.gate();
            gate.end_user_operation();
            gate.end_turn_transition();
        }
        self.set_input_blocked(false);
        self.ensure_correct_state();
    }

    // ========================================================================
    // Step helpers shared by turn, enemy resolution and opening
    // ========================================================================

    pub(crate) fn ensure_current(&self, epoch: u64) -> Result<(), AbandonReason> {
        if self.still_current(epoch) {
            Ok(())
        } else {
            Err(AbandonReason::Stale)
        }
    }

    pub(crate) async fn stale_after(
        &self,
        delay: Duration,
        epoch: u64,
    ) -> Result<(), AbandonReason> {
        tokio::time::sleep(delay).await;
        self.ensure_current(epoch)
    }

    /// Table-checked step; a denial after the epoch moved counts as stale.
    pub(crate) fn transition_step(
        self: &Arc<Self>,
        target: BattlePhase,
        epoch: u64,
    ) -> Result<(), AbandonReason> {
        self.ensure_current(epoch)?;
        match self.transition_to(target) {
            Ok(_) => Ok(()),
            Err(_) if !self.still_current(epoch) => Err(AbandonReason::Stale),
            Err(denied) => Err(AbandonReason::Denied(denied)),
        }
    }
}

/// Phases a match completion may start a turn from.
const fn accepts_turn_start(phase: BattlePhase) -> bool {
    matches!(
        phase,
        BattlePhase::BattleInProgress | BattlePhase::PuzzleMatching
    )
}
