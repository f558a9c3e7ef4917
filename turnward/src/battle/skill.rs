//! Skill resolution coordinator.
//!
//! Skills fire in two places: inside a turn (the pending-skill detour) and
//! from the skill-animation event stream. Either path may end up owning the
//! exit from `SkillAnimation`/`SkillAfterProcess`; the follow-up token makes
//! sure exactly one of them performs it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use turnward_core::BattlePhase;

use super::orchestrator::BattleOrchestrator;
use crate::collaborators::{MatchingEngine, board_idle};
use crate::observability::events::Event;

// ============================================================================
// Follow-up token
// ============================================================================

/// Who holds the skill follow-up token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupOwner {
    /// A turn sequence running its pending-skill detour.
    Turn,
    /// The event-driven coordinator.
    Coordinator,
}

/// Exclusive right to exit `SkillAnimation`/`SkillAfterProcess` into
/// `EnemyAttack`.
#[derive(Debug, Default)]
pub struct SkillFollowupToken {
    holder: Mutex<Option<FollowupOwner>>,
}

impl SkillFollowupToken {
    /// Takes the token if nobody holds it.
    pub fn try_acquire(self: &Arc<Self>, owner: FollowupOwner) -> Option<FollowupGuard> {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if holder.is_some() {
            return None;
        }
        *holder = Some(owner);
        Some(FollowupGuard {
            token: Arc::clone(self),
            owner,
        })
    }

    /// Current holder, if any.
    #[must_use]
    pub fn holder(&self) -> Option<FollowupOwner> {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held token; released on drop, including when its task is cancelled.
#[derive(Debug)]
pub struct FollowupGuard {
    token: Arc<SkillFollowupToken>,
    owner: FollowupOwner,
}

impl FollowupGuard {
    /// Owner this guard was acquired for.
    #[must_use]
    pub const fn owner(&self) -> FollowupOwner {
        self.owner
    }
}

impl Drop for FollowupGuard {
    fn drop(&mut self) {
        *self
            .token
            .holder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// What started a skill follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowupSource {
    /// A skill animation completed.
    AnimationCompleted,
    /// The host set the follow-up flag.
    Setter,
    /// The after-process monitor.
    AfterProcess,
}

impl FollowupSource {
    /// Stable label for logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnimationCompleted => "animation_completed",
            Self::Setter => "setter",
            Self::AfterProcess => "after_process",
        }
    }
}

/// Result of waiting for the board to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdleWait {
    Idle,
    TimedOut,
    PhaseChanged,
}

impl BattleOrchestrator {
    /// Sets the skill follow-up flag.
    ///
    /// Raising the flag starts a follow-up with the setter's base timeout.
    pub fn set_matching_after_skill(self: &Arc<Self>, active: bool) {
        let changed = self.gate().set_skill_followup(active);
        if changed && active {
            self.spawn_followup(self.config.skill.setter_base_timeout, FollowupSource::Setter);
        }
    }

    /// Marks skill follow-up active and enters `SkillAnimation`.
    ///
    /// Returns whether the transition was accepted.
    pub fn start_skill_processing(self: &Arc<Self>) -> bool {
        if self.is_new_system_active() {
            return false;
        }
        self.gate().set_skill_followup(true);
        match self.transition_to(BattlePhase::SkillAnimation) {
            Ok(_) => {
                info!("skill processing started");
                true
            }
            Err(_) => false,
        }
    }

    /// Which path currently owns the exit out of skill resolution.
    #[must_use]
    pub fn followup_holder(&self) -> Option<FollowupOwner> {
        self.followup.holder()
    }

    /// Starts the after-process monitor in the background.
    pub fn start_skill_after_process_monitoring(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.spawn_guarded(async move { this.monitor_after_process().await });
    }

    pub(crate) fn on_skill_animation_started(&self) {
        if !self.skill_events_enabled() {
            return;
        }
        if self.gate().set_skill_followup(false) {
            debug!("skill animation started, follow-up flag cleared");
        }
    }

    pub(crate) fn on_skill_animation_completed(self: &Arc<Self>) {
        if !self.skill_events_enabled() {
            return;
        }
        self.gate().set_skill_followup(true);
        self.spawn_followup(
            self.config.skill.followup_base_timeout,
            FollowupSource::AnimationCompleted,
        );
    }

    fn spawn_followup(self: &Arc<Self>, base: Duration, source: FollowupSource) {
        debug!(?base, source = source.as_str(), "skill follow-up scheduled");
        let this = Arc::clone(self);
        self.spawn_guarded(async move { this.run_followup(base, source).await });
    }

    /// Waits for the board to settle, clears the follow-up flag, and if the
    /// phase is still in skill resolution hands the battle to the enemy.
    async fn run_followup(self: Arc<Self>, base: Duration, source: FollowupSource) {
        match &self.collaborators.matching {
            Some(matching) => {
                if self.wait_for_board_idle(matching.as_ref(), base * 2, None).await
                    == IdleWait::TimedOut
                {
                    warn!(source = source.as_str(), "board did not settle after skill");
                }
            }
            None => {
                warn!("no matching engine, waiting base timeout");
                tokio::time::sleep(base).await;
            }
        }
        tokio::time::sleep(self.config.skill.followup_settle).await;

        if self.is_new_system_active() {
            return;
        }
        if self.gate().set_skill_followup(false) {
            debug!(source = source.as_str(), "skill follow-up flag cleared");
        }

        let phase = self.current_phase();
        if !matches!(
            phase,
            BattlePhase::SkillAnimation | BattlePhase::SkillAfterProcess
        ) {
            return;
        }
        let Some(_guard) = self.followup.try_acquire(FollowupOwner::Coordinator) else {
            debug!(holder = ?self.followup.holder(), "follow-up exit owned elsewhere");
            return;
        };

        if phase == BattlePhase::SkillAnimation
            && self.transition_to(BattlePhase::SkillAfterProcess).is_err()
        {
            return;
        }
        if self.transition_to(BattlePhase::EnemyAttack).is_err() {
            return;
        }
        let epoch = self.register.epoch();
        if !self.settle(self.config.skill.pre_enemy_delay, epoch).await {
            return;
        }
        self.hand_over_to_enemy(epoch, source);
    }

    /// Waits in `SkillAfterProcess` for the board to settle, then either
    /// runs the remaining skills or proceeds to `EnemyAttack`.
    async fn monitor_after_process(self: Arc<Self>) {
        if self.is_new_system_active() {
            return;
        }
        if self.current_phase() != BattlePhase::SkillAfterProcess
            && self.transition_to(BattlePhase::SkillAfterProcess).is_err()
        {
            warn!("cannot enter SkillAfterProcess, monitor not started");
            return;
        }

        match &self.collaborators.matching {
            Some(matching) => {
                match self
                    .wait_for_board_idle(
                        matching.as_ref(),
                        self.config.skill.after_process_timeout,
                        Some(BattlePhase::SkillAfterProcess),
                    )
                    .await
                {
                    IdleWait::Idle => {}
                    IdleWait::TimedOut => warn!("board still busy after skill, continuing"),
                    IdleWait::PhaseChanged => {
                        debug!("phase left SkillAfterProcess, monitor stopped");
                        return;
                    }
                }
            }
            None => debug!("no matching engine, skipping idle poll"),
        }

        if self.current_phase() != BattlePhase::SkillAfterProcess {
            return;
        }
        tokio::time::sleep(self.config.skill.after_process_settle).await;

        let pending = self
            .collaborators
            .skills
            .as_ref()
            .filter(|skills| skills.has_pending_skills());
        if let Some(skills) = pending {
            if self.transition_to(BattlePhase::SkillAnimation).is_ok() {
                skills.execute_all_pending_skills().await;
            }
            return;
        }

        let Some(_guard) = self.followup.try_acquire(FollowupOwner::Coordinator) else {
            debug!(holder = ?self.followup.holder(), "follow-up exit owned elsewhere");
            return;
        };
        tokio::time::sleep(self.config.skill.pre_enemy_delay).await;
        if self.is_new_system_active() || self.transition_to(BattlePhase::EnemyAttack).is_err() {
            return;
        }
        let epoch = self.register.epoch();
        self.hand_over_to_enemy(epoch, FollowupSource::AfterProcess);
    }

    fn hand_over_to_enemy(self: &Arc<Self>, epoch: u64, source: FollowupSource) {
        info!(source = source.as_str(), "skill resolution done, enemy turn");
        let this = Arc::clone(self);
        self.spawn_guarded(async move {
            if let Err(reason) = this.resolve_enemy_attack(epoch).await {
                warn!(%reason, "enemy resolution after skill abandoned");
            }
        });
        self.set_input_blocked(false);
        self.emitter.emit(Event::SkillFollowupResolved {
            timestamp: Utc::now(),
            source: source.as_str().to_owned(),
        });
    }

    /// Polls until the board is idle, `timeout` passes, or (when `phase` is
    /// given) the phase leaves `phase`.
    pub(crate) async fn wait_for_board_idle(
        &self,
        engine: &dyn MatchingEngine,
        timeout: Duration,
        phase: Option<BattlePhase>,
    ) -> IdleWait {
        let poll = async {
            let mut interval = tokio::time::interval(self.config.turn.poll_interval);
            loop {
                interval.tick().await;
                if phase.is_some_and(|p| self.current_phase() != p) {
                    return IdleWait::PhaseChanged;
                }
                if board_idle(engine) {
                    return IdleWait::Idle;
                }
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .unwrap_or(IdleWait::TimedOut)
    }
}
