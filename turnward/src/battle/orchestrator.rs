//! Battle orchestrator.
//!
//! Owns the phase register and the operation gate, runs the watchdog
//! tick, and exposes the host-facing operations. The turn sequence, enemy
//! resolution, skill coordinator and opening are `impl` blocks in their
//! own modules.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use turnward_core::{BattleConfig, BattlePhase, DenialReason, TransitionDenied};

use super::gate::{Admission, GateSnapshot, OperationGate};
use super::register::{PhaseChange, PhaseRegister};
use super::skill::SkillFollowupToken;
use super::watchdog::{WatchdogKind, WatchdogSet};
use super::{BattleEvent, BattleHandle};
use crate::clock::{Clock, TokioClock};
use crate::collaborators::{Collaborators, grid_filling_in_progress};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

// ============================================================================
// Construction
// ============================================================================

/// Builder for a [`BattleOrchestrator`].
pub struct BattleBuilder {
    config: Arc<BattleConfig>,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    emitter: Arc<EventEmitter>,
    initial_phase: BattlePhase,
}

impl BattleBuilder {
    /// Sets the injected collaborators.
    #[must_use]
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the structured event sink.
    #[must_use]
    pub fn emitter(mut self, emitter: Arc<EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Sets the phase the register starts in (default `FadeOut`).
    #[must_use]
    pub const fn initial_phase(mut self, phase: BattlePhase) -> Self {
        self.initial_phase = phase;
        self
    }

    /// Builds the orchestrator. Nothing runs until [`BattleOrchestrator::start`].
    #[must_use]
    pub fn build(self) -> Arc<BattleOrchestrator> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let now = self.clock.now();
        Arc::new(BattleOrchestrator {
            register: PhaseRegister::new(self.initial_phase, now),
            gate: Mutex::new(OperationGate::new(self.config.gate.duplicate_window)),
            watchdogs: WatchdogSet::new(&self.config.watchdog),
            followup: Arc::new(SkillFollowupToken::default()),
            takeover: AtomicBool::new(false),
            skill_events: AtomicBool::new(true),
            first_turn: AtomicBool::new(true),
            initial_skill_used: AtomicBool::new(false),
            turns_started: AtomicU64::new(0),
            turns_completed: AtomicU64::new(0),
            turns_abandoned: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            lifecycle: Mutex::new(None),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            config: self.config,
            collaborators: self.collaborators,
            clock: self.clock,
            emitter: self.emitter,
        })
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Cancellation handles for a started orchestrator.
#[derive(Debug)]
struct Lifecycle {
    events: CancellationToken,
    watchdog: CancellationToken,
}

/// Counts of watchdog recoveries, by watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchdogFires {
    /// User operation left in flight.
    pub user_operation: u64,
    /// Turn sequence without progress.
    pub turn_transition: u64,
    /// Stay in `EnemyAttack` over budget.
    pub enemy_attack: u64,
    /// One-shot phase timeouts.
    pub phase_timeout: u64,
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BattleStatus {
    /// Current phase.
    pub phase: BattlePhase,
    /// Recovery epoch.
    pub epoch: u64,
    /// Gate flags.
    pub gate: GateSnapshot,
    /// Another system owns the battle.
    pub takeover: bool,
    /// Turn sequences started.
    pub turns_started: u64,
    /// Turn sequences completed.
    pub turns_completed: u64,
    /// Turn sequences abandoned.
    pub turns_abandoned: u64,
    /// Watchdog recoveries.
    pub watchdog_fires: WatchdogFires,
}

/// Turn orchestration state machine for one battle.
pub struct BattleOrchestrator {
    pub(crate) config: Arc<BattleConfig>,
    pub(crate) collaborators: Collaborators,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) emitter: Arc<EventEmitter>,
    pub(crate) register: PhaseRegister,
    gate: Mutex<OperationGate>,
    pub(crate) watchdogs: WatchdogSet,
    pub(crate) followup: Arc<SkillFollowupToken>,
    takeover: AtomicBool,
    skill_events: AtomicBool,
    pub(crate) first_turn: AtomicBool,
    pub(crate) initial_skill_used: AtomicBool,
    pub(crate) turns_started: AtomicU64,
    pub(crate) turns_completed: AtomicU64,
    pub(crate) turns_abandoned: AtomicU64,
    cancel: CancellationToken,
    lifecycle: Mutex<Option<Lifecycle>>,
    events_tx: mpsc::UnboundedSender<BattleEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<BattleEvent>>>,
}

impl std::fmt::Debug for BattleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleOrchestrator")
            .field("register", &self.register)
            .field("collaborators", &self.collaborators)
            .field("takeover", &self.is_new_system_active())
            .finish_non_exhaustive()
    }
}

impl BattleOrchestrator {
    /// Starts building an orchestrator with the given configuration.
    #[must_use]
    pub fn builder(config: Arc<BattleConfig>) -> BattleBuilder {
        BattleBuilder {
            config,
            collaborators: Collaborators::default(),
            clock: Arc::new(TokioClock),
            emitter: Arc::new(EventEmitter::noop()),
            initial_phase: BattlePhase::FadeOut,
        }
    }

    /// Returns a handle for delivering collaborator events.
    #[must_use]
    pub fn handle(&self) -> BattleHandle {
        BattleHandle::new(self.events_tx.clone())
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Subscribes to collaborator events and starts the watchdog tick.
    ///
    /// Returns `false` if the orchestrator was already started. A stopped
    /// orchestrator cannot be started again.
    pub fn start(self: &Arc<Self>) -> bool {
        let Some(rx) = self
            .events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("battle orchestrator already started");
            return false;
        };

        let lifecycle = Lifecycle {
            events: self.cancel.child_token(),
            watchdog: self.cancel.child_token(),
        };
        self.start_event_loop(rx, lifecycle.events.clone());
        self.start_watchdog_task(lifecycle.watchdog.clone());
        *self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(lifecycle);

        let phase = self.current_phase();
        info!(%phase, "battle orchestrator started");
        self.emitter.emit(Event::BattleStarted {
            timestamp: Utc::now(),
            phase,
        });
        true
    }

    /// Unsubscribes from events and cancels every task the orchestrator
    /// spawned, including running turns. Idempotent.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        info!("battle orchestrator stopped");
        self.emitter.emit(Event::BattleStopped {
            timestamp: Utc::now(),
            reason: "stopped".to_owned(),
        });
    }

    /// Stops the watchdog tick, leaving event handling running.
    pub fn disable_timeout_monitoring(&self) {
        if let Some(lifecycle) = self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            lifecycle.watchdog.cancel();
        }
        info!("timeout monitoring disabled");
    }

    /// Ignores skill animation events from now on.
    pub fn unsubscribe_from_skill_events(&self) {
        self.skill_events.store(false, Ordering::SeqCst);
        info!("unsubscribed from skill animation events");
    }

    pub(crate) fn skill_events_enabled(&self) -> bool {
        self.skill_events.load(Ordering::SeqCst)
    }

    fn start_event_loop(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<BattleEvent>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("event loop cancelled");
                        break;
                    }
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        this.dispatch_event(event);
                    }
                }
            }
        })
    }

    fn start_watchdog_task(self: &Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = self.config.watchdog.tick_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("watchdog task cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        this.check_watchdogs();
                    }
                }
            }
        })
    }

    fn dispatch_event(self: &Arc<Self>, event: BattleEvent) {
        if self.is_new_system_active() {
            debug!(?event, "passive, dropping event");
            return;
        }
        match event {
            BattleEvent::MatchCompleted => self.on_match_completed(),
            BattleEvent::SkillAnimationStarted => self.on_skill_animation_started(),
            BattleEvent::SkillAnimationCompleted => self.on_skill_animation_completed(),
        }
    }

    /// Spawns `fut` so that [`stop`](Self::stop) drops it.
    pub(crate) fn spawn_guarded<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.cancel.child_token();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = fut => {}
            }
        })
    }

    // ========================================================================
    // Host operations
    // ========================================================================

    /// Returns the current phase.
    #[must_use]
    pub fn current_phase(&self) -> BattlePhase {
        self.register.current()
    }

    /// Admission control for a player operation.
    ///
    /// Starting the turn is left to the "match completed" event.
    pub fn notify_user_operation(&self) -> Admission {
        let now = self.clock.now();
        let phase = self.current_phase();
        let admission =
            self.gate()
                .try_accept_user_operation(now, phase, self.is_new_system_active());

        match admission {
            Admission::Accepted => {
                info!("user operation accepted");
                metrics::record_user_operation("accepted");
            }
            Admission::Rejected(reason) => {
                debug!(%reason, %phase, "user operation rejected");
                metrics::record_user_operation(reason.as_str());
                self.emitter.emit(Event::OperationRejected {
                    timestamp: Utc::now(),
                    reason: reason.to_string(),
                });
            }
        }
        admission
    }

    /// Requests a table-checked transition; `true` on success or no-op.
    pub fn try_transition(self: &Arc<Self>, target: BattlePhase) -> bool {
        self.request_transition(target).is_ok()
    }

    /// Requests a table-checked transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionDenied`] when the edge is not in the table, or
    /// with [`DenialReason::Passive`] while another system owns the battle.
    pub fn request_transition(
        self: &Arc<Self>,
        target: BattlePhase,
    ) -> Result<PhaseChange, TransitionDenied> {
        if self.is_new_system_active() {
            let denied = TransitionDenied {
                from: self.current_phase(),
                to: target,
                reason: DenialReason::Passive,
            };
            debug!(%denied, "transition ignored while passive");
            metrics::record_transition_denied(denied.reason);
            return Err(denied);
        }
        self.transition_to(target)
    }

    /// Whether skill follow-up matching is active.
    #[must_use]
    pub fn is_matching_after_skill(&self) -> bool {
        self.gate().skill_followup()
    }

    /// Whether the post-turn input cooldown is running.
    #[must_use]
    pub fn is_input_cooldown(&self) -> bool {
        self.gate().is_input_cooldown(self.clock.now())
    }

    /// Whether another system owns the battle.
    #[must_use]
    pub fn is_new_system_active(&self) -> bool {
        self.takeover.load(Ordering::SeqCst)
    }

    /// Hands the battle to (or takes it back from) another system.
    ///
    /// While active the orchestrator is fully passive. Taking the battle
    /// back clears any in-flight markers left by the other owner.
    pub fn set_new_system_active(&self, active: bool) {
        let was = self.takeover.swap(active, Ordering::SeqCst);
        if was == active {
            return;
        }
        if active {
            info!("new system active, orchestrator is passive");
        } else {
            let mut gate = self.gate();
            gate.end_turn_transition();
            gate.end_user_operation();
            info!("orchestrator active again");
        }
    }

    /// Mirrors an externally owned phase while passive.
    ///
    /// Returns `false` (and leaves the register alone) when not passive.
    pub fn sync_phase_from_external(&self, phase: BattlePhase) -> bool {
        if !self.is_new_system_active() {
            debug!(%phase, "external phase sync ignored while active");
            return false;
        }
        self.register.mirror(phase, self.clock.now());
        true
    }

    /// Manual stuck-phase recovery.
    ///
    /// In `PlayerAttack`, `EnemyAttack` or `EnemySkill`, releases the input
    /// block, forces `BattleInProgress` and clears the turn flag. In any
    /// other phase it does nothing. Returns whether it recovered.
    pub fn ensure_correct_state(self: &Arc<Self>) -> bool {
        if self.is_new_system_active() {
            return false;
        }
        let phase = self.current_phase();
        if !phase.is_stuck_recoverable() {
            return false;
        }
        warn!(%phase, "phase stuck, forcing recovery");
        self.set_input_blocked(false);
        self.force_recover();
        self.gate().end_turn_transition();
        true
    }

    /// Forces recovery if the phase has not changed after `timeout`.
    ///
    /// Captures the current phase now; when the timer expires and the
    /// register still holds the same phase entry, forces `BattleInProgress`
    /// and releases the input block.
    pub fn force_phase_after_timeout(self: &Arc<Self>, timeout: Duration) -> JoinHandle<()> {
        let phase = self.current_phase();
        let entered_at = self.register.entered_at();
        debug!(%phase, ?timeout, "phase timeout armed");

        let this = Arc::clone(self);
        self.spawn_guarded(async move {
            tokio::time::sleep(timeout).await;
            if this.is_new_system_active()
                || this.current_phase() != phase
                || this.register.entered_at() != entered_at
            {
                return;
            }
            warn!(%phase, ?timeout, "phase unchanged after timeout, forcing recovery");
            this.watchdogs.record_fire(WatchdogKind::PhaseTimeout);
            this.record_watchdog(WatchdogKind::PhaseTimeout, phase);
            this.force_recover();
            this.set_input_blocked(false);
        })
    }

    /// Returns a point-in-time view of the orchestrator.
    #[must_use]
    pub fn status(&self) -> BattleStatus {
        BattleStatus {
            phase: self.current_phase(),
            epoch: self.register.epoch(),
            gate: self.gate().snapshot(self.clock.now()),
            takeover: self.is_new_system_active(),
            turns_started: self.turns_started.load(Ordering::SeqCst),
            turns_completed: self.turns_completed.load(Ordering::SeqCst),
            turns_abandoned: self.turns_abandoned.load(Ordering::SeqCst),
            watchdog_fires: WatchdogFires {
                user_operation: self.watchdogs.fire_count(WatchdogKind::UserOperation),
                turn_transition: self.watchdogs.fire_count(WatchdogKind::TurnTransition),
                enemy_attack: self.watchdogs.fire_count(WatchdogKind::EnemyAttack),
                phase_timeout: self.watchdogs.fire_count(WatchdogKind::PhaseTimeout),
            },
        }
    }

    // ========================================================================
    // Watchdogs
    // ========================================================================

    /// Runs one watchdog tick.
    pub fn check_watchdogs(self: &Arc<Self>) {
        if self.is_new_system_active() {
            return;
        }
        let now = self.clock.now();
        let (user_since, turn_since) = {
            let gate = self.gate();
            (gate.user_operation_since(), gate.turn_since())
        };

        if self
            .watchdogs
            .check(WatchdogKind::UserOperation, user_since, now)
        {
            self.recover_user_operation();
        }

        if self
            .watchdogs
            .check(WatchdogKind::TurnTransition, turn_since, now)
        {
            let phase = self.current_phase();
            warn!(%phase, "turn transition timed out");
            self.record_watchdog(WatchdogKind::TurnTransition, phase);
            self.ensure_correct_state();
        }

        let phase = self.current_phase();
        let enemy_since =
            (phase == BattlePhase::EnemyAttack).then(|| self.register.entered_at());
        if self
            .watchdogs
            .check(WatchdogKind::EnemyAttack, enemy_since, now)
        {
            warn!("EnemyAttack over budget, forcing BattleInProgress");
            self.record_watchdog(WatchdogKind::EnemyAttack, phase);
            self.force_recover();
            self.set_input_blocked(false);
        }
    }

    fn recover_user_operation(self: &Arc<Self>) {
        let phase = self.current_phase();
        warn!(%phase, "user operation timed out, resetting battle state");
        self.record_watchdog(WatchdogKind::UserOperation, phase);
        {
            let mut gate = self.gate();
            gate.end_user_operation();
            gate.end_turn_transition();
        }
        self.set_input_blocked(false);
        if !phase.is_attack_resolution() {
            self.force_recover();
        }
    }

    fn record_watchdog(&self, kind: WatchdogKind, phase: BattlePhase) {
        metrics::record_watchdog_recovery(kind.as_str());
        self.emitter.emit(Event::WatchdogFired {
            timestamp: Utc::now(),
            watchdog: kind.as_str().to_owned(),
            phase,
        });
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    pub(crate) fn gate(&self) -> MutexGuard<'_, OperationGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Table-checked transition with logging, metrics and events.
    pub(crate) fn transition_to(
        self: &Arc<Self>,
        target: BattlePhase,
    ) -> Result<PhaseChange, TransitionDenied> {
        match self.register.request(target, self.clock.now()) {
            Ok(change) => {
                if let PhaseChange::Changed { from, to } = change {
                    self.on_phase_entered(from, to, false);
                }
                Ok(change)
            }
            Err(denied) => {
                warn!(%denied, "transition denied");
                metrics::record_transition_denied(denied.reason);
                self.emitter.emit(Event::TransitionDenied {
                    timestamp: Utc::now(),
                    from: denied.from,
                    to: denied.to,
                    reason: denied.reason.to_string(),
                });
                Err(denied)
            }
        }
    }

    /// Forced recovery to `BattleInProgress`.
    ///
    /// When the phase actually changes, the epoch moves and any running
    /// turn is dead, so its in-flight markers are cleared here.
    pub(crate) fn force_recover(self: &Arc<Self>) -> PhaseChange {
        let change = self.register.force_recover(self.clock.now());
        if let PhaseChange::Changed { from, to } = change {
            {
                let mut gate = self.gate();
                gate.end_turn_transition();
                gate.end_user_operation();
            }
            self.on_phase_entered(from, to, true);
        }
        change
    }

    fn on_phase_entered(self: &Arc<Self>, from: BattlePhase, to: BattlePhase, forced: bool) {
        info!(%from, %to, forced, "phase changed");
        metrics::record_phase_transition(from, to, forced);
        self.emitter.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            from,
            to,
            forced,
        });
        if to == BattlePhase::PuzzleMatching {
            self.arm_puzzle_matching_guard();
        }
    }

    /// Entering `PuzzleMatching` with nothing matching and nothing to
    /// refill means nothing will ever move the phase on.
    fn arm_puzzle_matching_guard(self: &Arc<Self>) {
        let Some(matching) = &self.collaborators.matching else {
            return;
        };
        if matching.is_matching_in_progress() || grid_filling_in_progress(matching.as_ref()) {
            return;
        }
        debug!("PuzzleMatching entered on an idle board, arming idle guard");
        self.force_phase_after_timeout(self.config.watchdog.puzzle_matching_idle);
    }

    pub(crate) fn set_input_blocked(&self, blocked: bool) {
        match &self.collaborators.input {
            Some(input) => input.set_force_input_blocked(blocked),
            None => debug!(blocked, "no input blocker"),
        }
    }

    /// Whether a continuation that captured `epoch` may still act.
    pub(crate) fn still_current(&self, epoch: u64) -> bool {
        self.register.epoch() == epoch && !self.is_new_system_active()
    }

    /// Sleeps, then reports whether the continuation is still current.
    pub(crate) async fn settle(&self, delay: Duration, epoch: u64) -> bool {
        tokio::time::sleep(delay).await;
        self.still_current(epoch)
    }

    pub(crate) fn mark_turn_progress(&self) {
        let now = self.clock.now();
        self.gate().mark_turn_progress(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::gate::RejectReason;

    fn orchestrator(phase: BattlePhase) -> Arc<BattleOrchestrator> {
        BattleOrchestrator::builder(Arc::new(BattleConfig::default()))
            .initial_phase(phase)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn try_transition_same_phase_is_noop() {
        let battle = orchestrator(BattlePhase::BattleInProgress);
        assert!(battle.try_transition(BattlePhase::BattleInProgress));
        assert_eq!(battle.status().epoch, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn try_transition_denies_skips() {
        let battle = orchestrator(BattlePhase::FadeOut);
        assert!(!battle.try_transition(BattlePhase::BattleInProgress));
        assert_eq!(battle.current_phase(), BattlePhase::FadeOut);
    }

    #[tokio::test(start_paused = true)]
    async fn passive_mode_denies_transitions_and_operations() {
        let battle = orchestrator(BattlePhase::BattleInProgress);
        battle.set_new_system_active(true);

        let err = battle
            .request_transition(BattlePhase::PuzzleMatching)
            .unwrap_err();
        assert_eq!(err.reason, DenialReason::Passive);
        assert_eq!(
            battle.notify_user_operation(),
            Admission::Rejected(RejectReason::Takeover)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sync_from_external_only_while_passive() {
        let battle = orchestrator(BattlePhase::BattleInProgress);
        assert!(!battle.sync_phase_from_external(BattlePhase::EnemySkill));
        assert_eq!(battle.current_phase(), BattlePhase::BattleInProgress);

        battle.set_new_system_active(true);
        assert!(battle.sync_phase_from_external(BattlePhase::EnemySkill));
        assert_eq!(battle.current_phase(), BattlePhase::EnemySkill);
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_correct_state_is_idempotent_in_battle_in_progress() {
        let battle = orchestrator(BattlePhase::BattleInProgress);
        assert!(!battle.ensure_correct_state());
        assert!(!battle.ensure_correct_state());
        let status = battle.status();
        assert_eq!(status.phase, BattlePhase::BattleInProgress);
        assert_eq!(status.epoch, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_correct_state_recovers_stuck_phase() {
        let battle = orchestrator(BattlePhase::EnemySkill);
        assert!(battle.ensure_correct_state());
        assert_eq!(battle.current_phase(), BattlePhase::BattleInProgress);
        assert_eq!(battle.status().epoch, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_refused() {
        let battle = orchestrator(BattlePhase::BattleInProgress);
        assert!(battle.start());
        assert!(!battle.start());
        battle.stop();
    }
}
