//! Scripted in-memory collaborators.
//!
//! Used by the `run` command and the integration tests. Every action takes
//! a configured time and then signals completion; an action configured with
//! no duration never completes, which is how tests exercise the watchdogs.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::battle::BattleHandle;
use crate::collaborators::{
    BattleStage, Collaborators, DropEntity, DropSource, Enemy, InputBlocker, ItemId,
    MatchingEngine, PlayerAttack, SkillQueue,
};

// ============================================================================
// Completion signal
// ============================================================================

/// Level-triggered completion counter.
///
/// `begin` hands out a ticket; `wait` resolves once the latest ticket
/// issued so far has finished, even if that happened before `wait` was
/// first polled.
#[derive(Debug)]
struct Completion {
    issued: AtomicU64,
    finished: watch::Sender<u64>,
}

impl Completion {
    fn new() -> Arc<Self> {
        let (finished, _) = watch::channel(0);
        Arc::new(Self {
            issued: AtomicU64::new(0),
            finished,
        })
    }

    fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn finish(&self, ticket: u64) {
        self.finished.send_modify(|done| *done = (*done).max(ticket));
    }

    /// Finishes `ticket` after `duration`, or never when `None`.
    fn finish_after(self: &Arc<Self>, ticket: u64, duration: Option<Duration>) {
        let Some(duration) = duration else { return };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            this.finish(ticket);
        });
    }

    async fn wait(&self) {
        let target = self.issued.load(Ordering::SeqCst);
        let mut rx = self.finished.subscribe();
        let _ = rx.wait_for(|done| *done >= target).await;
    }
}

// ============================================================================
// Board
// ============================================================================

/// Puzzle grid with a toggleable "matching" state.
#[derive(Debug)]
pub struct SimBoard {
    rows: usize,
    cols: usize,
    cells: Mutex<Vec<Option<ItemId>>>,
    matching: AtomicBool,
    removed: AtomicU32,
}

impl SimBoard {
    /// Creates a full `rows` x `cols` grid.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        let cells = (0..rows * cols)
            .map(|i| Some(ItemId::try_from(i % 5).unwrap_or_default()))
            .collect();
        Self {
            rows,
            cols,
            cells: Mutex::new(cells),
            matching: AtomicBool::new(false),
            removed: AtomicU32::new(0),
        }
    }

    /// Marks a match resolution as running or finished.
    pub fn set_matching(&self, matching: bool) {
        self.matching.store(matching, Ordering::SeqCst);
    }

    /// Empties a cell, counting it as removed.
    pub fn clear_cell(&self, row: usize, col: usize) {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = cells.get_mut(row * self.cols + col) {
            if cell.take().is_some() {
                self.removed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Fills every empty cell.
    pub fn refill(&self) {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        for cell in cells.iter_mut().filter(|c| c.is_none()) {
            *cell = Some(0);
        }
    }

    /// Items removed since the last reset.
    #[must_use]
    pub fn removed_count(&self) -> u32 {
        self.removed.load(Ordering::SeqCst)
    }
}

impl MatchingEngine for SimBoard {
    fn is_matching_in_progress(&self) -> bool {
        self.matching.load(Ordering::SeqCst)
    }

    fn grid_dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn cell_contents(&self, row: usize, col: usize) -> Option<ItemId> {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(row * self.cols + col)
            .copied()
            .flatten()
    }

    fn clear_removed_count(&self) {
        self.removed.store(0, Ordering::SeqCst);
    }
}

// ============================================================================
// Skills and player attack
// ============================================================================

/// Skill queue; optionally reports animations through a [`BattleHandle`].
#[derive(Debug)]
pub struct SimSkillQueue {
    pending: AtomicUsize,
    executed: AtomicU64,
    duration: Duration,
    events: Mutex<Option<BattleHandle>>,
}

impl SimSkillQueue {
    /// Creates an empty queue whose skills each take `duration`.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            pending: AtomicUsize::new(0),
            executed: AtomicU64::new(0),
            duration,
            events: Mutex::new(None),
        }
    }

    /// Reserves `count` more skills.
    pub fn reserve(&self, count: usize) {
        self.pending.fetch_add(count, Ordering::SeqCst);
    }

    /// Sends skill animation started/completed events for every skill.
    pub fn report_to(&self, handle: BattleHandle) {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Skills executed so far.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::SeqCst)
    }

    fn handle(&self) -> Option<BattleHandle> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl SkillQueue for SimSkillQueue {
    fn has_pending_skills(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    async fn execute_all_pending_skills(&self) {
        while self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            let handle = self.handle();
            if let Some(handle) = &handle {
                handle.skill_animation_started();
            }
            tokio::time::sleep(self.duration).await;
            self.executed.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = &handle {
                handle.skill_animation_completed();
            }
        }
    }
}

/// Player attack taking a fixed time.
#[derive(Debug)]
pub struct SimPlayerAttack {
    duration: Duration,
    attacks: AtomicU64,
}

impl SimPlayerAttack {
    /// Creates an attack that takes `duration`.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            attacks: AtomicU64::new(0),
        }
    }

    /// Attacks executed so far.
    #[must_use]
    pub fn attacks(&self) -> u64 {
        self.attacks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlayerAttack for SimPlayerAttack {
    async fn execute_attack_and_wait(&self) {
        tokio::time::sleep(self.duration).await;
        self.attacks.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Enemy and drops
// ============================================================================

/// Enemy with an attack countdown.
#[derive(Debug)]
pub struct SimEnemy {
    countdown: i32,
    counter: AtomicI32,
    attack_duration: Option<Duration>,
    attack_done: Arc<Completion>,
    attacks: AtomicU64,
    taking_damage: Arc<AtomicBool>,
    damage_done: Arc<Completion>,
    initial_skill_uses: AtomicU64,
}

impl SimEnemy {
    /// Creates an enemy that attacks every `countdown` turns.
    ///
    /// Attacks take `attack_duration`; `None` means they never complete.
    #[must_use]
    pub fn new(countdown: i32, attack_duration: Option<Duration>) -> Self {
        Self {
            countdown,
            counter: AtomicI32::new(countdown),
            attack_duration,
            attack_done: Completion::new(),
            attacks: AtomicU64::new(0),
            taking_damage: Arc::new(AtomicBool::new(false)),
            damage_done: Completion::new(),
            initial_skill_uses: AtomicU64::new(0),
        }
    }

    /// Starts a damage animation lasting `duration`.
    pub fn hit(&self, duration: Duration) {
        self.taking_damage.store(true, Ordering::SeqCst);
        let ticket = self.damage_done.begin();
        let taking_damage = Arc::clone(&self.taking_damage);
        let done = Arc::clone(&self.damage_done);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            taking_damage.store(false, Ordering::SeqCst);
            done.finish(ticket);
        });
    }

    /// Attacks started so far.
    #[must_use]
    pub fn attacks(&self) -> u64 {
        self.attacks.load(Ordering::SeqCst)
    }

    /// Times the initial skill ran.
    #[must_use]
    pub fn initial_skill_uses(&self) -> u64 {
        self.initial_skill_uses.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Enemy for SimEnemy {
    fn decrement_turn_counter(&self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }

    fn turn_counter(&self) -> i32 {
        self.counter.load(Ordering::SeqCst)
    }

    fn is_taking_damage(&self) -> bool {
        self.taking_damage.load(Ordering::SeqCst)
    }

    async fn damage_animation_completed(&self) {
        self.damage_done.wait().await;
    }

    fn attack(&self) {
        self.attacks.fetch_add(1, Ordering::SeqCst);
        self.counter.store(self.countdown, Ordering::SeqCst);
        let ticket = self.attack_done.begin();
        self.attack_done.finish_after(ticket, self.attack_duration);
    }

    async fn attack_completed(&self) {
        self.attack_done.wait().await;
    }

    async fn use_initial_skill(&self) {
        self.initial_skill_uses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Drop entity acting every `interval` enemy turns.
#[derive(Debug)]
pub struct SimDrop {
    name: String,
    interval: u32,
    remaining: AtomicU32,
    action_duration: Option<Duration>,
    done: Arc<Completion>,
    actions: AtomicU64,
}

impl SimDrop {
    /// Creates a drop acting every `interval` turns (at least one).
    #[must_use]
    pub fn new(name: impl Into<String>, interval: u32, action_duration: Option<Duration>) -> Self {
        let interval = interval.max(1);
        Self {
            name: name.into(),
            interval,
            remaining: AtomicU32::new(interval),
            action_duration,
            done: Completion::new(),
            actions: AtomicU64::new(0),
        }
    }

    /// Actions executed so far.
    #[must_use]
    pub fn actions(&self) -> u64 {
        self.actions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DropEntity for SimDrop {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn process_turn_end(&self) -> bool {
        let left = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0)
            .saturating_sub(1);
        left == 0
    }

    fn execute_action_and_reset(&self) {
        self.remaining.store(self.interval, Ordering::SeqCst);
        self.actions.fetch_add(1, Ordering::SeqCst);
        let ticket = self.done.begin();
        self.done.finish_after(ticket, self.action_duration);
    }

    async fn action_completed(&self) {
        self.done.wait().await;
    }
}

/// Fixed set of drops.
#[derive(Debug, Default)]
pub struct SimDrops {
    drops: Vec<Arc<SimDrop>>,
}

impl SimDrops {
    /// Wraps `drops`, in acting order.
    #[must_use]
    pub const fn new(drops: Vec<Arc<SimDrop>>) -> Self {
        Self { drops }
    }

    /// The drops.
    #[must_use]
    pub fn drops(&self) -> &[Arc<SimDrop>] {
        &self.drops
    }
}

impl DropSource for SimDrops {
    fn active_drops(&self) -> Vec<Arc<dyn DropEntity>> {
        self.drops
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn DropEntity>)
            .collect()
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Input blocker recording its level.
#[derive(Debug, Default)]
pub struct SimInput {
    blocked: AtomicBool,
    writes: AtomicU64,
}

impl SimInput {
    /// Whether input is currently force-blocked.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Number of set/clear calls.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl InputBlocker for SimInput {
    fn set_force_input_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opening stage recording every call.
#[derive(Debug)]
pub struct SimStage {
    enemy_spawns: bool,
    calls: Mutex<Vec<String>>,
}

impl SimStage {
    /// Creates a stage; `enemy_spawns == false` simulates a failed spawn.
    #[must_use]
    pub const fn new(enemy_spawns: bool) -> Self {
        Self {
            enemy_spawns,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: impl Into<String>) {
        let call = call.into();
        debug!(%call, "stage");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait::async_trait]
impl BattleStage for SimStage {
    async fn show_start_text(&self, battle_count: u32) {
        self.record(format!("start_text:{battle_count}"));
    }

    async fn spawn_players(&self) {
        self.record("spawn_players");
    }

    async fn spawn_enemies(&self) -> bool {
        self.record("spawn_enemies");
        self.enemy_spawns
    }

    async fn place_deck(&self) {
        self.record("place_deck");
    }

    async fn generate_puzzle(&self) {
        self.record("generate_puzzle");
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Shape of a simulated battle.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Grid rows.
    pub rows: usize,
    /// Grid columns.
    pub cols: usize,
    /// Enemy attack countdown.
    pub enemy_countdown: i32,
    /// Enemy attack duration; `None` never completes.
    pub enemy_attack: Option<Duration>,
    /// Player attack duration.
    pub player_attack: Duration,
    /// Duration of each skill.
    pub skill_duration: Duration,
    /// Number of drop entities.
    pub drops: usize,
    /// Turns between drop actions.
    pub drop_interval: u32,
    /// Drop action duration; `None` never completes.
    pub drop_action: Option<Duration>,
    /// Whether the enemy spawns during the opening.
    pub enemy_spawns: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 6,
            enemy_countdown: 2,
            enemy_attack: Some(Duration::from_millis(800)),
            player_attack: Duration::from_millis(600),
            skill_duration: Duration::from_millis(400),
            drops: 0,
            drop_interval: 2,
            drop_action: Some(Duration::from_millis(300)),
            enemy_spawns: true,
        }
    }
}

/// Every scripted collaborator of one battle.
#[derive(Debug, Clone)]
pub struct SimBattle {
    /// Puzzle grid.
    pub board: Arc<SimBoard>,
    /// Pending skills.
    pub skills: Arc<SimSkillQueue>,
    /// Player attack.
    pub player: Arc<SimPlayerAttack>,
    /// Enemy.
    pub enemy: Arc<SimEnemy>,
    /// Drop entities.
    pub drops: Arc<SimDrops>,
    /// Input blocker.
    pub input: Arc<SimInput>,
    /// Opening stage.
    pub stage: Arc<SimStage>,
}

impl SimBattle {
    /// Builds the collaborators described by `options`.
    #[must_use]
    pub fn new(options: &SimOptions) -> Self {
        let drops = (0..options.drops)
            .map(|i| {
                Arc::new(SimDrop::new(
                    format!("drop-{}", i + 1),
                    options.drop_interval,
                    options.drop_action,
                ))
            })
            .collect();
        Self {
            board: Arc::new(SimBoard::new(options.rows, options.cols)),
            skills: Arc::new(SimSkillQueue::new(options.skill_duration)),
            player: Arc::new(SimPlayerAttack::new(options.player_attack)),
            enemy: Arc::new(SimEnemy::new(options.enemy_countdown, options.enemy_attack)),
            drops: Arc::new(SimDrops::new(drops)),
            input: Arc::new(SimInput::default()),
            stage: Arc::new(SimStage::new(options.enemy_spawns)),
        }
    }

    /// The collaborators, ready to hand to the orchestrator builder.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::default()
            .with_matching(self.board.clone())
            .with_skills(self.skills.clone())
            .with_player_attack(self.player.clone())
            .with_enemy(self.enemy.clone())
            .with_drops(self.drops.clone())
            .with_input(self.input.clone())
            .with_stage(self.stage.clone())
    }
}
