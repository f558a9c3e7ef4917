//! Collaborator interfaces.
//!
//! The orchestrator drives animation, matching and skill execution
//! through these traits and owns none of their state. Each collaborator
//! offers a way to start it, a busy predicate, and a completion future.
//!
//! Completion futures must be level-triggered: a completion that happened
//! after the action was started but before the future was first polled
//! still resolves it. The orchestrator bounds every completion wait with
//! `tokio::time::timeout` and drops the future on expiry, which is the
//! unsubscribe.

use std::sync::Arc;

/// Identifier of an item occupying a grid cell.
pub type ItemId = u32;

// ============================================================================
// Puzzle board
// ============================================================================

/// Puzzle matching engine.
///
/// Its "match process completed" signal is delivered to the orchestrator
/// as [`BattleEvent::MatchCompleted`](crate::battle::BattleEvent).
pub trait MatchingEngine: Send + Sync {
    /// Whether a match resolution is still running.
    fn is_matching_in_progress(&self) -> bool;

    /// Grid size as `(rows, cols)`.
    fn grid_dimensions(&self) -> (usize, usize);

    /// Item in the given cell, `None` when the cell is empty.
    fn cell_contents(&self, row: usize, col: usize) -> Option<ItemId>;

    /// Resets the engine's "removed items" counter after an attack.
    fn clear_removed_count(&self);
}

/// Whether the board still has an empty cell waiting to be refilled.
pub fn grid_filling_in_progress(engine: &dyn MatchingEngine) -> bool {
    let (rows, cols) = engine.grid_dimensions();
    (0..rows).any(|r| (0..cols).any(|c| engine.cell_contents(r, c).is_none()))
}

/// Whether the board is settled: no match resolving and no empty cell.
pub fn board_idle(engine: &dyn MatchingEngine) -> bool {
    !engine.is_matching_in_progress() && !grid_filling_in_progress(engine)
}

// ============================================================================
// Skills and attacks
// ============================================================================

/// Queue of skills reserved during the player's move.
#[async_trait::async_trait]
pub trait SkillQueue: Send + Sync {
    /// Whether any skill is waiting to be executed.
    fn has_pending_skills(&self) -> bool;

    /// Executes every pending skill, resolving when all have finished.
    async fn execute_all_pending_skills(&self);
}

/// Player attack resolution.
#[async_trait::async_trait]
pub trait PlayerAttack: Send + Sync {
    /// Runs the matched characters' attacks, resolving when they finish.
    ///
    /// The orchestrator does not bound this wait.
    async fn execute_attack_and_wait(&self);
}

/// The main enemy.
#[async_trait::async_trait]
pub trait Enemy: Send + Sync {
    /// Decrements the attack countdown by one.
    fn decrement_turn_counter(&self);

    /// Current attack countdown; the enemy attacks at zero or below.
    fn turn_counter(&self) -> i32;

    /// Whether the damage animation is still playing.
    fn is_taking_damage(&self) -> bool;

    /// Resolves once the damage animation has completed.
    async fn damage_animation_completed(&self);

    /// Starts the attack.
    fn attack(&self);

    /// Resolves once the attack started by [`attack`](Self::attack) has
    /// completed.
    async fn attack_completed(&self);

    /// Runs the enemy's opening skill.
    async fn use_initial_skill(&self);
}

/// An enemy-spawned entity acting at the end of each enemy turn.
#[async_trait::async_trait]
pub trait DropEntity: Send + Sync {
    /// Name for logs.
    fn name(&self) -> String;

    /// Advances the entity's own countdown; `true` when it should act now.
    fn process_turn_end(&self) -> bool;

    /// Starts the action and resets the countdown.
    fn execute_action_and_reset(&self);

    /// Resolves once the action has completed.
    async fn action_completed(&self);
}

/// Enumerates the drop entities active on the board.
pub trait DropSource: Send + Sync {
    /// Active drops, in acting order.
    fn active_drops(&self) -> Vec<Arc<dyn DropEntity>>;
}

// ============================================================================
// Presentation
// ============================================================================

/// Shared forced input block.
///
/// Level-triggered: setting the same value twice is harmless and every
/// caller may set or clear it unconditionally.
pub trait InputBlocker: Send + Sync {
    /// Sets or clears the forced block.
    fn set_force_input_blocked(&self, blocked: bool);
}

/// Staging for the battle opening.
#[async_trait::async_trait]
pub trait BattleStage: Send + Sync {
    /// Shows the "Battle N Start" banner.
    async fn show_start_text(&self, battle_count: u32);

    /// Places the player characters.
    async fn spawn_players(&self);

    /// Places the enemies; `false` when the enemy could not be created.
    async fn spawn_enemies(&self) -> bool;

    /// Places the deck.
    async fn place_deck(&self);

    /// Generates the puzzle grid.
    async fn generate_puzzle(&self);
}

// ============================================================================
// Injection
// ============================================================================

/// Collaborators injected at construction.
///
/// A missing collaborator is a soft failure: the steps that need it are
/// skipped with a warning.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Puzzle matching engine.
    pub matching: Option<Arc<dyn MatchingEngine>>,
    /// Pending skill queue.
    pub skills: Option<Arc<dyn SkillQueue>>,
    /// Player attack resolution.
    pub player_attack: Option<Arc<dyn PlayerAttack>>,
    /// Main enemy.
    pub enemy: Option<Arc<dyn Enemy>>,
    /// Drop entities.
    pub drops: Option<Arc<dyn DropSource>>,
    /// Forced input block.
    pub input: Option<Arc<dyn InputBlocker>>,
    /// Opening staging.
    pub stage: Option<Arc<dyn BattleStage>>,
}

impl Collaborators {
    /// Sets the matching engine.
    #[must_use]
    pub fn with_matching(mut self, matching: Arc<dyn MatchingEngine>) -> Self {
        self.matching = Some(matching);
        self
    }

    /// Sets the skill queue.
    #[must_use]
    pub fn with_skills(mut self, skills: Arc<dyn SkillQueue>) -> Self {
        self.skills = Some(skills);
        self
    }

    /// Sets the player attack.
    #[must_use]
    pub fn with_player_attack(mut self, player_attack: Arc<dyn PlayerAttack>) -> Self {
        self.player_attack = Some(player_attack);
        self
    }

    /// Sets the enemy.
    #[must_use]
    pub fn with_enemy(mut self, enemy: Arc<dyn Enemy>) -> Self {
        self.enemy = Some(enemy);
        self
    }

    /// Sets the drop source.
    #[must_use]
    pub fn with_drops(mut self, drops: Arc<dyn DropSource>) -> Self {
        self.drops = Some(drops);
        self
    }

    /// Sets the input blocker.
    #[must_use]
    pub fn with_input(mut self, input: Arc<dyn InputBlocker>) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets the opening stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn BattleStage>) -> Self {
        self.stage = Some(stage);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("matching", &self.matching.is_some())
            .field("skills", &self.skills.is_some())
            .field("player_attack", &self.player_attack.is_some())
            .field("enemy", &self.enemy.is_some())
            .field("drops", &self.drops.is_some())
            .field("input", &self.input.is_some())
            .field("stage", &self.stage.is_some())
            .finish()
    }
}
