//! Battle opening sequence.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{info, warn};
use turnward_core::BattlePhase;

use super::orchestrator::BattleOrchestrator;
use super::turn::AbandonReason;

/// How the opening ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningOutcome {
    /// The battle is in `BattleInProgress` and ready for the first turn.
    Ready,
    /// The enemy could not be created; the battle does not start.
    EnemySpawnFailed,
    /// The opening stopped part way.
    Abandoned(AbandonReason),
}

impl BattleOrchestrator {
    /// Plays the opening from `FadeOut` to `BattleInProgress`.
    ///
    /// A missing stage skips the staging calls but still walks the phases.
    pub async fn run_opening(self: &Arc<Self>) -> OpeningOutcome {
        match self.opening_steps().await {
            Ok(outcome) => outcome,
            Err(reason) => {
                warn!(%reason, "opening abandoned");
                OpeningOutcome::Abandoned(reason)
            }
        }
    }

    async fn opening_steps(self: &Arc<Self>) -> Result<OpeningOutcome, AbandonReason> {
        let config = &self.config.opening;
        let stage = self.collaborators.stage.as_ref();
        let epoch = self.register.epoch();
        if stage.is_none() {
            warn!("no battle stage, opening runs phases only");
        }

        self.stale_after(config.after_fade, epoch).await?;

        self.transition_step(BattlePhase::BattleStartText, epoch)?;
        if let Some(stage) = stage {
            stage.show_start_text(config.battle_count).await;
        }
        self.stale_after(config.after_start_text, epoch).await?;

        self.transition_step(BattlePhase::PlayerSpawn, epoch)?;
        if let Some(stage) = stage {
            stage.spawn_players().await;
        }
        self.stale_after(config.between_animations, epoch).await?;

        self.transition_step(BattlePhase::EnemySpawn, epoch)?;
        if let Some(stage) = stage {
            if !stage.spawn_enemies().await {
                warn!("enemy could not be spawned, battle not started");
                return Ok(OpeningOutcome::EnemySpawnFailed);
            }
        }
        self.stale_after(config.enemy_spawn_settle, epoch).await?;

        self.transition_step(BattlePhase::DeckPlacement, epoch)?;
        if let Some(stage) = stage {
            stage.place_deck().await;
        }

        self.transition_step(BattlePhase::PuzzleGenerating, epoch)?;
        self.set_input_blocked(true);
        if let Some(stage) = stage {
            stage.generate_puzzle().await;
        }

        if config.enemy_initial_skill {
            if let Some(enemy) = &self.collaborators.enemy {
                if !self.initial_skill_used.swap(true, Ordering::SeqCst) {
                    self.stale_after(config.initial_skill_lead, epoch).await?;
                    self.transition_step(BattlePhase::EnemySkill, epoch)?;
                    info!("enemy initial skill");
                    enemy.use_initial_skill().await;
                    self.ensure_current(epoch)?;
                }
            }
        }

        self.set_input_blocked(false);
        self.transition_step(BattlePhase::BattleInProgress, epoch)?;
        self.first_turn.store(true, Ordering::SeqCst);
        info!(battle = config.battle_count, "battle ready");
        Ok(OpeningOutcome::Ready)
    }
}
