//! Enemy resolution.
//!
//! Runs inside `EnemyAttack`: the enemy's countdown and attack, then each
//! drop entity's end-of-turn action, then the return to
//! `BattleInProgress`. Every completion wait is bounded; a collaborator
//! that never signals costs its timeout and nothing more.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::time::timeout;
use tracing::{debug, info, warn};
use turnward_core::BattlePhase;

use super::orchestrator::BattleOrchestrator;
use super::turn::AbandonReason;

impl BattleOrchestrator {
    /// Resolves the enemy's turn and returns to `BattleInProgress`.
    ///
    /// # Errors
    ///
    /// Returns [`AbandonReason::Stale`] when the epoch captured by the
    /// caller moved meanwhile, and [`AbandonReason::Denied`] if the final
    /// transition was refused.
    pub(crate) async fn resolve_enemy_attack(
        self: &Arc<Self>,
        epoch: u64,
    ) -> Result<(), AbandonReason> {
        let config = &self.config.enemy;

        match &self.collaborators.enemy {
            Some(enemy) => {
                if self.first_turn.swap(false, Ordering::SeqCst) {
                    debug!("first turn, enemy countdown unchanged");
                } else {
                    enemy.decrement_turn_counter();
                }
                self.stale_after(config.between_animations, epoch).await?;

                if enemy.is_taking_damage() {
                    if timeout(config.damage_wait_timeout, enemy.damage_animation_completed())
                        .await
                        .is_err()
                    {
                        warn!(
                            timeout = ?config.damage_wait_timeout,
                            "damage animation did not complete"
                        );
                    }
                    self.stale_after(config.damage_settle, epoch).await?;
                }
                self.mark_turn_progress();

                let counter = enemy.turn_counter();
                if counter <= 0 {
                    self.stale_after(config.pre_attack_delay, epoch).await?;
                    self.mark_turn_progress();
                    self.transition_step(BattlePhase::EnemyAttack, epoch)?;

                    info!(counter, "enemy attacks");
                    enemy.attack();
                    if timeout(config.attack_timeout, enemy.attack_completed())
                        .await
                        .is_err()
                    {
                        warn!(timeout = ?config.attack_timeout, "enemy attack did not complete");
                    }
                    self.mark_turn_progress();
                    self.stale_after(config.between_animations, epoch).await?;
                    self.mark_turn_progress();
                } else {
                    debug!(counter, "enemy waits");
                }
            }
            None => {
                self.first_turn.store(false, Ordering::SeqCst);
                warn!("no enemy, skipping enemy action");
            }
        }

        // Every drop advances its countdown before any of them acts.
        let drops = self
            .collaborators
            .drops
            .as_ref()
            .map(|source| source.active_drops())
            .unwrap_or_default();
        let ready: Vec<_> = drops
            .into_iter()
            .filter(|entity| entity.process_turn_end())
            .collect();

        for entity in ready {
            let name = entity.name();
            debug!(drop = %name, "drop acts");
            entity.execute_action_and_reset();
            if timeout(config.drop_action_timeout, entity.action_completed())
                .await
                .is_err()
            {
                warn!(drop = %name, "drop action did not complete");
            }
            self.stale_after(config.drop_action_interval, epoch).await?;
            self.mark_turn_progress();
        }

        self.transition_step(BattlePhase::BattleInProgress, epoch)
    }
}
