//! Static transition table.
//!
//! A pure, total function over the 13×13 phase space. Any pair that is
//! not one of the fixed edges below is denied; there is no permissive
//! fallback for unlisted pairs.

use thiserror::Error;

use crate::phase::BattlePhase;

/// Why a requested transition was refused.
///
/// Denial is an ordinary outcome handed back to the caller, never a
/// fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transition {from} -> {to} denied: {reason}")]
pub struct TransitionDenied {
    /// Phase the register was in.
    pub from: BattlePhase,
    /// Phase that was requested.
    pub to: BattlePhase,
    /// Classification of the denial.
    pub reason: DenialReason,
}

/// Classification of a [`TransitionDenied`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// `to` is not a legal successor of `from`.
    NotAnEdge,
    /// The runtime is passive because another system owns the battle.
    Passive,
}

impl DenialReason {
    /// Stable name for logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotAnEdge => "not_an_edge",
            Self::Passive => "passive",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the legal successors of `from`.
#[must_use]
pub const fn legal_targets(from: BattlePhase) -> &'static [BattlePhase] {
    use BattlePhase::{
        BattleInProgress, BattleStartText, DeckPlacement, EnemyAttack, EnemySkill, EnemySpawn,
        FadeOut, PlayerAttack, PlayerSpawn, PuzzleGenerating, PuzzleMatching, SkillAfterProcess,
        SkillAnimation,
    };

    match from {
        FadeOut => &[BattleStartText],
        BattleStartText => &[PlayerSpawn],
        PlayerSpawn => &[EnemySpawn],
        EnemySpawn => &[DeckPlacement],
        DeckPlacement => &[PuzzleGenerating],
        PuzzleGenerating => &[EnemySkill, BattleInProgress],
        PuzzleMatching => &[PlayerAttack, EnemyAttack],
        PlayerAttack => &[SkillAnimation, EnemyAttack],
        EnemyAttack | EnemySkill => &[BattleInProgress],
        SkillAnimation => &[SkillAfterProcess],
        SkillAfterProcess => &[SkillAnimation, EnemyAttack],
        BattleInProgress => &[PuzzleMatching, SkillAnimation],
    }
}

/// Whether `from -> to` is one of the fixed edges.
///
/// Self-pairs are not edges; [`apply`] handles them as a no-op.
#[must_use]
pub fn can_transition(from: BattlePhase, to: BattlePhase) -> bool {
    legal_targets(from).contains(&to)
}

/// Validates `from -> to` and returns the phase the register should hold.
///
/// Requesting the current phase succeeds and returns it unchanged.
///
/// # Errors
///
/// Returns [`TransitionDenied`] with [`DenialReason::NotAnEdge`] when
/// the pair is not in the table.
pub fn apply(from: BattlePhase, to: BattlePhase) -> Result<BattlePhase, TransitionDenied> {
    if from == to || can_transition(from, to) {
        Ok(to)
    } else {
        Err(TransitionDenied {
            from,
            to,
            reason: DenialReason::NotAnEdge,
        })
    }
}

/// Every legal edge, in ordinal order of the source phase.
#[must_use]
pub fn edges() -> Vec<(BattlePhase, BattlePhase)> {
    BattlePhase::ALL
        .iter()
        .flat_map(|&from| legal_targets(from).iter().map(move |&to| (from, to)))
        .collect()
}
