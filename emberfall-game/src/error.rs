//! Outcome errors surfaced to hosts.
use std::fmt;
use thiserror::Error;

use crate::catalog::{SkillId, StageId};
use crate::save::SaveError;

/// Which resource check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    Stamina { needed: u32, available: u32 },
    Gold { needed: u64, available: u64 },
    Gems { needed: u64, available: u64 },
    NotOwned { item: String },
    AlreadyOwned { item: String },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stamina { needed, available } => {
                write!(f, "stamina (need {needed}, have {available})")
            }
            Self::Gold { needed, available } => write!(f, "gold (need {needed}, have {available})"),
            Self::Gems { needed, available } => write!(f, "gems (need {needed}, have {available})"),
            Self::NotOwned { item } => write!(f, "ownership of {item}"),
            Self::AlreadyOwned { item } => write!(f, "{item} is already owned"),
        }
    }
}

/// Why an action or request was rejected without changing state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown skill {0}")]
    UnknownSkill(SkillId),
    #[error("skill {0} is not available to this character")]
    SkillUnavailable(SkillId),
    #[error("skill {skill} is cooling down ({remaining} turns left)")]
    OnCooldown { skill: SkillId, remaining: u32 },
    #[error("it is not the player's turn")]
    NotPlayerTurn,
    #[error("it is not the enemy's turn")]
    NotEnemyTurn,
    #[error("the battle is already over")]
    BattleOver,
    #[error("the battle has not finished")]
    BattleNotFinished,
    #[error("the battle has already been committed")]
    AlreadyCommitted,
    #[error("stage {0} does not exist")]
    UnknownStage(StageId),
    #[error("stage {0} is locked")]
    StageLocked(StageId),
    #[error("unknown catalogue item {0}")]
    UnknownItem(String),
}

/// Error kinds returned by the engine facade.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("insufficient {0}")]
    InsufficientResource(Shortfall),
    #[error("invalid action: {0}")]
    InvalidAction(#[from] ActionError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

impl GameError {
    /// Whether the error left the snapshot untouched and can be retried as-is.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::InsufficientResource(_) | Self::InvalidAction(_))
    }
}

impl From<Shortfall> for GameError {
    fn from(value: Shortfall) -> Self {
        Self::InsufficientResource(value)
    }
}
