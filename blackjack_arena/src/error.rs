use thiserror::Error;

use crate::simulation::GamePhase;
use crate::Decision;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArenaError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{operation} is only allowed in {expected:?} phase (current phase: {actual:?})")]
    WrongPhase {
        operation: &'static str,
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("double down is only allowed on the first two cards when the rule permits it")]
    DoubleDownNotAllowed,
    #[error("invalid card index {0}, it must be in [0, 52)")]
    InvalidCard(u8),
}

/// Why a strategy failed to produce a usable decision. The round engine turns
/// any of these into a forfeited round instead of propagating it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    #[error("strategy failed: {0}")]
    Failed(String),
    #[error("strategy panicked: {0}")]
    Panicked(String),
    #[error("illegal decision {0:?} for the current hand")]
    IllegalDecision(Decision),
}
