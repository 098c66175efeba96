pub mod report;
pub mod simulation;
pub mod strategy;
pub mod tournament;

mod error;

pub use error::{ArenaError, StrategyError};
pub use report::{BalanceRecord, HistoryReporter, Reporter};
pub use simulation::{hand::HandValue, Card, GamePhase, Outcome, RoundResult, Table};
pub use strategy::{PlayerView, Strategy, StrategyKind};
pub use tournament::{Competitor, Standing, Standings, Tournament, TournamentConfig};

/// House rules shared by every table of a tournament.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub allow_double_down: bool,

    pub payout_blackjack: f64,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            number_of_decks: 1,
            dealer_hit_on_soft17: true,
            allow_double_down: true,
            payout_blackjack: 1.5,
        }
    }
}

impl Rule {
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.number_of_decks == 0 {
            return Err(ArenaError::InvalidConfig(String::from(
                "number_of_decks must be at least 1",
            )));
        }
        if !self.payout_blackjack.is_finite() || self.payout_blackjack <= 0.0 {
            return Err(ArenaError::InvalidConfig(format!(
                "payout_blackjack must be a positive number, got {}",
                self.payout_blackjack
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Hit,
    Stand,
    /// Doubles the bet, takes exactly one more card and ends the turn.
    /// Only legal on the first two cards and when the rule allows it.
    DoubleDown,
}
