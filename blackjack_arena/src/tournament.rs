use std::collections::HashSet;

use serde::Serialize;

use crate::{
    report::{BalanceRecord, Reporter},
    simulation::{deck::Deck, hand::Hand, Card, Outcome, RoundEventHandler, RoundResult, Table},
    strategy::Strategy,
    ArenaError, Decision, Rule, StrategyError,
};

pub struct Competitor {
    pub name: String,
    pub strategy: Box<dyn Strategy>,
}

impl Competitor {
    pub fn new(name: impl Into<String>, strategy: Box<dyn Strategy>) -> Self {
        Competitor {
            name: name.into(),
            strategy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TournamentConfig {
    pub rule: Rule,
    /// Hands each competitor plays unless it goes broke first.
    pub hands: u32,
    pub bet: u32,
    pub starting_balance: f64,
    /// With a seed every competitor gets its own deck shuffled from the same
    /// seed, so all of them face the same card sequence.
    pub seed: Option<u64>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            rule: Rule::default(),
            hands: 1000,
            bet: 10,
            starting_balance: 1000.0,
            seed: None,
        }
    }
}

impl TournamentConfig {
    pub fn validate(&self) -> Result<(), ArenaError> {
        self.rule.validate()?;
        if self.hands == 0 {
            return Err(ArenaError::InvalidConfig(String::from(
                "hands must be at least 1",
            )));
        }
        if self.bet == 0 {
            return Err(ArenaError::InvalidConfig(String::from(
                "bet must be a positive amount",
            )));
        }
        if !self.starting_balance.is_finite() || self.starting_balance <= 0.0 {
            return Err(ArenaError::InvalidConfig(format!(
                "starting_balance must be positive, got {}",
                self.starting_balance
            )));
        }
        if self.starting_balance < self.bet as f64 {
            return Err(ArenaError::InvalidConfig(format!(
                "starting_balance {} does not cover a bet of {}",
                self.starting_balance, self.bet
            )));
        }
        Ok(())
    }
}

/// Final record of one competitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub name: String,
    pub balance: f64,
    pub hands_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub blackjacks: u32,
    pub forfeits: u32,
    /// Index of the last hand played, 0 if none was.
    pub last_hand: u32,
    pub eliminated: bool,
}

impl Standing {
    fn new(name: &str, balance: f64) -> Self {
        Standing {
            name: name.to_string(),
            balance,
            hands_played: 0,
            wins: 0,
            losses: 0,
            pushes: 0,
            blackjacks: 0,
            forfeits: 0,
            last_hand: 0,
            eliminated: false,
        }
    }

    fn record(&mut self, hand_index: u32, result: &RoundResult) {
        self.balance += result.delta;
        self.hands_played += 1;
        self.last_hand = hand_index;
        if result.outcome.is_player_win() {
            self.wins += 1;
        } else if result.outcome.is_player_loss() {
            self.losses += 1;
        } else {
            self.pushes += 1;
        }
        if result.outcome == Outcome::PlayerBlackjack {
            self.blackjacks += 1;
        }
        if result.forfeited {
            self.forfeits += 1;
        }
    }
}

/// Standings sorted by final balance, best first. Ties keep seating order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Standings {
    entries: Vec<Standing>,
}

impl Standings {
    fn new(mut entries: Vec<Standing>) -> Self {
        entries.sort_by(|a, b| b.balance.total_cmp(&a.balance));
        Standings { entries }
    }

    pub fn entries(&self) -> &[Standing] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Standing> {
        self.entries.iter().find(|standing| standing.name == name)
    }

    pub fn leader(&self) -> Option<&Standing> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Seat {
    competitor: Competitor,
    table: Table,
    standing: Standing,
}

/// Balances and tables of every competitor. Only the tournament loop writes
/// to it.
struct BalanceSheet {
    seats: Vec<Seat>,
}

impl BalanceSheet {
    fn seat(config: &TournamentConfig, competitors: Vec<Competitor>) -> Result<Self, ArenaError> {
        let mut seats = Vec::with_capacity(competitors.len());
        for competitor in competitors {
            let deck = match config.seed {
                Some(seed) => Deck::with_seed(config.rule.number_of_decks, seed)?,
                None => Deck::new(config.rule.number_of_decks)?,
            };
            let table = Table::with_deck(&config.rule, deck)?;
            let standing = Standing::new(&competitor.name, config.starting_balance);
            seats.push(Seat {
                competitor,
                table,
                standing,
            });
        }
        Ok(BalanceSheet { seats })
    }

    fn into_standings(self) -> Standings {
        Standings::new(self.seats.into_iter().map(|seat| seat.standing).collect())
    }
}

/// Logs what happens at a table, tagged with the competitor's name.
struct TracingHandler<'a> {
    competitor: &'a str,
    hand_index: u32,
}

impl RoundEventHandler for TracingHandler<'_> {
    fn on_deal_cards(&mut self, player_hand: &Hand, dealer_up_card: Card) {
        tracing::trace!(
            competitor = self.competitor,
            hand = self.hand_index,
            player = %format_cards(player_hand.get_cards()),
            dealer_up_card = %dealer_up_card,
            "cards dealt"
        );
    }

    fn on_make_decision(&mut self, decision: Decision, player_hand: &Hand) {
        tracing::trace!(
            competitor = self.competitor,
            hand = self.hand_index,
            ?decision,
            total = player_hand.value().total,
            "decision"
        );
    }

    fn on_forfeit(&mut self, error: &StrategyError) {
        tracing::warn!(
            competitor = self.competitor,
            hand = self.hand_index,
            %error,
            "round forfeited"
        );
    }

    fn on_summary_round(&mut self, result: &RoundResult) {
        tracing::debug!(
            competitor = self.competitor,
            hand = self.hand_index,
            player = %format_cards(&result.player_cards),
            dealer = %format_cards(&result.dealer_cards),
            outcome = ?result.outcome,
            delta = result.delta,
            "round summary"
        );
    }
}

fn format_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|card| card.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs every competitor for the configured number of hands against its own
/// dealer.
pub struct Tournament {
    config: TournamentConfig,
    sheet: BalanceSheet,
}

impl Tournament {
    pub fn new(config: TournamentConfig, competitors: Vec<Competitor>) -> Result<Self, ArenaError> {
        config.validate()?;
        if competitors.is_empty() {
            return Err(ArenaError::InvalidConfig(String::from(
                "a tournament needs at least one competitor",
            )));
        }
        let mut names = HashSet::new();
        for competitor in &competitors {
            if competitor.name.trim().is_empty() {
                return Err(ArenaError::InvalidConfig(String::from(
                    "competitor names must not be empty",
                )));
            }
            if !names.insert(competitor.name.as_str()) {
                return Err(ArenaError::InvalidConfig(format!(
                    "competitor {} is registered twice",
                    competitor.name
                )));
            }
        }

        let sheet = BalanceSheet::seat(&config, competitors)?;
        Ok(Tournament { config, sheet })
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    /// Plays the whole tournament. Every competitor's starting balance is
    /// reported as hand 0, then one record per hand played. A competitor whose
    /// balance drops below the bet is eliminated and stops reporting; the
    /// tournament ends early once everybody is broke.
    pub fn run<R: Reporter + ?Sized>(mut self, reporter: &mut R) -> Result<Standings, ArenaError> {
        let TournamentConfig {
            hands,
            bet,
            seed,
            ..
        } = self.config;
        tracing::info!(
            competitors = self.sheet.seats.len(),
            hands,
            bet,
            ?seed,
            "tournament started"
        );

        for seat in &self.sheet.seats {
            reporter.report(&BalanceRecord {
                competitor: &seat.competitor.name,
                hand_index: 0,
                balance: seat.standing.balance,
            });
        }

        for hand_index in 1..=hands {
            for seat in self.sheet.seats.iter_mut() {
                if seat.standing.eliminated {
                    continue;
                }

                let mut handler = TracingHandler {
                    competitor: &seat.competitor.name,
                    hand_index,
                };
                let result = seat.table.play_round(
                    bet,
                    seat.standing.balance,
                    seat.competitor.strategy.as_mut(),
                    &mut handler,
                )?;
                seat.standing.record(hand_index, &result);

                reporter.report(&BalanceRecord {
                    competitor: &seat.competitor.name,
                    hand_index,
                    balance: seat.standing.balance,
                });

                if seat.standing.balance < bet as f64 {
                    seat.standing.eliminated = true;
                    tracing::info!(
                        competitor = %seat.competitor.name,
                        hand = hand_index,
                        balance = seat.standing.balance,
                        "competitor is broke and leaves the table"
                    );
                }
            }

            if self.sheet.seats.iter().all(|seat| seat.standing.eliminated) {
                tracing::info!(hand = hand_index, "every competitor is broke");
                break;
            }
        }

        let standings = self.sheet.into_standings();
        if let Some(leader) = standings.leader() {
            tracing::info!(
                leader = %leader.name,
                balance = leader.balance,
                "tournament finished"
            );
        }
        reporter.finish(&standings);
        Ok(standings)
    }
}
