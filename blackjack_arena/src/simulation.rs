pub mod deck;
pub mod hand;

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::{
    strategy::{PlayerView, Strategy},
    ArenaError, Decision, Rule, StrategyError,
};
use blackjack_arena_macros::allowed_phase;
use strum_macros::EnumIter;

use self::{
    deck::Deck,
    hand::{Hand, HandValue},
};

static FACE_VALUE_TO_BLACKJACK_VALUE: [u8; 13] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Suit {
    Diamond = 0,
    Club,
    Heart,
    Spade,
}

/// Represents a card in the real world with a suit and a face value
/// (1 for Ace, 11 to 13 for Jack, Queen and King). Only `Card::new` and
/// `TryFrom<u8>` build one, so the face value is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    face_value: u8,
    suit: Suit,
}

impl Card {
    pub fn new(face_value: u8, suit: Suit) -> Card {
        assert!(
            (1..=13).contains(&face_value),
            "Invalid card face value! It must be in [1, 13]"
        );
        Card { face_value, suit }
    }

    pub fn face_value(&self) -> u8 {
        self.face_value
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    /// Ace counts as 1 here; the hand evaluator decides when it is worth 11.
    pub fn blackjack_value(&self) -> u8 {
        FACE_VALUE_TO_BLACKJACK_VALUE[(self.face_value - 1) as usize]
    }

    pub fn is_ace(&self) -> bool {
        self.face_value == 1
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self.face_value {
            1 => 'A',
            10 => 'T',
            11 => 'J',
            12 => 'Q',
            13 => 'K',
            n => char::from(b'0' + n),
        };
        let suit = match self.suit {
            Suit::Diamond => 'D',
            Suit::Club => 'C',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        };
        write!(f, "{}{}", value, suit)
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> u8 {
        card.suit as u8 * 13 + card.face_value - 1
    }
}

impl TryFrom<u8> for Card {
    type Error = ArenaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let suit = match value / 13 {
            0 => Suit::Diamond,
            1 => Suit::Club,
            2 => Suit::Heart,
            3 => Suit::Spade,
            _ => return Err(ArenaError::InvalidCard(value)),
        };
        Ok(Card {
            suit,
            face_value: value % 13 + 1,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    WaitForBet,
    DealInitialCards,
    PlayerTurn,
    DealerTurn,
    Resolved,
}

/// How a round ended, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Outcome {
    PlayerBust,
    DealerBust,
    PlayerBlackjack,
    DealerBlackjack,
    PlayerHigher,
    DealerHigher,
    Push,
}

impl Outcome {
    /// Signed change of the player's balance for a round staked with `bet`.
    /// A blackjack pays `payout_blackjack * bet` exactly, fractions included.
    pub fn balance_delta(&self, bet: u32, rule: &Rule) -> f64 {
        let bet = bet as f64;
        match self {
            Outcome::PlayerBlackjack => bet * rule.payout_blackjack,
            Outcome::DealerBust | Outcome::PlayerHigher => bet,
            Outcome::Push => 0.0,
            Outcome::PlayerBust | Outcome::DealerHigher | Outcome::DealerBlackjack => -bet,
        }
    }

    pub fn is_player_win(&self) -> bool {
        matches!(
            self,
            Outcome::PlayerBlackjack | Outcome::DealerBust | Outcome::PlayerHigher
        )
    }

    pub fn is_player_loss(&self) -> bool {
        matches!(
            self,
            Outcome::PlayerBust | Outcome::DealerHigher | Outcome::DealerBlackjack
        )
    }
}

/// Dealer draws below 17, and on soft 17 when the house hits soft 17.
pub fn dealer_must_draw(value: HandValue, rule: &Rule) -> bool {
    value.total < 17 || (value.total == 17 && value.is_soft() && rule.dealer_hit_on_soft17)
}

/// Everything worth knowing about a resolved round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub player_cards: Vec<Card>,
    pub dealer_cards: Vec<Card>,
    pub player_value: u16,
    pub dealer_value: u16,
    pub outcome: Outcome,
    /// The amount actually staked, doubled after a double down.
    pub bet: u32,
    pub delta: f64,
    /// Set when the strategy failed, panicked or made an illegal decision.
    pub forfeited: bool,
}

/// Callbacks fired while `Table::play_round` runs. Every method defaults to
/// doing nothing.
pub trait RoundEventHandler {
    fn on_deal_cards(&mut self, _player_hand: &Hand, _dealer_up_card: Card) {}
    fn on_make_decision(&mut self, _decision: Decision, _player_hand: &Hand) {}
    fn on_player_bust(&mut self, _player_hand: &Hand) {}
    fn on_forfeit(&mut self, _error: &StrategyError) {}
    fn on_dealer_done(&mut self, _dealer_hand: &Hand) {}
    fn on_summary_round(&mut self, _result: &RoundResult) {}
}

impl RoundEventHandler for () {}

#[derive(Debug, Clone, Copy)]
enum DeckEvent {
    Shuffled,
    Drawn(Card),
}

/// A blackjack table seating one player against the dealer.
///
/// A round walks through `WaitForBet -> DealInitialCards -> PlayerTurn ->
/// DealerTurn -> Resolved` and back to `WaitForBet`. Naturals skip straight
/// from the deal to `Resolved`, and so does a player bust.
pub struct Table {
    rule: Rule,
    deck: Deck,

    // Round state
    current_game_phase: GamePhase,
    player_hand: Hand,
    dealer_hand: Hand,
    bet: u32,
    outcome: Option<Outcome>,
    forfeited: bool,
    // Set once the hole card was announced, or once the deck it came from
    // was reshuffled so it must not be counted against the new one.
    hole_card_settled: bool,

    // Cards the player has been able to see and not yet been told about.
    deck_events: Vec<DeckEvent>,
}

impl Table {
    pub fn new(rule: &Rule) -> Result<Self, ArenaError> {
        rule.validate()?;
        let deck = Deck::new(rule.number_of_decks)?;
        Self::with_deck(rule, deck)
    }

    /// Seats the table with a prepared deck, e.g. a seeded or stacked one.
    pub fn with_deck(rule: &Rule, deck: Deck) -> Result<Self, ArenaError> {
        rule.validate()?;
        Ok(Self {
            rule: *rule,
            deck,
            current_game_phase: GamePhase::WaitForBet,
            player_hand: Hand::new(),
            dealer_hand: Hand::new(),
            bet: 0,
            outcome: None,
            forfeited: false,
            hole_card_settled: false,
            deck_events: Vec::new(),
        })
    }

    /// Plays one whole round for `strategy` staking `bet`. `balance` is only
    /// shown to the strategy; the caller owns the balance and applies
    /// `RoundResult::delta` itself.
    ///
    /// A strategy that fails, panics or asks for an illegal decision forfeits
    /// the round as a player bust. Errors are only returned for misuse of the
    /// table itself.
    #[allowed_phase(WaitForBet)]
    pub fn play_round<T: Strategy + ?Sized, U: RoundEventHandler + ?Sized>(
        &mut self,
        bet: u32,
        balance: f64,
        strategy: &mut T,
        handler: &mut U,
    ) -> Result<RoundResult, ArenaError> {
        self.place_bet(bet)?;
        self.deal_initial_cards()?;
        handler.on_deal_cards(&self.player_hand, self.up_card());
        self.announce_deck_events(strategy);

        if self.current_game_phase == GamePhase::PlayerTurn {
            self.loop_make_decisions(balance, strategy, handler)?;
        }

        if self.current_game_phase == GamePhase::DealerTurn {
            self.dealer_plays()?;
            handler.on_dealer_done(&self.dealer_hand);
        }

        let result = self.finish_round()?;
        self.announce_deck_events(strategy);
        guard_hook("on_round_end", || strategy.on_round_end(&result));
        handler.on_summary_round(&result);
        Ok(result)
    }

    /// Can be called at WaitForBet phase.
    #[allowed_phase(WaitForBet)]
    pub fn place_bet(&mut self, bet: u32) -> Result<(), ArenaError> {
        if bet == 0 {
            return Err(ArenaError::InvalidConfig(String::from(
                "bet must be a positive amount",
            )));
        }
        self.bet = bet;
        self.current_game_phase = GamePhase::DealInitialCards;
        Ok(())
    }

    /// Can be called at DealInitialCards phase.
    /// Deals player, dealer, player, dealer; the dealer's second card stays
    /// face down. If anybody holds a natural the round is resolved at once.
    #[allowed_phase(DealInitialCards)]
    pub fn deal_initial_cards(&mut self) -> Result<(), ArenaError> {
        let card = self.draw_visible();
        self.player_hand.receive_card(card);
        let card = self.draw_visible();
        self.dealer_hand.receive_card(card);
        let card = self.draw_visible();
        self.player_hand.receive_card(card);
        let card = self.deck_draw();
        self.dealer_hand.receive_card(card);

        let natural = match (
            self.player_hand.is_blackjack(),
            self.dealer_hand.is_blackjack(),
        ) {
            (true, true) => Some(Outcome::Push),
            (true, false) => Some(Outcome::PlayerBlackjack),
            (false, true) => Some(Outcome::DealerBlackjack),
            (false, false) => None,
        };

        match natural {
            Some(outcome) => {
                self.reveal_hole_card();
                self.resolve(outcome);
            }
            None => self.current_game_phase = GamePhase::PlayerTurn,
        }
        Ok(())
    }

    /// Can be called at PlayerTurn phase.
    /// Returns true if the player cannot act any more.
    #[allowed_phase(PlayerTurn)]
    pub fn play_hit(&mut self) -> Result<bool, ArenaError> {
        let card = self.draw_visible();
        self.player_hand.receive_card(card);
        if self.player_hand.is_bust() {
            self.resolve(Outcome::PlayerBust);
            return Ok(true);
        }
        Ok(false)
    }

    /// Can be called at PlayerTurn phase.
    /// Returns true if the player cannot act any more.
    #[allowed_phase(PlayerTurn)]
    pub fn play_stand(&mut self) -> Result<bool, ArenaError> {
        self.current_game_phase = GamePhase::DealerTurn;
        Ok(true)
    }

    /// Can be called at PlayerTurn phase.
    /// Returns true if the player cannot act any more.
    #[allowed_phase(PlayerTurn)]
    pub fn play_double_down(&mut self) -> Result<bool, ArenaError> {
        if !self.can_double_down() {
            return Err(ArenaError::DoubleDownNotAllowed);
        }
        self.bet *= 2;
        let card = self.draw_visible();
        self.player_hand.receive_card(card);
        if self.player_hand.is_bust() {
            self.resolve(Outcome::PlayerBust);
        } else {
            self.current_game_phase = GamePhase::DealerTurn;
        }
        Ok(true)
    }

    /// Can be called at PlayerTurn phase.
    /// Ends the round as a player bust because the strategy misbehaved.
    #[allowed_phase(PlayerTurn)]
    pub fn forfeit(&mut self, error: &StrategyError) -> Result<(), ArenaError> {
        tracing::debug!(%error, "strategy forfeits the round");
        self.forfeited = true;
        self.resolve(Outcome::PlayerBust);
        Ok(())
    }

    /// Can be called at DealerTurn phase.
    /// Dealer reveals the hole card and draws according to the rule.
    #[allowed_phase(DealerTurn)]
    pub fn dealer_plays(&mut self) -> Result<Outcome, ArenaError> {
        self.reveal_hole_card();
        while dealer_must_draw(self.dealer_hand.value(), &self.rule) {
            let card = self.draw_visible();
            self.dealer_hand.receive_card(card);
        }

        let dealer_total = self.dealer_hand.value().total;
        let player_total = self.player_hand.value().total;
        let outcome = if dealer_total > 21 {
            Outcome::DealerBust
        } else if player_total > dealer_total {
            Outcome::PlayerHigher
        } else if player_total < dealer_total {
            Outcome::DealerHigher
        } else {
            Outcome::Push
        };
        self.resolve(outcome);
        Ok(outcome)
    }

    /// Can be called at Resolved phase.
    /// Summarizes the round and clears the table for the next bet.
    #[allowed_phase(Resolved)]
    pub fn finish_round(&mut self) -> Result<RoundResult, ArenaError> {
        let Some(outcome) = self.outcome.take() else {
            return Err(ArenaError::WrongPhase {
                operation: "finish_round",
                expected: GamePhase::Resolved,
                actual: self.current_game_phase,
            });
        };
        self.reveal_hole_card();

        let result = RoundResult {
            player_cards: self.player_hand.get_cards().to_vec(),
            dealer_cards: self.dealer_hand.get_cards().to_vec(),
            player_value: self.player_hand.value().total,
            dealer_value: self.dealer_hand.value().total,
            outcome,
            bet: self.bet,
            delta: outcome.balance_delta(self.bet, &self.rule),
            forfeited: self.forfeited,
        };
        tracing::debug!(
            outcome = ?result.outcome,
            player_value = result.player_value,
            dealer_value = result.dealer_value,
            delta = result.delta,
            "round resolved"
        );

        self.new_round();
        Ok(result)
    }

    pub fn get_phase(&self) -> GamePhase {
        self.current_game_phase
    }

    pub fn get_rule(&self) -> &Rule {
        &self.rule
    }

    pub fn get_deck(&self) -> &Deck {
        &self.deck
    }

    pub fn get_player_hand(&self) -> &Hand {
        &self.player_hand
    }

    /// The dealer's visible card, once dealt.
    pub fn dealer_up_card(&self) -> Option<Card> {
        self.dealer_hand.get_cards().first().copied()
    }

    pub fn can_double_down(&self) -> bool {
        self.rule.allow_double_down && self.player_hand.len() == 2
    }

    fn up_card(&self) -> Card {
        self.dealer_hand.get_cards()[0]
    }

    fn loop_make_decisions<T: Strategy + ?Sized, U: RoundEventHandler + ?Sized>(
        &mut self,
        balance: f64,
        strategy: &mut T,
        handler: &mut U,
    ) -> Result<(), ArenaError> {
        loop {
            let view = PlayerView {
                hand: &self.player_hand,
                value: self.player_hand.value(),
                dealer_up_card: self.up_card(),
                balance,
                bet: self.bet,
                can_double_down: self.can_double_down(),
                cards_remaining: self.deck.remaining(),
                rule: &self.rule,
            };
            let decision = match ask_strategy(strategy, &view) {
                Ok(Decision::DoubleDown) if !view.can_double_down => {
                    Err(StrategyError::IllegalDecision(Decision::DoubleDown))
                }
                other => other,
            };
            let decision = match decision {
                Ok(decision) => decision,
                Err(error) => {
                    handler.on_forfeit(&error);
                    return self.forfeit(&error);
                }
            };

            handler.on_make_decision(decision, &self.player_hand);
            let finished = match decision {
                Decision::Hit => self.play_hit()?,
                Decision::Stand => self.play_stand()?,
                Decision::DoubleDown => self.play_double_down()?,
            };
            self.announce_deck_events(strategy);
            if self.player_hand.is_bust() {
                handler.on_player_bust(&self.player_hand);
            }

            if finished {
                return Ok(());
            }
        }
    }

    fn resolve(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.current_game_phase = GamePhase::Resolved;
    }

    fn reveal_hole_card(&mut self) {
        if self.hole_card_settled {
            return;
        }
        self.hole_card_settled = true;
        if let Some(&hole_card) = self.dealer_hand.get_cards().get(1) {
            self.deck_events.push(DeckEvent::Drawn(hole_card));
        }
    }

    fn deck_draw(&mut self) -> Card {
        if self.deck.is_exhausted() {
            self.deck_events.push(DeckEvent::Shuffled);
            if self.dealer_hand.len() >= 2 {
                self.hole_card_settled = true;
            }
        }
        self.deck.draw()
    }

    fn draw_visible(&mut self) -> Card {
        let card = self.deck_draw();
        self.deck_events.push(DeckEvent::Drawn(card));
        card
    }

    fn announce_deck_events<T: Strategy + ?Sized>(&mut self, strategy: &mut T) {
        let events = std::mem::take(&mut self.deck_events);
        guard_hook("on_card_drawn", || {
            for event in events {
                match event {
                    DeckEvent::Shuffled => strategy.on_shuffle(),
                    DeckEvent::Drawn(card) => strategy.on_card_drawn(card),
                }
            }
        });
    }

    fn new_round(&mut self) {
        self.player_hand.clear();
        self.dealer_hand.clear();
        self.bet = 0;
        self.outcome = None;
        self.forfeited = false;
        self.hole_card_settled = false;
        self.current_game_phase = GamePhase::WaitForBet;
    }
}

thread_local! {
    static SILENCE_PANICS: Cell<bool> = Cell::new(false);
}

static INSTALL_PANIC_HOOK: Once = Once::new();

/// Runs strategy code, catching a panic without letting the panic hook print
/// it. Panics anywhere else still reach the previous hook.
fn catch_strategy_panic<R, F: FnOnce() -> R>(f: F) -> Result<R, Box<dyn Any + Send>> {
    INSTALL_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !SILENCE_PANICS.with(Cell::get) {
                previous(info);
            }
        }));
    });

    SILENCE_PANICS.with(|silence| silence.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    SILENCE_PANICS.with(|silence| silence.set(false));
    result
}

fn ask_strategy<T: Strategy + ?Sized>(
    strategy: &mut T,
    view: &PlayerView<'_>,
) -> Result<Decision, StrategyError> {
    match catch_strategy_panic(|| strategy.decide(view)) {
        Ok(decision) => decision,
        Err(payload) => Err(StrategyError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Runs a strategy observation hook; a panic inside it is logged and dropped.
fn guard_hook<F: FnOnce()>(hook: &str, f: F) {
    if let Err(payload) = catch_strategy_panic(f) {
        tracing::warn!(
            hook,
            reason = %panic_message(payload.as_ref()),
            "strategy panicked in hook"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic")
    }
}
