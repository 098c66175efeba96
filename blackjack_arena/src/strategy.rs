use crate::{
    simulation::{dealer_must_draw, hand::Hand, Card, RoundResult},
    ArenaError, Decision, HandValue, Rule, StrategyError,
};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::EnumIter;

/// What a strategy is allowed to see when it is asked for a decision. The
/// dealer's hole card is never part of it.
#[derive(Debug, Clone, Copy)]
pub struct PlayerView<'a> {
    pub hand: &'a Hand,
    pub value: HandValue,
    pub dealer_up_card: Card,
    pub balance: f64,
    pub bet: u32,
    pub can_double_down: bool,
    pub cards_remaining: usize,
    pub rule: &'a Rule,
}

/// The contract every competitor implements. Only `decide` is required; the
/// observation hooks let a bot track the cards that have been shown.
pub trait Strategy {
    fn decide(&mut self, view: &PlayerView<'_>) -> Result<Decision, StrategyError>;

    /// Called for every card the player has been able to see, in the order
    /// they were revealed, including the dealer's hole card once turned over.
    fn on_card_drawn(&mut self, _card: Card) {}

    /// Called when the deck is rebuilt and reshuffled.
    fn on_shuffle(&mut self) {}

    fn on_round_end(&mut self, _result: &RoundResult) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str, EnumIter)]
pub enum StrategyKind {
    AlwaysStand,
    MimicDealer,
    HitBelow,
    BasicStrategy,
    HiLoCounter,
}

impl StrategyKind {
    /// Builds a fresh bot of this kind. Only `HitBelow` takes a parameter, the
    /// total it keeps hitting below (17 when omitted).
    pub fn build(&self, param: Option<u16>, rule: &Rule) -> Result<Box<dyn Strategy>, ArenaError> {
        if param.is_some() && *self != StrategyKind::HitBelow {
            return Err(ArenaError::InvalidConfig(format!(
                "strategy {:?} does not take a parameter",
                self
            )));
        }
        let strategy: Box<dyn Strategy> = match self {
            StrategyKind::AlwaysStand => Box::new(AlwaysStand),
            StrategyKind::MimicDealer => Box::new(MimicDealer),
            StrategyKind::HitBelow => {
                let threshold = param.unwrap_or(17);
                if !(2..=21).contains(&threshold) {
                    return Err(ArenaError::InvalidConfig(format!(
                        "HitBelow threshold must be in [2, 21], got {}",
                        threshold
                    )));
                }
                Box::new(HitBelow::new(threshold))
            }
            StrategyKind::BasicStrategy => Box::new(BasicStrategy::new()),
            StrategyKind::HiLoCounter => Box::new(HiLoCounter::new(rule.number_of_decks)),
        };
        Ok(strategy)
    }
}

/// The template bot every competitor starts from.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysStand;

impl Strategy for AlwaysStand {
    fn decide(&mut self, _: &PlayerView<'_>) -> Result<Decision, StrategyError> {
        Ok(Decision::Stand)
    }
}

/// Plays the player's hand by the same rule the dealer follows.
#[derive(Debug, Default, Clone, Copy)]
pub struct MimicDealer;

impl Strategy for MimicDealer {
    fn decide(&mut self, view: &PlayerView<'_>) -> Result<Decision, StrategyError> {
        if dealer_must_draw(view.value, view.rule) {
            Ok(Decision::Hit)
        } else {
            Ok(Decision::Stand)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HitBelow {
    threshold: u16,
}

impl HitBelow {
    pub fn new(threshold: u16) -> Self {
        HitBelow { threshold }
    }
}

impl Strategy for HitBelow {
    fn decide(&mut self, view: &PlayerView<'_>) -> Result<Decision, StrategyError> {
        if view.value.total < self.threshold {
            Ok(Decision::Hit)
        } else {
            Ok(Decision::Stand)
        }
    }
}

/// Chart play without splits or surrender. Each cell holds the preferred
/// decision and the one to fall back on when doubling is not possible.
pub struct BasicStrategy {
    hard_charts: [[(Decision, Decision); 10]; 14],
    soft_charts: [[(Decision, Decision); 10]; 9],
}

impl BasicStrategy {
    pub fn new() -> BasicStrategy {
        const H: (Decision, Decision) = (Decision::Hit, Decision::Hit);
        const S: (Decision, Decision) = (Decision::Stand, Decision::Stand);
        const DH: (Decision, Decision) = (Decision::DoubleDown, Decision::Hit);
        const DS: (Decision, Decision) = (Decision::DoubleDown, Decision::Stand);

        // Columns are the dealer's up card: A, 2, 3, ..., 10.
        let hard_charts = [
            [H, H, H, H, H, H, H, H, H, H], // 5 and below
            [H, H, H, H, H, H, H, H, H, H],
            [H, H, H, H, H, H, H, H, H, H],
            [H, H, H, H, H, H, H, H, H, H],
            [H, H, DH, DH, DH, DH, H, H, H, H],
            [H, DH, DH, DH, DH, DH, DH, DH, DH, H],
            [DH, DH, DH, DH, DH, DH, DH, DH, DH, DH],
            [H, H, H, S, S, S, H, H, H, H],
            [H, S, S, S, S, S, H, H, H, H],
            [H, S, S, S, S, S, H, H, H, H],
            [H, S, S, S, S, S, H, H, H, H],
            [H, S, S, S, S, S, H, H, H, H],
            [S, S, S, S, S, S, S, S, S, S], // 17
            [S, S, S, S, S, S, S, S, S, S], // 18 and above
        ];
        let soft_charts = [
            [H, H, H, H, DH, DH, H, H, H, H], // soft 13
            [H, H, H, H, DH, DH, H, H, H, H],
            [H, H, H, DH, DH, DH, H, H, H, H],
            [H, H, H, DH, DH, DH, H, H, H, H],
            [H, H, DH, DH, DH, DH, H, H, H, H],
            [H, DS, DS, DS, DS, DS, S, S, H, H],
            [S, S, S, S, S, DS, S, S, S, S],
            [S, S, S, S, S, S, S, S, S, S],
            [S, S, S, S, S, S, S, S, S, S], // soft 21
        ];

        BasicStrategy {
            hard_charts,
            soft_charts,
        }
    }

    pub fn chart_decision(&self, value: HandValue, dealer_up_card: Card, can_double_down: bool) -> Decision {
        let col = (dealer_up_card.blackjack_value() - 1) as usize;

        let decision = if value.is_soft() {
            if value.total < 13 {
                // Two Aces; nothing to stand on.
                return Decision::Hit;
            }
            self.soft_charts[(value.total - 13) as usize][col]
        } else {
            let row = value.total.clamp(5, 18) - 5;
            self.hard_charts[row as usize][col]
        };

        if decision.0 == Decision::DoubleDown && !can_double_down {
            decision.1
        } else {
            decision.0
        }
    }
}

impl Default for BasicStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BasicStrategy {
    fn decide(&mut self, view: &PlayerView<'_>) -> Result<Decision, StrategyError> {
        Ok(self.chart_decision(view.value, view.dealer_up_card, view.can_double_down))
    }
}

/// Basic strategy with a handful of Hi-Lo index plays. Low cards (2 to 6)
/// count +1, tens and Aces count -1, and the running count is divided by the
/// decks left to get the true count.
pub struct HiLoCounter {
    basic: BasicStrategy,
    number_of_decks: u8,
    running_count: i32,
}

impl HiLoCounter {
    pub fn new(number_of_decks: u8) -> Self {
        HiLoCounter {
            basic: BasicStrategy::new(),
            number_of_decks,
            running_count: 0,
        }
    }

    pub fn running_count(&self) -> i32 {
        self.running_count
    }

    pub fn true_count(&self, cards_remaining: usize) -> f64 {
        let decks_remaining = (cards_remaining as f64 / 52.0)
            .max(0.5)
            .min(self.number_of_decks as f64);
        self.running_count as f64 / decks_remaining
    }
}

impl Strategy for HiLoCounter {
    fn decide(&mut self, view: &PlayerView<'_>) -> Result<Decision, StrategyError> {
        let true_count = self.true_count(view.cards_remaining);
        let up = view.dealer_up_card.blackjack_value();
        let value = view.value;

        if !value.is_soft() {
            let deviation = match (value.total, up) {
                (16, 10) if true_count >= 0.0 => Some(Decision::Stand),
                (15, 10) if true_count >= 4.0 => Some(Decision::Stand),
                (12, 2) if true_count >= 3.0 => Some(Decision::Stand),
                (12, 3) if true_count >= 2.0 => Some(Decision::Stand),
                (13, 2) if true_count <= -1.0 => Some(Decision::Hit),
                (10, 10) if true_count >= 4.0 && view.can_double_down => {
                    Some(Decision::DoubleDown)
                }
                _ => None,
            };
            if let Some(decision) = deviation {
                return Ok(decision);
            }
        }

        self.basic.decide(view)
    }

    fn on_card_drawn(&mut self, card: Card) {
        match card.blackjack_value() {
            2..=6 => self.running_count += 1,
            1 | 10 => self.running_count -= 1,
            _ => {}
        }
    }

    fn on_shuffle(&mut self) {
        self.running_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Suit;
    use strum::IntoEnumIterator;

    fn view<'a>(hand: &'a Hand, up: u8, rule: &'a Rule) -> PlayerView<'a> {
        PlayerView {
            hand,
            value: hand.value(),
            dealer_up_card: Card::new(up, Suit::Club),
            balance: 1000.0,
            bet: 10,
            can_double_down: hand.len() == 2 && rule.allow_double_down,
            cards_remaining: 52,
            rule,
        }
    }

    fn hand_of(face_values: &[u8]) -> Hand {
        face_values
            .iter()
            .map(|&face_value| Card::new(face_value, Suit::Heart))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn always_stand_stands() {
        let rule = Rule::default();
        let hand = hand_of(&[2, 3]);
        assert_eq!(AlwaysStand.decide(&view(&hand, 10, &rule)), Ok(Decision::Stand));
    }

    #[test]
    fn mimic_dealer_hits_soft_17() {
        let rule = Rule::default();
        let soft_17 = hand_of(&[1, 6]);
        let hard_17 = hand_of(&[10, 7]);
        assert_eq!(MimicDealer.decide(&view(&soft_17, 5, &rule)), Ok(Decision::Hit));
        assert_eq!(MimicDealer.decide(&view(&hard_17, 5, &rule)), Ok(Decision::Stand));
    }

    #[test]
    fn hit_below_threshold() {
        let rule = Rule::default();
        let mut bot = HitBelow::new(15);
        assert_eq!(bot.decide(&view(&hand_of(&[10, 4]), 9, &rule)), Ok(Decision::Hit));
        assert_eq!(bot.decide(&view(&hand_of(&[10, 5]), 9, &rule)), Ok(Decision::Stand));
    }

    #[test]
    fn basic_strategy_follows_the_charts() {
        let rule = Rule::default();
        let mut bot = BasicStrategy::new();
        // hard 16 vs 10 hits, vs 6 stands
        assert_eq!(bot.decide(&view(&hand_of(&[10, 6]), 10, &rule)), Ok(Decision::Hit));
        assert_eq!(bot.decide(&view(&hand_of(&[10, 6]), 6, &rule)), Ok(Decision::Stand));
        // 11 doubles against anything
        assert_eq!(bot.decide(&view(&hand_of(&[5, 6]), 1, &rule)), Ok(Decision::DoubleDown));
        // soft 18 vs 9 hits, vs 7 stands
        assert_eq!(bot.decide(&view(&hand_of(&[1, 7]), 9, &rule)), Ok(Decision::Hit));
        assert_eq!(bot.decide(&view(&hand_of(&[1, 7]), 7, &rule)), Ok(Decision::Stand));
        // pair of Aces just hits
        assert_eq!(bot.decide(&view(&hand_of(&[1, 1]), 6, &rule)), Ok(Decision::Hit));
        // 20 stands
        assert_eq!(bot.decide(&view(&hand_of(&[13, 12]), 1, &rule)), Ok(Decision::Stand));
    }

    #[test]
    fn basic_strategy_falls_back_when_double_is_impossible() {
        let rule = Rule::default();
        let mut bot = BasicStrategy::new();
        // three-card 11 cannot double
        assert_eq!(bot.decide(&view(&hand_of(&[2, 4, 5]), 6, &rule)), Ok(Decision::Hit));
        // three-card soft 18 vs 4 stands instead of doubling
        assert_eq!(bot.decide(&view(&hand_of(&[1, 3, 4]), 4, &rule)), Ok(Decision::Stand));

        let no_double = Rule {
            allow_double_down: false,
            ..Default::default()
        };
        assert_eq!(bot.decide(&view(&hand_of(&[5, 6]), 6, &no_double)), Ok(Decision::Hit));
    }

    #[test]
    fn hi_lo_counts_and_resets_on_shuffle() {
        let mut bot = HiLoCounter::new(1);
        for face_value in [2, 3, 4, 5, 6, 7, 8, 9] {
            bot.on_card_drawn(Card::new(face_value, Suit::Spade));
        }
        assert_eq!(bot.running_count(), 5);
        for face_value in [1, 10, 11, 12, 13] {
            bot.on_card_drawn(Card::new(face_value, Suit::Spade));
        }
        assert_eq!(bot.running_count(), 0);
        bot.on_card_drawn(Card::new(2, Suit::Spade));
        bot.on_shuffle();
        assert_eq!(bot.running_count(), 0);
    }

    #[test]
    fn hi_lo_stands_on_16_against_ten_with_a_rich_deck() {
        let rule = Rule::default();
        let hand = hand_of(&[10, 6]);
        let mut bot = HiLoCounter::new(1);
        bot.on_card_drawn(Card::new(10, Suit::Spade));
        assert_eq!(bot.decide(&view(&hand, 10, &rule)), Ok(Decision::Hit));
        for _ in 0..3 {
            bot.on_card_drawn(Card::new(4, Suit::Spade));
        }
        assert_eq!(bot.decide(&view(&hand, 10, &rule)), Ok(Decision::Stand));
    }

    #[test]
    fn true_count_divides_by_decks_left() {
        let mut bot = HiLoCounter::new(6);
        for _ in 0..6 {
            bot.on_card_drawn(Card::new(5, Suit::Diamond));
        }
        assert_eq!(bot.true_count(3 * 52), 2.0);
        assert_eq!(bot.true_count(10), 12.0);
    }

    #[test]
    fn every_kind_builds_and_parses() {
        let rule = Rule::default();
        for kind in StrategyKind::iter() {
            assert!(kind.build(None, &rule).is_ok());
            let name = format!("{:?}", kind);
            assert_eq!(name.parse::<StrategyKind>().unwrap(), kind);
        }
        assert!("Martingale".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn build_validates_parameters() {
        let rule = Rule::default();
        assert!(StrategyKind::HitBelow.build(Some(12), &rule).is_ok());
        assert!(StrategyKind::HitBelow.build(Some(30), &rule).is_err());
        assert!(StrategyKind::AlwaysStand.build(Some(12), &rule).is_err());
    }
}
