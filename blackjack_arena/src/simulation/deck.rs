use super::{Card, Suit};
use crate::ArenaError;

use strum::IntoEnumIterator;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One or more standard 52-card decks shuffled together and consumed by
/// sequential draws.
#[derive(Debug, Clone)]
pub struct Deck {
    number_of_decks: u8,
    cards: Vec<Card>,
    current_index: usize,
    rng: StdRng,
}

impl Deck {
    /// Creates a shuffled deck of `52 * number_of_decks` cards.
    pub fn new(number_of_decks: u8) -> Result<Deck, ArenaError> {
        Self::with_rng(number_of_decks, StdRng::from_entropy())
    }

    /// Same as `new`, but every shuffle of this deck is driven by a seeded
    /// generator, so two decks with the same seed deal the same sequence.
    pub fn with_seed(number_of_decks: u8, seed: u64) -> Result<Deck, ArenaError> {
        Self::with_rng(number_of_decks, StdRng::seed_from_u64(seed))
    }

    /// Creates a deck whose first draws are exactly the given face values
    /// (1 stands for A, 11, 12 and 13 for J, Q and K), in order. The rest of
    /// the deck is shuffled behind them. Fails if the faces cannot be taken
    /// from `number_of_decks` decks.
    pub fn stacked(number_of_decks: u8, firsts: &[u8]) -> Result<Deck, ArenaError> {
        let mut deck = Self::new(number_of_decks)?;
        let mut counts = [number_of_decks; 52];

        let mut idx = 0;
        for &face_value in firsts {
            let card_integer = find_suitable_card(&counts, face_value).ok_or_else(|| {
                ArenaError::InvalidConfig(format!(
                    "cannot stack face value {} from {} deck(s)",
                    face_value, number_of_decks
                ))
            })?;
            counts[card_integer as usize] -= 1;
            deck.cards[idx] = Card::try_from(card_integer)?;
            idx += 1;
        }

        for suit in Suit::iter() {
            for face_value in 1..=13 {
                let card = Card { face_value, suit };
                let card_integer: u8 = card.into();
                for _ in 0..counts[card_integer as usize] {
                    deck.cards[idx] = card;
                    idx += 1;
                }
            }
        }

        deck.cards[firsts.len()..].shuffle(&mut deck.rng);
        Ok(deck)
    }

    fn with_rng(number_of_decks: u8, rng: StdRng) -> Result<Deck, ArenaError> {
        if number_of_decks < 1 {
            return Err(ArenaError::InvalidConfig(String::from(
                "a deck needs at least 1 pack of 52 cards",
            )));
        }
        let mut deck = Deck {
            number_of_decks,
            cards: ordered_cards(number_of_decks),
            current_index: 0,
            rng,
        };
        deck.shuffle();
        Ok(deck)
    }

    /// Returns every dealt card to the deck and shuffles the whole deck.
    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut self.rng);
        self.current_index = 0;
    }

    /// Draws the top card. An exhausted deck is rebuilt and reshuffled first,
    /// so drawing never fails.
    pub fn draw(&mut self) -> Card {
        if self.current_index == self.cards.len() {
            tracing::debug!(
                number_of_decks = self.number_of_decks,
                "deck exhausted, reshuffling"
            );
            self.shuffle();
        }
        let card = self.cards[self.current_index];
        self.current_index += 1;
        card
    }

    /// Whether the next draw will trigger a reshuffle.
    pub fn is_exhausted(&self) -> bool {
        self.current_index == self.cards.len()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.current_index
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }
}

fn ordered_cards(number_of_decks: u8) -> Vec<Card> {
    let mut cards = Vec::with_capacity(number_of_decks as usize * 52);
    for _ in 0..number_of_decks {
        for suit in Suit::iter() {
            for face_value in 1..=13 {
                cards.push(Card { face_value, suit });
            }
        }
    }
    cards
}

fn find_suitable_card(counts: &[u8; 52], face_value: u8) -> Option<u8> {
    if face_value == 0 || face_value > 13 {
        return None;
    }
    Suit::iter()
        .map(|suit| u8::from(Card { face_value, suit }))
        .find(|&card_integer| counts[card_integer as usize] > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_of_cards_is_correct(deck: &Deck) -> bool {
        let mut counts = [0_u8; 52];
        for card in &deck.cards {
            let card_integer: u8 = (*card).into();
            counts[card_integer as usize] += 1;
        }
        counts.iter().all(|&count| count == deck.number_of_decks)
    }

    #[test]
    fn new_deck_has_every_card_once_per_pack() {
        let deck = Deck::new(3).unwrap();
        assert_eq!(deck.cards.len(), 3 * 52);
        assert_eq!(deck.remaining(), 3 * 52);
        assert!(number_of_cards_is_correct(&deck));
    }

    #[test]
    fn zero_decks_is_rejected() {
        assert!(matches!(Deck::new(0), Err(ArenaError::InvalidConfig(_))));
        assert!(Deck::with_seed(0, 7).is_err());
    }

    #[test]
    fn every_draw_removes_exactly_one_card() {
        let mut deck = Deck::new(1).unwrap();
        for drawn in 1..=52 {
            deck.draw();
            assert_eq!(deck.remaining(), 52 - drawn);
        }
        assert!(deck.is_exhausted());
    }

    #[test]
    fn single_deck_draws_each_card_once_before_reshuffle() {
        let mut deck = Deck::new(1).unwrap();
        let mut seen = [false; 52];
        for _ in 0..52 {
            let card_integer: u8 = deck.draw().into();
            assert!(!seen[card_integer as usize]);
            seen[card_integer as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn draw_53_reshuffles_a_full_deck() {
        let mut deck = Deck::new(1).unwrap();
        for _ in 0..52 {
            deck.draw();
        }
        assert_eq!(deck.remaining(), 0);
        let _ = deck.draw();
        assert_eq!(deck.remaining(), 51);
        assert!(number_of_cards_is_correct(&deck));
    }

    #[test]
    fn same_seed_deals_same_sequence() {
        let mut a = Deck::with_seed(2, 2024).unwrap();
        let mut b = Deck::with_seed(2, 2024).unwrap();
        for _ in 0..300 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn stacked_deck_deals_given_faces_first() {
        let firsts = [1, 13, 9, 7, 10];
        let mut deck = Deck::stacked(1, &firsts).unwrap();
        assert!(number_of_cards_is_correct(&deck));
        for face_value in firsts {
            assert_eq!(deck.draw().face_value, face_value);
        }
    }

    #[test]
    fn stacking_too_many_of_one_face_fails() {
        assert!(Deck::stacked(1, &[6, 6, 6, 6, 6]).is_err());
        assert!(Deck::stacked(2, &[6, 6, 6, 6, 6]).is_ok());
        assert!(Deck::stacked(1, &[14]).is_err());
    }
}
