use super::Card;

/// Best total of a hand together with the number of Aces still counted as 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandValue {
    pub total: u16,
    pub soft_aces: u8,
}

impl HandValue {
    /// Evaluates cards with every Ace first counted as 11, then demoted to 1
    /// one at a time while the total exceeds 21.
    pub fn of(cards: &[Card]) -> HandValue {
        let mut total: u16 = 0;
        let mut soft_aces: u8 = 0;
        for card in cards {
            if card.is_ace() {
                total += 11;
                soft_aces += 1;
            } else {
                total += card.blackjack_value() as u16;
            }
        }

        while total > 21 && soft_aces > 0 {
            total -= 10;
            soft_aces -= 1;
        }

        HandValue { total, soft_aces }
    }

    pub fn is_soft(&self) -> bool {
        self.soft_aces > 0
    }

    pub fn is_bust(&self) -> bool {
        self.total > 21
    }
}

/// Cards held by one participant for one round. Only ever grows until it is
/// cleared for the next round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(5),
        }
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn get_cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self) -> HandValue {
        HandValue::of(&self.cards)
    }

    pub fn is_bust(&self) -> bool {
        self.value().is_bust()
    }

    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.value().total == 21
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Hand { cards }
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::Suit;

    use super::*;

    fn hand_of(face_values: &[u8]) -> Hand {
        face_values
            .iter()
            .map(|&face_value| Card::new(face_value, Suit::Spade))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn face_cards_count_ten() {
        assert_eq!(hand_of(&[11, 12]).value().total, 20);
        assert_eq!(hand_of(&[13, 5]).value().total, 15);
    }

    #[test]
    fn ace_counts_eleven_when_it_fits() {
        let value = hand_of(&[1, 6]).value();
        assert_eq!(value, HandValue { total: 17, soft_aces: 1 });
        assert!(value.is_soft());
    }

    #[test]
    fn aces_are_demoted_until_total_fits() {
        assert_eq!(hand_of(&[1, 1]).value(), HandValue { total: 12, soft_aces: 1 });
        assert_eq!(hand_of(&[1, 1, 1, 1]).value(), HandValue { total: 14, soft_aces: 1 });
        assert_eq!(hand_of(&[1, 6, 10]).value(), HandValue { total: 17, soft_aces: 0 });
        assert_eq!(hand_of(&[1, 1, 9, 10]).value(), HandValue { total: 21, soft_aces: 0 });
    }

    #[test]
    fn value_never_exceeds_21_while_an_ace_can_be_demoted() {
        for others in 2..=10_u8 {
            for aces in 1..=4 {
                let mut faces = vec![1; aces];
                faces.push(others);
                let value = hand_of(&faces).value();
                let hard_sum = aces as u16 + others as u16;
                if hard_sum <= 21 {
                    assert!(value.total <= 21, "{:?} -> {:?}", faces, value);
                }
            }
        }
    }

    #[test]
    fn value_is_independent_of_card_order() {
        let orders: [&[u8]; 4] = [&[1, 5, 1, 9], &[9, 1, 1, 5], &[5, 9, 1, 1], &[1, 1, 5, 9]];
        let expected = hand_of(orders[0]).value();
        for order in orders {
            assert_eq!(hand_of(order).value(), expected);
        }
        assert_eq!(expected.total, 16);
    }

    #[test]
    fn ace_and_ten_value_card_is_blackjack() {
        for ten in 10..=13 {
            assert!(hand_of(&[1, ten]).is_blackjack());
            assert!(hand_of(&[ten, 1]).is_blackjack());
        }
        assert!(!hand_of(&[7, 7, 7]).is_blackjack());
        assert!(!hand_of(&[1, 9]).is_blackjack());
    }

    #[test]
    fn bust_only_above_21() {
        assert!(hand_of(&[10, 5, 9]).is_bust());
        assert!(!hand_of(&[10, 5, 6]).is_bust());
        assert!(!hand_of(&[1, 10, 10]).is_bust());
    }
}
