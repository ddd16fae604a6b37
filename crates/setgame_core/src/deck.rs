//! # Deck
//!
//! The ordered pool of cards that are not on the board.
//!
//! Owned by the dealer thread and by nothing else, so it needs no lock:
//! ownership of the `Deck` value is the exclusion.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use setgame_shared::Card;

/// Dealer-owned card pool.
pub struct Deck {
    /// Remaining cards, drawn from the front.
    cards: VecDeque<Card>,
    /// Deterministic shuffle source.
    rng: ChaCha8Rng,
}

impl Deck {
    /// Creates a deck holding cards `0..deck_size` in order.
    ///
    /// # Arguments
    ///
    /// * `deck_size` - Number of cards
    /// * `seed` - Shuffle seed, so a game can be replayed
    #[must_use]
    pub fn new(deck_size: usize, seed: u64) -> Self {
        Self {
            cards: (0..deck_size).collect(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Shuffles the remaining cards.
    pub fn shuffle(&mut self) {
        self.cards.make_contiguous().shuffle(&mut self.rng);
    }

    /// Takes the card at the front of the deck.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop_front()
    }

    /// Puts cards back at the end of the deck.
    pub fn return_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    /// Remaining cards, front first.
    #[must_use]
    pub fn cards(&self) -> impl ExactSizeIterator<Item = Card> + '_ {
        self.cards.iter().copied()
    }

    /// Number of remaining cards.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns true if no card is left.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl std::fmt::Debug for Deck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deck").field("len", &self.cards.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_in_order_until_empty() {
        let mut deck = Deck::new(3, 0);
        assert_eq!(deck.draw(), Some(0));
        assert_eq!(deck.draw(), Some(1));
        assert_eq!(deck.draw(), Some(2));
        assert_eq!(deck.draw(), None);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_shuffle_keeps_every_card() {
        let mut deck = Deck::new(81, 42);
        deck.shuffle();
        let mut cards: Vec<_> = deck.cards().collect();
        cards.sort_unstable();
        assert_eq!(cards, (0..81).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_order() {
        let mut a = Deck::new(81, 9);
        let mut b = Deck::new(81, 9);
        a.shuffle();
        b.shuffle();
        assert!(a.cards().eq(b.cards()));
    }

    #[test]
    fn test_returned_cards_go_to_the_back() {
        let mut deck = Deck::new(4, 0);
        let first = deck.draw().unwrap();
        deck.return_cards([first]);
        assert_eq!(deck.cards().collect::<Vec<_>>(), vec![1, 2, 3, 0]);
    }
}
