//! # Set Oracle
//!
//! Pure functions deciding whether a combination of cards is a set.
//!
//! The engine never looks at card features itself. The dealer asks the
//! oracle to validate claims and to decide whether the game can go on.
//!
//! ## Default Rule
//!
//! A card id is read as `feature_count` digits in base `feature_size`.
//! A combination of `feature_size` cards is a set iff, for every feature,
//! the values are either all equal or all distinct.
//!
//! ```text
//! feature_size = 3, feature_count = 4
//!
//!   card 0  = [0, 0, 0, 0]
//!   card 40 = [1, 1, 1, 1]
//!   card 80 = [2, 2, 2, 2]   -> all distinct in every feature: SET
//! ```

use crate::types::Card;

/// The set validity rule.
///
/// Implementations must be pure and thread-safe: the dealer calls them
/// while holding no locks, but from its own thread.
pub trait SetOracle: Send + Sync {
    /// Returns true if `cards` form a valid set.
    fn is_valid_set(&self, cards: &[Card]) -> bool;

    /// Returns up to `limit` valid sets among `cards`.
    fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<Vec<Card>>;

    /// Returns the feature values of each card, for hints.
    fn cards_to_features(&self, cards: &[Card]) -> Vec<Vec<usize>>;
}

/// The classic feature-matching rule, generalized to any base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureOracle {
    feature_size: usize,
    feature_count: usize,
}

impl FeatureOracle {
    /// Creates an oracle for `feature_count` features of `feature_size` values each.
    #[must_use]
    pub const fn new(feature_size: usize, feature_count: usize) -> Self {
        Self {
            feature_size,
            feature_count,
        }
    }

    /// Number of cards in a set.
    #[must_use]
    pub const fn feature_size(&self) -> usize {
        self.feature_size
    }

    /// Feature values of a single card, most significant feature first.
    #[must_use]
    pub fn features_of(&self, card: Card) -> Vec<usize> {
        let mut features = vec![0; self.feature_count];
        let mut rest = card;
        for value in features.iter_mut().rev() {
            *value = rest % self.feature_size;
            rest /= self.feature_size;
        }
        features
    }

    fn feature_matches(&self, values: &mut [usize]) -> bool {
        values.sort_unstable();
        let all_equal = values.windows(2).all(|w| w[0] == w[1]);
        let all_distinct = values.windows(2).all(|w| w[0] != w[1]);
        all_equal || all_distinct
    }
}

impl SetOracle for FeatureOracle {
    fn is_valid_set(&self, cards: &[Card]) -> bool {
        if cards.len() != self.feature_size {
            return false;
        }
        let features: Vec<Vec<usize>> = cards.iter().map(|&c| self.features_of(c)).collect();
        let mut column = Vec::with_capacity(cards.len());
        (0..self.feature_count).all(|feature| {
            column.clear();
            column.extend(features.iter().map(|f| f[feature]));
            self.feature_matches(&mut column)
        })
    }

    fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<Vec<Card>> {
        let mut found = Vec::new();
        if limit == 0 || cards.len() < self.feature_size {
            return found;
        }
        let mut picked = Vec::with_capacity(self.feature_size);
        search(self, cards, 0, &mut picked, limit, &mut found);
        found
    }

    fn cards_to_features(&self, cards: &[Card]) -> Vec<Vec<usize>> {
        cards.iter().map(|&c| self.features_of(c)).collect()
    }
}

/// Lexicographic combination walk, stopping once `limit` sets are found.
fn search(
    oracle: &FeatureOracle,
    cards: &[Card],
    start: usize,
    picked: &mut Vec<Card>,
    limit: usize,
    found: &mut Vec<Vec<Card>>,
) {
    if found.len() >= limit {
        return;
    }
    if picked.len() == oracle.feature_size {
        if oracle.is_valid_set(picked) {
            found.push(picked.clone());
        }
        return;
    }
    let needed = oracle.feature_size - picked.len();
    for index in start..=cards.len().saturating_sub(needed) {
        picked.push(cards[index]);
        search(oracle, cards, index + 1, picked, limit, found);
        picked.pop();
        if found.len() >= limit {
            return;
        }
    }
}
