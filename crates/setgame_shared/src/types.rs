//! # Identifiers
//!
//! Cards, slots and players are plain indices. They index fixed-size
//! arrays that are allocated once per game, so a `usize` is all we need.

/// A card id in `[0, deck_size)`.
///
/// Features of a card are derived from its id by the oracle.
pub type Card = usize;

/// A board position in `[0, table_size)`.
pub type Slot = usize;

/// A player id in `[0, players)`.
pub type PlayerId = usize;
