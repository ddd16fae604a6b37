//! # Board
//!
//! The shared table: which card lies on which slot, and which players
//! have put a marker on which slot.
//!
//! ## Locking Discipline
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   mode          │ RwLock<()>                   │  shared: marker ops, single card ops
//!                 │                              │  exclusive: BoardWriter (bulk sweeps)
//!                 └──────────────┬───────────────┘
//!                                │ then
//!   slots[s]      ┌──────────────▼───────────────┐
//!                 │ Mutex<SlotCell>              │  card on s + players marking s
//!                 └──────────────┬───────────────┘
//!                                │ then
//!   players[p]    ┌──────────────▼───────────────┐
//!                 │ Mutex<Vec<Slot>>             │  slots marked by p
//!                 └──────────────┬───────────────┘
//!                                │ then (leaf, never held while locking)
//!   card_slots    ┌──────────────▼───────────────┐
//!                 │ Mutex<Vec<Option<Slot>>>     │  slot of each card
//!                 └──────────────────────────────┘
//! ```
//!
//! Every path takes locks top to bottom and at most one slot and one
//! player lock at a time. Two players marking two different slots only
//! share the mode lock in shared mode, so they never block each other.
//! A [`BoardWriter`] holds the mode lock exclusively, so no marker can be
//! placed or removed while cards are being swapped.
//!
//! ## Invariants
//!
//! - `card_at(s) == Some(c)` iff `slot_of(c) == Some(s)`
//! - `p` is in the markers of `s` iff `s` is in the markers of `p`
//! - a player never holds more than `feature_size` markers

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use setgame_shared::{Card, PlayerId, Presentation, Slot};

/// Fixed dimensions of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardLayout {
    /// Number of slots.
    pub table_size: usize,
    /// Number of distinct cards.
    pub deck_size: usize,
    /// Number of players.
    pub players: usize,
    /// Maximum markers per player.
    pub feature_size: usize,
}

/// Result of [`Board::toggle_marker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerToggle {
    /// A marker was placed. Carries the player's marker count afterwards.
    Placed(usize),
    /// A marker was removed. Carries the player's marker count afterwards.
    Removed(usize),
    /// Nothing changed: empty slot, unknown slot, or no markers left.
    Ignored,
}

/// A card taken off the board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedCard {
    /// The card that was removed.
    pub card: Card,
    /// The slot it was on.
    pub slot: Slot,
    /// Players whose marker on that slot was cleared.
    pub displaced: Vec<PlayerId>,
}

#[derive(Debug, Default)]
struct SlotCell {
    card: Option<Card>,
    markers: Vec<PlayerId>,
}

/// Marker guard for one (player, slot) pair.
///
/// Fields drop in declaration order, so locks are released bottom up.
struct MarkerGuard<'a> {
    marks: MutexGuard<'a, Vec<Slot>>,
    cell: MutexGuard<'a, SlotCell>,
    _mode: RwLockReadGuard<'a, ()>,
}

/// The shared table.
pub struct Board {
    layout: BoardLayout,
    /// Artificial delay before each card placement or removal.
    delay: Duration,
    mode: RwLock<()>,
    slots: Box<[Mutex<SlotCell>]>,
    players: Box<[Mutex<Vec<Slot>>]>,
    card_slots: Mutex<Vec<Option<Slot>>>,
    presentation: Arc<dyn Presentation>,
}

impl Board {
    /// Creates an empty board.
    ///
    /// # Arguments
    ///
    /// * `layout` - Slot, card and player counts
    /// * `delay` - Sleep before every card placement or removal
    /// * `presentation` - Display sink notified of every change
    #[must_use]
    pub fn new(layout: BoardLayout, delay: Duration, presentation: Arc<dyn Presentation>) -> Self {
        Self {
            layout,
            delay,
            mode: RwLock::new(()),
            slots: (0..layout.table_size)
                .map(|_| Mutex::new(SlotCell::default()))
                .collect(),
            players: (0..layout.players)
                .map(|_| Mutex::new(Vec::with_capacity(layout.feature_size)))
                .collect(),
            card_slots: Mutex::new(vec![None; layout.deck_size]),
            presentation,
        }
    }

    /// Board dimensions.
    #[must_use]
    pub const fn layout(&self) -> BoardLayout {
        self.layout
    }

    /// Takes the board exclusively for a bulk sweep.
    ///
    /// Blocks until every in-flight marker operation has finished, then
    /// keeps all new ones out until the writer is dropped.
    #[must_use]
    pub fn exclusive(&self) -> BoardWriter<'_> {
        BoardWriter {
            board: self,
            _mode: self.mode.write(),
        }
    }

    // =========================================================================
    // Card operations
    // =========================================================================

    /// Places `card` on an empty `slot`.
    ///
    /// Returns false if the slot is occupied, the card is already on the
    /// board, or either index is out of range.
    pub fn place_card(&self, card: Card, slot: Slot) -> bool {
        self.pause();
        let _mode = self.mode.read();
        self.place_locked(card, slot)
    }

    /// Removes the card on `slot` and every marker on it.
    ///
    /// Returns `None` if the slot was empty.
    pub fn remove_card(&self, slot: Slot) -> Option<RemovedCard> {
        self.pause();
        let _mode = self.mode.read();
        self.remove_locked(slot)
    }

    /// Card on `slot`, if any.
    #[must_use]
    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        let _mode = self.mode.read();
        self.slots.get(slot)?.lock().card
    }

    /// Slot holding `card`, if it is on the board.
    #[must_use]
    pub fn slot_of(&self, card: Card) -> Option<Slot> {
        let _mode = self.mode.read();
        self.card_slots.lock().get(card).copied().flatten()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn card_count(&self) -> usize {
        let _mode = self.mode.read();
        self.slots.iter().filter(|s| s.lock().card.is_some()).count()
    }

    /// Cards on the board, in slot order.
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        let _mode = self.mode.read();
        self.slots.iter().filter_map(|s| s.lock().card).collect()
    }

    // =========================================================================
    // Marker operations (shared mode)
    // =========================================================================

    /// Places a marker of `player` on `slot`.
    ///
    /// A no-op returning false if the slot is empty, the player already
    /// marks it, or the player already holds `feature_size` markers.
    pub fn place_marker(&self, player: PlayerId, slot: Slot) -> bool {
        let Some(mut guard) = self.lock_marker(player, slot) else {
            return false;
        };
        self.place_marker_locked(&mut guard, player, slot)
    }

    /// Removes the marker of `player` from `slot`.
    ///
    /// Returns true iff a marker was actually removed.
    pub fn remove_marker(&self, player: PlayerId, slot: Slot) -> bool {
        let Some(mut guard) = self.lock_marker(player, slot) else {
            return false;
        };
        self.remove_marker_locked(&mut guard, player, slot)
    }

    /// Removes the player's marker from `slot` if present, otherwise places one.
    ///
    /// Check and mutation happen under the same guard, so the decision
    /// cannot be invalidated by a concurrent card swap.
    pub fn toggle_marker(&self, player: PlayerId, slot: Slot) -> MarkerToggle {
        let Some(mut guard) = self.lock_marker(player, slot) else {
            return MarkerToggle::Ignored;
        };
        if self.remove_marker_locked(&mut guard, player, slot) {
            MarkerToggle::Removed(guard.marks.len())
        } else if self.place_marker_locked(&mut guard, player, slot) {
            MarkerToggle::Placed(guard.marks.len())
        } else {
            MarkerToggle::Ignored
        }
    }

    /// Number of markers `player` currently holds.
    #[must_use]
    pub fn marker_count(&self, player: PlayerId) -> usize {
        let _mode = self.mode.read();
        self.players.get(player).map_or(0, |marks| marks.lock().len())
    }

    /// Slots `player` currently marks, in placement order.
    #[must_use]
    pub fn markers_of(&self, player: PlayerId) -> Vec<Slot> {
        let _mode = self.mode.read();
        self.players
            .get(player)
            .map_or_else(Vec::new, |marks| marks.lock().clone())
    }

    /// Players with a marker on `slot`.
    #[must_use]
    pub fn players_marking_slot(&self, slot: Slot) -> Vec<PlayerId> {
        let _mode = self.mode.read();
        self.slots
            .get(slot)
            .map_or_else(Vec::new, |cell| cell.lock().markers.clone())
    }

    /// Cards under all of `player`'s markers, as one consistent snapshot.
    ///
    /// Takes the board exclusively: the returned list is exactly as long
    /// as the player's marker count at the time of the call.
    #[must_use]
    pub fn claimed_cards(&self, player: PlayerId) -> Vec<Card> {
        self.exclusive().claimed_cards(player)
    }

    /// Verifies both mirror invariants and the marker limit.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.exclusive().is_consistent()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    fn lock_marker(&self, player: PlayerId, slot: Slot) -> Option<MarkerGuard<'_>> {
        let cell = self.slots.get(slot)?;
        let marks = self.players.get(player)?;
        let mode = self.mode.read();
        let cell = cell.lock();
        let marks = marks.lock();
        Some(MarkerGuard {
            marks,
            cell,
            _mode: mode,
        })
    }

    fn place_marker_locked(&self, guard: &mut MarkerGuard<'_>, player: PlayerId, slot: Slot) -> bool {
        if guard.cell.card.is_none()
            || guard.marks.len() >= self.layout.feature_size
            || guard.marks.contains(&slot)
        {
            return false;
        }
        guard.cell.markers.push(player);
        guard.marks.push(slot);
        self.presentation.place_marker(player, slot);
        true
    }

    fn remove_marker_locked(&self, guard: &mut MarkerGuard<'_>, player: PlayerId, slot: Slot) -> bool {
        let Some(index) = guard.cell.markers.iter().position(|&p| p == player) else {
            return false;
        };
        guard.cell.markers.remove(index);
        guard.marks.retain(|&s| s != slot);
        self.presentation.remove_marker(player, slot);
        true
    }

    /// Caller holds the mode lock (either mode).
    fn place_locked(&self, card: Card, slot: Slot) -> bool {
        let Some(cell) = self.slots.get(slot) else {
            return false;
        };
        let mut cell = cell.lock();
        if cell.card.is_some() {
            tracing::debug!(card, slot, "slot occupied, card not placed");
            return false;
        }
        {
            let mut card_slots = self.card_slots.lock();
            match card_slots.get_mut(card) {
                Some(entry @ None) => *entry = Some(slot),
                _ => {
                    tracing::debug!(card, slot, "card unknown or already placed");
                    return false;
                }
            }
        }
        cell.card = Some(card);
        self.presentation.place_card(card, slot);
        true
    }

    /// Caller holds the mode lock (either mode).
    fn remove_locked(&self, slot: Slot) -> Option<RemovedCard> {
        let mut cell = self.slots.get(slot)?.lock();
        let card = cell.card.take()?;
        if let Some(entry) = self.card_slots.lock().get_mut(card) {
            *entry = None;
        }

        let mut displaced = std::mem::take(&mut cell.markers);
        displaced.sort_unstable();
        for &player in &displaced {
            if let Some(marks) = self.players.get(player) {
                marks.lock().retain(|&s| s != slot);
            }
        }

        self.presentation.remove_markers(slot);
        self.presentation.remove_card(slot);
        Some(RemovedCard {
            card,
            slot,
            displaced,
        })
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("layout", &self.layout)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the board for bulk sweeps.
///
/// While a writer is alive no marker can be placed or removed anywhere.
/// Only the dealer creates writers.
pub struct BoardWriter<'a> {
    board: &'a Board,
    _mode: RwLockWriteGuard<'a, ()>,
}

impl BoardWriter<'_> {
    /// Places `card` on an empty `slot`. See [`Board::place_card`].
    pub fn place_card(&mut self, card: Card, slot: Slot) -> bool {
        self.board.pause();
        self.board.place_locked(card, slot)
    }

    /// Removes the card on `slot`. See [`Board::remove_card`].
    pub fn remove_card(&mut self, slot: Slot) -> Option<RemovedCard> {
        self.board.pause();
        self.board.remove_locked(slot)
    }

    /// Removes every card and every marker, returning the removed cards
    /// in slot order.
    pub fn clear(&mut self) -> Vec<Card> {
        let occupied: Vec<Slot> = (0..self.board.layout.table_size)
            .filter(|&s| self.card_at(s).is_some())
            .collect();
        let cards = occupied
            .into_iter()
            .filter_map(|slot| self.remove_card(slot))
            .map(|removed| removed.card)
            .collect();
        for marks in self.board.players.iter() {
            marks.lock().clear();
        }
        cards
    }

    /// Card on `slot`, if any.
    #[must_use]
    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.board.slots.get(slot)?.lock().card
    }

    /// Slot holding `card`, if it is on the board.
    #[must_use]
    pub fn slot_of(&self, card: Card) -> Option<Slot> {
        self.board.card_slots.lock().get(card).copied().flatten()
    }

    /// Slots without a card, ascending.
    #[must_use]
    pub fn empty_slots(&self) -> Vec<Slot> {
        (0..self.board.layout.table_size)
            .filter(|&s| self.card_at(s).is_none())
            .collect()
    }

    /// Cards on the board, in slot order.
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        self.board.slots.iter().filter_map(|s| s.lock().card).collect()
    }

    /// Cards under all of `player`'s markers.
    #[must_use]
    pub fn claimed_cards(&self, player: PlayerId) -> Vec<Card> {
        let Some(marks) = self.board.players.get(player) else {
            return Vec::new();
        };
        // Exclusive mode: nobody else holds a slot or player lock, so the
        // order below cannot deadlock.
        let slots = marks.lock().clone();
        slots.into_iter().filter_map(|slot| self.card_at(slot)).collect()
    }

    /// Verifies both mirror invariants and the marker limit.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let board = self.board;
        let card_slots = board.card_slots.lock().clone();

        for (slot, cell) in board.slots.iter().enumerate() {
            let cell = cell.lock();
            if let Some(card) = cell.card {
                if card_slots.get(card).copied().flatten() != Some(slot) {
                    return false;
                }
            } else if !cell.markers.is_empty() {
                return false;
            }
            for &player in &cell.markers {
                let holds = board
                    .players
                    .get(player)
                    .is_some_and(|marks| marks.lock().contains(&slot));
                if !holds {
                    return false;
                }
            }
        }

        for (card, slot) in card_slots.iter().enumerate() {
            if let Some(slot) = *slot {
                if self.card_at(slot) != Some(card) {
                    return false;
                }
            }
        }

        board.players.iter().enumerate().all(|(player, marks)| {
            let marks = marks.lock().clone();
            marks.len() <= board.layout.feature_size
                && marks.iter().all(|&slot| {
                    board
                        .slots
                        .get(slot)
                        .is_some_and(|cell| cell.lock().markers.contains(&player))
                })
        })
    }
}
