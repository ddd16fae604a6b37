//! # Presentation Sink
//!
//! Fire-and-forget notifications from the engine to whatever displays it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐                      ┌──────────────────────┐
//! │   Dealer    │──┐                   │ EventPresentation    │──> crossbeam channel
//! └─────────────┘  │   dyn Presentation│ TracingPresentation  │──> tracing
//! ┌─────────────┐  ├──────────────────>│ NullPresentation     │──> nowhere
//! │  Players    │──┘                   └──────────────────────┘
//! └─────────────┘
//! ```
//!
//! Calls are made while board locks are held, so implementations must be
//! quick and must never block.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::types::{Card, PlayerId, Slot};

/// Display sink consumed by the engine.
pub trait Presentation: Send + Sync {
    /// A card was placed on a slot.
    fn place_card(&self, card: Card, slot: Slot);
    /// The card on a slot was removed.
    fn remove_card(&self, slot: Slot);
    /// A player placed a marker on a slot.
    fn place_marker(&self, player: PlayerId, slot: Slot);
    /// A player removed a marker from a slot.
    fn remove_marker(&self, player: PlayerId, slot: Slot);
    /// Every marker on a slot was cleared.
    fn remove_markers(&self, slot: Slot);
    /// A player's score changed.
    fn set_score(&self, player: PlayerId, score: u32);
    /// The round countdown changed.
    fn set_countdown(&self, remaining: Duration, warn: bool);
    /// A player's freeze countdown changed. Zero means unfrozen.
    fn set_freeze(&self, player: PlayerId, remaining: Duration);
    /// The game ended with these winners.
    fn announce_winners(&self, players: &[PlayerId]);
}

/// One presentation notification, as data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableEvent {
    /// A card was placed on a slot.
    CardPlaced {
        /// Placed card.
        card: Card,
        /// Target slot.
        slot: Slot,
    },
    /// The card on a slot was removed.
    CardRemoved {
        /// Emptied slot.
        slot: Slot,
    },
    /// A player placed a marker.
    MarkerPlaced {
        /// Marking player.
        player: PlayerId,
        /// Marked slot.
        slot: Slot,
    },
    /// A player removed a marker.
    MarkerRemoved {
        /// Unmarking player.
        player: PlayerId,
        /// Unmarked slot.
        slot: Slot,
    },
    /// All markers on a slot were cleared.
    MarkersCleared {
        /// Cleared slot.
        slot: Slot,
    },
    /// A score changed.
    ScoreChanged {
        /// Scoring player.
        player: PlayerId,
        /// New total.
        score: u32,
    },
    /// The round countdown changed.
    Countdown {
        /// Time left in the round.
        remaining: Duration,
        /// Below the warning threshold.
        warn: bool,
    },
    /// A player's freeze countdown changed.
    Freeze {
        /// Frozen player.
        player: PlayerId,
        /// Time left frozen. Zero means unfrozen.
        remaining: Duration,
    },
    /// The game ended.
    Winners {
        /// Players sharing the maximum score.
        players: Vec<PlayerId>,
    },
}

/// Presentation that forwards every notification into a bounded channel.
///
/// Sending never blocks: when the channel is full the event is dropped,
/// a slow display must not stall the dealer.
#[derive(Clone)]
pub struct EventPresentation {
    sender: Sender<TableEvent>,
    include_countdown: bool,
}

impl EventPresentation {
    /// Creates a presentation and the receiver its events arrive on.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, Receiver<TableEvent>) {
        let (sender, receiver) = bounded(capacity);
        (
            Self {
                sender,
                include_countdown: true,
            },
            receiver,
        )
    }

    /// Drops countdown ticks, which arrive every `tick_ms`.
    #[must_use]
    pub fn without_countdown(mut self) -> Self {
        self.include_countdown = false;
        self
    }

    /// Sends an event (non-blocking).
    ///
    /// Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: TableEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

impl Presentation for EventPresentation {
    fn place_card(&self, card: Card, slot: Slot) {
        self.send(TableEvent::CardPlaced { card, slot });
    }

    fn remove_card(&self, slot: Slot) {
        self.send(TableEvent::CardRemoved { slot });
    }

    fn place_marker(&self, player: PlayerId, slot: Slot) {
        self.send(TableEvent::MarkerPlaced { player, slot });
    }

    fn remove_marker(&self, player: PlayerId, slot: Slot) {
        self.send(TableEvent::MarkerRemoved { player, slot });
    }

    fn remove_markers(&self, slot: Slot) {
        self.send(TableEvent::MarkersCleared { slot });
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        self.send(TableEvent::ScoreChanged { player, score });
    }

    fn set_countdown(&self, remaining: Duration, warn: bool) {
        if self.include_countdown {
            self.send(TableEvent::Countdown { remaining, warn });
        }
    }

    fn set_freeze(&self, player: PlayerId, remaining: Duration) {
        self.send(TableEvent::Freeze { player, remaining });
    }

    fn announce_winners(&self, players: &[PlayerId]) {
        self.send(TableEvent::Winners {
            players: players.to_vec(),
        });
    }
}

/// Presentation that logs through `tracing`, for headless runs.
#[derive(Debug)]
pub struct TracingPresentation {
    /// Whole seconds of the last logged countdown.
    last_second: AtomicU64,
}

impl TracingPresentation {
    /// Creates a presentation that has not logged a countdown yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_second: AtomicU64::new(u64::MAX),
        }
    }

    /// Returns true the first time `remaining` falls into a new whole second.
    fn countdown_changed(&self, remaining: Duration) -> bool {
        let seconds = remaining.as_secs();
        self.last_second.swap(seconds, Ordering::Relaxed) != seconds
    }
}

impl Default for TracingPresentation {
    fn default() -> Self {
        Self::new()
    }
}

impl Presentation for TracingPresentation {
    fn place_card(&self, card: Card, slot: Slot) {
        tracing::debug!(card, slot, "card placed");
    }

    fn remove_card(&self, slot: Slot) {
        tracing::debug!(slot, "card removed");
    }

    fn place_marker(&self, player: PlayerId, slot: Slot) {
        tracing::trace!(player, slot, "marker placed");
    }

    fn remove_marker(&self, player: PlayerId, slot: Slot) {
        tracing::trace!(player, slot, "marker removed");
    }

    fn remove_markers(&self, slot: Slot) {
        tracing::trace!(slot, "markers cleared");
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        tracing::info!(player, score, "score");
    }

    fn set_countdown(&self, remaining: Duration, warn: bool) {
        // The dealer ticks far more often than once a second.
        if self.countdown_changed(remaining) {
            tracing::trace!(seconds = remaining.as_secs(), warn, "countdown");
        }
    }

    fn set_freeze(&self, player: PlayerId, remaining: Duration) {
        let millis = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
        tracing::trace!(player, millis, "freeze");
    }

    fn announce_winners(&self, players: &[PlayerId]) {
        tracing::info!(?players, "winners");
    }
}

/// Presentation that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn place_card(&self, _card: Card, _slot: Slot) {}
    fn remove_card(&self, _slot: Slot) {}
    fn place_marker(&self, _player: PlayerId, _slot: Slot) {}
    fn remove_marker(&self, _player: PlayerId, _slot: Slot) {}
    fn remove_markers(&self, _slot: Slot) {}
    fn set_score(&self, _player: PlayerId, _score: u32) {}
    fn set_countdown(&self, _remaining: Duration, _warn: bool) {}
    fn set_freeze(&self, _player: PlayerId, _remaining: Duration) {}
    fn announce_winners(&self, _players: &[PlayerId]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (presentation, events) = EventPresentation::channel(16);
        presentation.place_card(4, 0);
        presentation.place_marker(1, 0);
        presentation.set_score(1, 2);

        let received: Vec<TableEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                TableEvent::CardPlaced { card: 4, slot: 0 },
                TableEvent::MarkerPlaced { player: 1, slot: 0 },
                TableEvent::ScoreChanged { player: 1, score: 2 },
            ]
        );
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (presentation, events) = EventPresentation::channel(1);
        assert!(presentation.send(TableEvent::CardRemoved { slot: 0 }));
        assert!(!presentation.send(TableEvent::CardRemoved { slot: 1 }));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_tracing_countdown_logs_each_second_once() {
        let presentation = TracingPresentation::new();
        assert!(presentation.countdown_changed(Duration::from_millis(3_500)));
        assert!(!presentation.countdown_changed(Duration::from_millis(3_200)));
        assert!(presentation.countdown_changed(Duration::from_millis(2_900)));

        // A coarse tick that never lands near a whole second still logs.
        let presentation = TracingPresentation::new();
        for millis in [5_700, 4_200, 2_700, 1_200] {
            assert!(presentation.countdown_changed(Duration::from_millis(millis)));
        }
    }

    #[test]
    fn test_countdown_can_be_filtered() {
        let (presentation, events) = EventPresentation::channel(4);
        let presentation = presentation.without_countdown();
        presentation.set_countdown(Duration::from_secs(3), false);
        presentation.announce_winners(&[0, 2]);

        assert_eq!(
            events.try_recv().unwrap(),
            TableEvent::Winners {
                players: vec![0, 2]
            }
        );
        assert!(events.is_empty());
    }
}
