//! # Player Input
//!
//! Each player consumes slot selections from its own bounded queue.
//! Whoever presses keys for that player (a human behind stdin, a test,
//! or a computer generator) only ever holds an [`ActionSender`].
//!
//! ```text
//!   stdin / test ──press()──────────┐
//!                                   ├──> bounded(feature_size) ──> Player thread
//!   computer thread ──press_timeout()┘
//! ```
//!
//! The queue is as deep as a set is large: a player cannot queue more
//! selections than it could ever act on before a claim.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use setgame_core::Shutdown;
use setgame_shared::{GameError, GameResult, PlayerId, Slot};

/// Outcome of a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    /// The selection was queued.
    Queued,
    /// The queue was full and the selection was dropped.
    Dropped,
    /// The player is gone.
    Closed,
}

/// Producer side of one player's action queue.
#[derive(Clone, Debug)]
pub struct ActionSender {
    player: PlayerId,
    sender: Sender<Slot>,
}

/// Creates the action queue of `player`.
///
/// # Arguments
///
/// * `player` - Owner of the queue
/// * `capacity` - Queue depth, normally `feature_size`
#[must_use]
pub fn action_queue(player: PlayerId, capacity: usize) -> (ActionSender, Receiver<Slot>) {
    let (sender, receiver) = bounded(capacity);
    (ActionSender { player, sender }, receiver)
}

impl ActionSender {
    /// The player this sender feeds.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Queues a slot selection without blocking.
    pub fn press(&self, slot: Slot) -> Press {
        match self.sender.try_send(slot) {
            Ok(()) => Press::Queued,
            Err(TrySendError::Full(_)) => Press::Dropped,
            Err(TrySendError::Disconnected(_)) => Press::Closed,
        }
    }

    /// Queues a slot selection, waiting up to `timeout` for room.
    pub fn press_timeout(&self, slot: Slot, timeout: Duration) -> Press {
        match self.sender.send_timeout(slot, timeout) {
            Ok(()) => Press::Queued,
            Err(SendTimeoutError::Timeout(_)) => Press::Dropped,
            Err(SendTimeoutError::Disconnected(_)) => Press::Closed,
        }
    }
}

/// Random key presser standing in for a non-human player.
pub struct ComputerInput {
    sender: ActionSender,
    table_size: usize,
    delay: Duration,
    rng: ChaCha8Rng,
    halt: Shutdown,
}

impl ComputerInput {
    /// Creates a generator pressing random slots in `0..table_size`.
    ///
    /// # Arguments
    ///
    /// * `sender` - Queue of the player to drive
    /// * `table_size` - Number of slots to choose from
    /// * `delay` - Pause between presses
    /// * `seed` - Generator seed
    /// * `halt` - Game stop signal
    #[must_use]
    pub fn new(
        sender: ActionSender,
        table_size: usize,
        delay: Duration,
        seed: u64,
        halt: Shutdown,
    ) -> Self {
        Self {
            sender,
            table_size,
            delay,
            rng: ChaCha8Rng::seed_from_u64(seed),
            halt,
        }
    }

    /// Presses keys until the game stops. Returns the number of queued presses.
    pub fn run(mut self) -> u64 {
        let player = self.sender.player();
        tracing::info!(player, "computer input started");

        // Never block longer than a tick on a full queue, so a stop is seen promptly.
        let patience = self.delay.max(Duration::from_millis(1));
        let mut pressed = 0_u64;
        while !self.halt.is_triggered() && self.table_size > 0 {
            let slot = self.rng.gen_range(0..self.table_size);
            match self.sender.press_timeout(slot, patience) {
                Press::Queued => pressed += 1,
                Press::Dropped => {}
                Press::Closed => break,
            }
            if self.halt.wait_timeout(self.delay) {
                break;
            }
        }

        tracing::info!(player, pressed, "computer input stopped");
        pressed
    }

    /// Starts the generator on its own named thread.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the thread cannot be created.
    pub fn spawn(self) -> GameResult<thread::JoinHandle<u64>> {
        let name = format!("computer-{}", self.sender.player());
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|source| GameError::Spawn { name, source })
    }
}

impl std::fmt::Debug for ComputerInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputerInput")
            .field("player", &self.sender.player())
            .field("table_size", &self.table_size)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Parses a human input line of the form `<player> <slot>`.
///
/// Returns `None` for anything else, including extra tokens.
#[must_use]
pub fn parse_press(line: &str) -> Option<(PlayerId, Slot)> {
    let mut tokens = line.split_whitespace();
    let player = tokens.next()?.parse().ok()?;
    let slot = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((player, slot))
}
