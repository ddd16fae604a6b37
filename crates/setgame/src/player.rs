//! # Player
//!
//! One thread per participant. Consumes slot selections, toggles markers
//! and, once it holds a full set of markers, asks the dealer to judge it.
//!
//! ## State Machine
//!
//! ```text
//!              full set of markers
//!  Collecting ─────────────────────> AwaitingClaim
//!      ^                                  │
//!      │            Accepted              ├──────────> FrozenScored ──┐
//!      │            Rejected              ├──────────> FrozenPenalized┤
//!      │            Abandoned / stale     │                           │
//!      └──────────────────────────────────┴───────────────────────────┘
//!
//!  any state ── halt ──> Stopped
//! ```
//!
//! Frozen is only a delay: presses keep queueing but are not processed
//! until the freeze ends.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use setgame_core::{ClaimVerdict, MarkerToggle};
use setgame_shared::{GameError, GameResult, PlayerId, Slot};

use crate::context::GameContext;

/// Granularity of the freeze countdown shown to the player.
const FREEZE_STEP: Duration = Duration::from_secs(1);

/// Where a player thread is in its loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerState {
    /// Processing slot selections.
    Collecting = 0,
    /// Waiting for the dealer to judge a claim.
    AwaitingClaim = 1,
    /// Cooling down after a point.
    FrozenScored = 2,
    /// Cooling down after a wrong claim.
    FrozenPenalized = 3,
    /// The thread has exited.
    Stopped = 4,
}

impl From<u8> for PlayerState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Collecting,
            1 => Self::AwaitingClaim,
            2 => Self::FrozenScored,
            3 => Self::FrozenPenalized,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free view of a player's state, readable from any thread.
#[derive(Debug)]
pub struct PlayerStatus {
    state: AtomicU8,
}

impl PlayerStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PlayerState::Collecting as u8),
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn get(&self) -> PlayerState {
        PlayerState::from(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: PlayerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Claim counters of one player, returned when its thread exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStats {
    /// Claims handed to the dealer.
    pub claims: u32,
    /// Claims judged to be a set.
    pub accepted: u32,
    /// Claims judged not to be a set.
    pub rejected: u32,
    /// Claims dropped unjudged.
    pub abandoned: u32,
}

/// A player thread's state.
pub struct Player {
    id: PlayerId,
    ctx: GameContext,
    actions: Receiver<Slot>,
    status: Arc<PlayerStatus>,
    stats: PlayerStats,
}

impl Player {
    /// Creates player `id` reading selections from `actions`.
    #[must_use]
    pub fn new(id: PlayerId, ctx: GameContext, actions: Receiver<Slot>) -> Self {
        Self {
            id,
            ctx,
            actions,
            status: Arc::new(PlayerStatus::new()),
            stats: PlayerStats::default(),
        }
    }

    /// Shared view of this player's state.
    #[must_use]
    pub fn status(&self) -> Arc<PlayerStatus> {
        Arc::clone(&self.status)
    }

    /// Starts the player on its own named thread.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the thread cannot be created.
    pub fn spawn(self) -> GameResult<thread::JoinHandle<PlayerStats>> {
        let name = format!("player-{}", self.id);
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|source| GameError::Spawn { name, source })
    }

    /// Processes selections until the game stops.
    pub fn run(mut self) -> PlayerStats {
        tracing::info!(player = self.id, "player thread started");

        let actions = self.actions.clone();
        let halt = self.ctx.halt.clone();
        while !halt.is_triggered() {
            select! {
                recv(actions) -> action => match action {
                    Ok(slot) => self.select(slot),
                    Err(_) => break,
                },
                recv(halt.listener()) -> _ => break,
            }
        }

        self.status.set(PlayerState::Stopped);
        tracing::info!(player = self.id, stats = ?self.stats, "player thread stopped");
        self.stats
    }

    /// Handles one key press.
    fn select(&mut self, slot: Slot) {
        let feature_size = self.ctx.config.feature_size;
        match self.ctx.board.toggle_marker(self.id, slot) {
            MarkerToggle::Placed(count) if count == feature_size => self.claim_set(),
            MarkerToggle::Placed(_) | MarkerToggle::Removed(_) | MarkerToggle::Ignored => {}
        }
    }

    /// Runs the claim handshake and the freeze that follows it.
    fn claim_set(&mut self) {
        self.status.set(PlayerState::AwaitingClaim);
        let verdict = self.await_verdict();
        if self.ctx.halt.is_triggered() {
            return;
        }

        match verdict {
            Some(ClaimVerdict::Accepted { score }) => {
                self.stats.accepted += 1;
                tracing::debug!(player = self.id, score, "claim accepted");
                self.freeze(PlayerState::FrozenScored, self.ctx.config.point_freeze());
                while self.actions.try_recv().is_ok() {}
            }
            Some(ClaimVerdict::Rejected) => {
                self.stats.rejected += 1;
                tracing::debug!(player = self.id, "claim rejected");
                self.freeze(PlayerState::FrozenPenalized, self.ctx.config.penalty_freeze());
            }
            Some(ClaimVerdict::Abandoned) => {
                self.stats.abandoned += 1;
                tracing::debug!(player = self.id, "claim abandoned");
            }
            None => {}
        }

        if !self.ctx.halt.is_triggered() {
            self.status.set(PlayerState::Collecting);
        }
    }

    /// Takes a ticket, re-checks the markers, submits and waits.
    ///
    /// Returns `None` if the desk closed before our turn.
    fn await_verdict(&mut self) -> Option<ClaimVerdict> {
        let desk = Arc::clone(&self.ctx.desk);
        let token = desk.acquire()?;

        // Someone else's set may have taken one of our cards while we queued.
        let markers = self.ctx.board.marker_count(self.id);
        if markers != self.ctx.config.feature_size {
            tracing::debug!(player = self.id, markers, "markers changed while queued, claim dropped");
            return Some(ClaimVerdict::Abandoned);
        }

        self.stats.claims += 1;
        let handle = token.submit(self.id);
        let resignal = self.ctx.config.claim_resignal();
        let verdict = loop {
            if let Some(verdict) = handle.wait_timeout(resignal) {
                break verdict;
            }
            if self.ctx.halt.is_triggered() {
                break ClaimVerdict::Abandoned;
            }
            desk.nudge();
        };
        drop(token);
        Some(verdict)
    }

    /// Sits out `total`, reporting the countdown in whole steps.
    fn freeze(&self, state: PlayerState, total: Duration) {
        self.status.set(state);
        let presentation = &self.ctx.presentation;
        let mut remaining = total;
        while !remaining.is_zero() {
            presentation.set_freeze(self.id, remaining);
            let step = remaining.min(FREEZE_STEP);
            if self.ctx.halt.wait_timeout(step) {
                return;
            }
            remaining -= step;
        }
        presentation.set_freeze(self.id, Duration::ZERO);
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("state", &self.status.get())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{action_queue, Press};
    use setgame_core::Wake;
    use setgame_shared::{FeatureOracle, GameConfig, NullPresentation};
    use std::time::Instant;

    fn context() -> GameContext {
        let config = GameConfig {
            players: 2,
            rows: 2,
            columns: 3,
            point_freeze_ms: 20,
            penalty_freeze_ms: 40,
            table_delay_ms: 0,
            ..GameConfig::default()
        };
        GameContext::new(
            config,
            Arc::new(FeatureOracle::new(3, 4)),
            Arc::new(NullPresentation),
        )
        .unwrap()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            PlayerState::Collecting,
            PlayerState::AwaitingClaim,
            PlayerState::FrozenScored,
            PlayerState::FrozenPenalized,
            PlayerState::Stopped,
        ] {
            assert_eq!(PlayerState::from(state as u8), state);
        }
    }

    #[test]
    fn test_presses_toggle_markers() {
        let ctx = context();
        for slot in 0..6 {
            ctx.board.place_card(slot, slot);
        }
        let (sender, actions) = action_queue(0, 3);
        let handle = Player::new(0, ctx.clone(), actions).spawn().unwrap();

        assert_eq!(sender.press(4), Press::Queued);
        wait_until(|| ctx.board.marker_count(0) == 1);
        assert_eq!(sender.press(4), Press::Queued);
        wait_until(|| ctx.board.marker_count(0) == 0);

        ctx.stop();
        assert_eq!(handle.join().unwrap(), PlayerStats::default());
    }

    #[test]
    fn test_full_set_reaches_the_desk_and_freezes() {
        let ctx = context();
        for slot in 0..6 {
            ctx.board.place_card(slot, slot);
        }
        let (sender, actions) = action_queue(1, 3);
        let player = Player::new(1, ctx.clone(), actions);
        let status = player.status();
        let handle = player.spawn().unwrap();

        for slot in [0, 1, 2] {
            assert_eq!(sender.press(slot), Press::Queued);
        }

        let claim = loop {
            if let Wake::Claim(claim) = ctx.desk.wait_for_claim(Duration::from_millis(50)) {
                break claim;
            }
        };
        assert_eq!(claim.player(), 1);
        assert_eq!(status.get(), PlayerState::AwaitingClaim);
        claim.resolve(ClaimVerdict::Rejected);

        wait_until(|| status.get() == PlayerState::Collecting);
        // The board is untouched by a rejection: the markers stay.
        assert_eq!(ctx.board.marker_count(1), 3);

        ctx.stop();
        let stats = handle.join().unwrap();
        assert_eq!(stats.claims, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(status.get(), PlayerState::Stopped);
    }

    #[test]
    fn test_halt_unblocks_a_waiting_claimer() {
        let ctx = context();
        for slot in 0..6 {
            ctx.board.place_card(slot, slot);
        }
        let (sender, actions) = action_queue(0, 3);
        let player = Player::new(0, ctx.clone(), actions);
        let status = player.status();
        let handle = player.spawn().unwrap();

        for slot in [3, 4, 5] {
            sender.press(slot);
        }
        wait_until(|| status.get() == PlayerState::AwaitingClaim);

        let start = Instant::now();
        ctx.stop();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(status.get(), PlayerState::Stopped);
    }
}
