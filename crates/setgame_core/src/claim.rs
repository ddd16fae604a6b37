//! # Claim Desk
//!
//! The handshake between players announcing a set and the dealer judging it.
//!
//! ## Protocol
//!
//! ```text
//!   Player                          ClaimDesk                     Dealer
//!     │  acquire()  ──ticket n──>  [next_ticket, now_serving]
//!     │  <── token (when serving == n)
//!     │  submit(p)  ───────────>   pending = Some(p) ──notify──>  wait_for_claim()
//!     │  handle.wait_timeout()                                    judge cards
//!     │  <──────────────────────── verdict signal ─────────────── resolve(verdict)
//!     │  drop(token) ──serving += 1──> next ticket holder wakes
//! ```
//!
//! Tickets make the desk FIFO: players who announced first are judged
//! first, and at most one claim is ever waiting for the dealer. A claim
//! left unresolved is never lost: dropping a [`PendingClaim`] or closing
//! the desk resolves it as [`ClaimVerdict::Abandoned`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use setgame_shared::PlayerId;

/// The dealer's answer to a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimVerdict {
    /// The cards formed a set. Carries the claimer's new score.
    Accepted {
        /// Score after the point was awarded.
        score: u32,
    },
    /// The cards did not form a set.
    Rejected,
    /// The claim was not judged: the markers changed under it, the round
    /// ended, or the game stopped.
    Abandoned,
}

/// One-shot verdict slot shared between a claimer and the dealer.
struct VerdictSignal {
    verdict: Mutex<Option<ClaimVerdict>>,
    condvar: Condvar,
}

impl VerdictSignal {
    fn new() -> Self {
        Self {
            verdict: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }

    /// First verdict wins.
    fn resolve(&self, verdict: ClaimVerdict) {
        let mut slot = self.verdict.lock();
        if slot.is_none() {
            *slot = Some(verdict);
            self.condvar.notify_all();
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> Option<ClaimVerdict> {
        let mut slot = self.verdict.lock();
        if slot.is_none() {
            self.condvar.wait_for(&mut slot, timeout);
        }
        *slot
    }
}

struct Pending {
    player: PlayerId,
    signal: Arc<VerdictSignal>,
}

#[derive(Default)]
struct DeskState {
    next_ticket: u64,
    now_serving: u64,
    waiting: usize,
    pending: Option<Pending>,
    closed: bool,
}

/// What woke the dealer in [`ClaimDesk::wait_for_claim`].
pub enum Wake {
    /// A claim is ready to be judged.
    Claim(PendingClaim),
    /// Timed out, or nudged without a claim.
    Idle,
    /// The desk was closed.
    Closed,
}

/// FIFO claim queue with a single pending slot.
pub struct ClaimDesk {
    state: Mutex<DeskState>,
    /// Ticket holders wait here for their turn.
    turn: Condvar,
    /// The dealer waits here for a claim.
    arbiter: Condvar,
}

impl ClaimDesk {
    /// Creates an open desk.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeskState::default()),
            turn: Condvar::new(),
            arbiter: Condvar::new(),
        }
    }

    // =========================================================================
    // Player side
    // =========================================================================

    /// Takes a ticket and blocks until it is served.
    ///
    /// Returns `None` if the desk is or becomes closed.
    #[must_use]
    pub fn acquire(&self) -> Option<ClaimToken<'_>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting += 1;
        while state.now_serving != ticket && !state.closed {
            self.turn.wait(&mut state);
        }
        state.waiting -= 1;
        if state.closed {
            return None;
        }
        Some(ClaimToken { desk: self })
    }

    /// Wakes the dealer without a claim, so it re-checks its deadline.
    pub fn nudge(&self) {
        self.arbiter.notify_all();
    }

    /// Number of players blocked in [`ClaimDesk::acquire`].
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    // =========================================================================
    // Dealer side
    // =========================================================================

    /// Waits up to `timeout` for a claim.
    ///
    /// May return [`Wake::Idle`] early when nudged.
    pub fn wait_for_claim(&self, timeout: Duration) -> Wake {
        let mut state = self.state.lock();
        if state.pending.is_none() && !state.closed {
            self.arbiter.wait_for(&mut state, timeout);
        }
        if let Some(pending) = state.pending.take() {
            return Wake::Claim(PendingClaim::new(pending));
        }
        if state.closed {
            Wake::Closed
        } else {
            Wake::Idle
        }
    }

    /// Takes the waiting claim, if any, without blocking.
    #[must_use]
    pub fn take_pending(&self) -> Option<PendingClaim> {
        self.state.lock().pending.take().map(PendingClaim::new)
    }

    /// Closes the desk.
    ///
    /// The waiting claim resolves as abandoned, blocked ticket holders
    /// return `None`, and later calls to [`ClaimDesk::acquire`] fail fast.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        tracing::debug!(waiting = state.waiting, "claim desk closed");
        if let Some(pending) = state.pending.take() {
            pending.signal.resolve(ClaimVerdict::Abandoned);
        }
        self.turn.notify_all();
        self.arbiter.notify_all();
    }

    /// Returns true once [`ClaimDesk::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for ClaimDesk {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClaimDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClaimDesk")
            .field("now_serving", &state.now_serving)
            .field("waiting", &state.waiting)
            .field("pending", &state.pending.as_ref().map(|p| p.player))
            .field("closed", &state.closed)
            .finish()
    }
}

/// The right to submit one claim. Dropping it serves the next ticket.
pub struct ClaimToken<'a> {
    desk: &'a ClaimDesk,
}

impl ClaimToken<'_> {
    /// Hands a claim to the dealer and wakes it.
    ///
    /// Hold the token until the returned handle resolves.
    #[must_use]
    pub fn submit(&self, player: PlayerId) -> ClaimHandle {
        let signal = Arc::new(VerdictSignal::new());
        let mut state = self.desk.state.lock();
        if state.closed {
            signal.resolve(ClaimVerdict::Abandoned);
        } else {
            debug_assert!(state.pending.is_none(), "token holder found a pending claim");
            state.pending = Some(Pending {
                player,
                signal: Arc::clone(&signal),
            });
            self.desk.arbiter.notify_all();
        }
        ClaimHandle { player, signal }
    }
}

impl Drop for ClaimToken<'_> {
    fn drop(&mut self) {
        let mut state = self.desk.state.lock();
        state.now_serving += 1;
        self.desk.turn.notify_all();
    }
}

/// Claimer's view of a submitted claim.
pub struct ClaimHandle {
    player: PlayerId,
    signal: Arc<VerdictSignal>,
}

impl ClaimHandle {
    /// The claiming player.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Waits up to `timeout` for the verdict.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ClaimVerdict> {
        self.signal.wait_timeout(timeout)
    }

    /// The verdict, if already given.
    #[must_use]
    pub fn verdict(&self) -> Option<ClaimVerdict> {
        *self.signal.verdict.lock()
    }
}

/// Dealer's view of a claim taken off the desk.
///
/// Must be resolved. If dropped unresolved, it resolves as abandoned.
pub struct PendingClaim {
    player: PlayerId,
    signal: Option<Arc<VerdictSignal>>,
}

impl PendingClaim {
    fn new(pending: Pending) -> Self {
        Self {
            player: pending.player,
            signal: Some(pending.signal),
        }
    }

    /// The claiming player.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Delivers the verdict and wakes the claimer.
    pub fn resolve(mut self, verdict: ClaimVerdict) {
        if let Some(signal) = self.signal.take() {
            signal.resolve(verdict);
        }
    }
}

impl Drop for PendingClaim {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take() {
            signal.resolve(ClaimVerdict::Abandoned);
        }
    }
}

impl std::fmt::Debug for PendingClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingClaim")
            .field("player", &self.player)
            .finish()
    }
}
