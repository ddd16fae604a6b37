//! # Dealer
//!
//! The arbiter thread. Owns the deck, the scores and the round timer, and
//! is the only thread that judges claims.
//!
//! ## Game Loop
//!
//! ```text
//!  ┌──> deal empty slots ──> hints ──> countdown ─────────────────────┐
//!  │                                     │   ^                        │
//!  │                                     v   │                        │
//!  │                              service claim (one at a time)       │
//!  │                                                                  v
//!  └──────── sets left? <── reshuffle <── drain board <── timeout / no sets
//!                │ no
//!                v
//!           stop players, drain, announce winners
//! ```
//!
//! ## Phases
//!
//! | Phase            | Entered when                                   |
//! |------------------|------------------------------------------------|
//! | `Dealing`        | a round is about to start                       |
//! | `CountingDown`   | a round starts or a claim was serviced          |
//! | `ServicingClaim` | a claim came off the desk                       |
//! | `Reshuffling`    | the round ended                                 |
//! | `Announcing`     | no set is left or the game was terminated       |
//! | `Stopped`        | the thread is about to exit                     |

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use setgame_core::{BoardWriter, ClaimVerdict, Deck, PendingClaim, Wake};
use setgame_shared::{Card, GameError, GameResult, PlayerId};

use crate::context::GameContext;

/// Where the dealer thread is in its loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DealerPhase {
    /// Dealing cards into empty slots at a round start.
    Dealing = 0,
    /// Running the round timer, waiting for claims.
    CountingDown = 1,
    /// Judging a claim.
    ServicingClaim = 2,
    /// Draining and reshuffling between rounds.
    Reshuffling = 3,
    /// Stopping players and announcing winners.
    Announcing = 4,
    /// The thread has exited.
    Stopped = 5,
}

impl From<u8> for DealerPhase {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Dealing,
            1 => Self::CountingDown,
            2 => Self::ServicingClaim,
            3 => Self::Reshuffling,
            4 => Self::Announcing,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free view of the dealer's phase.
#[derive(Debug)]
pub struct DealerStatus {
    phase: AtomicU8,
}

impl DealerStatus {
    fn new() -> Self {
        Self {
            phase: AtomicU8::new(DealerPhase::Dealing as u8),
        }
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub fn get(&self) -> DealerPhase {
        DealerPhase::from(self.phase.load(Ordering::Acquire))
    }

    fn set(&self, phase: DealerPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

/// Final result of a game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameSummary {
    /// Score of every player, by id.
    pub scores: Vec<u32>,
    /// Players sharing the highest score, ascending.
    pub winners: Vec<PlayerId>,
    /// Number of rounds played.
    pub rounds: u32,
}

/// The dealer thread's state.
pub struct Dealer {
    ctx: GameContext,
    deck: Deck,
    scores: Vec<u32>,
    deadline: Instant,
    rounds: u32,
    status: Arc<DealerStatus>,
}

impl Dealer {
    /// Creates the dealer with a full deck shuffled from `seed`.
    #[must_use]
    pub fn new(ctx: GameContext, seed: u64) -> Self {
        let deck = Deck::new(ctx.config.deck_size(), seed);
        let scores = vec![0; ctx.config.players];
        Self {
            ctx,
            deck,
            scores,
            deadline: Instant::now(),
            rounds: 0,
            status: Arc::new(DealerStatus::new()),
        }
    }

    /// Shared view of the dealer's phase.
    #[must_use]
    pub fn status(&self) -> Arc<DealerStatus> {
        Arc::clone(&self.status)
    }

    /// Starts the dealer on its own named thread.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the thread cannot be created.
    pub fn spawn(self) -> GameResult<thread::JoinHandle<GameSummary>> {
        let name = String::from("dealer");
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|source| GameError::Spawn { name, source })
    }

    /// Plays rounds until no set is left or the game is terminated.
    pub fn run(mut self) -> GameSummary {
        tracing::info!(
            players = self.scores.len(),
            deck = self.deck.len(),
            "dealer thread started"
        );
        self.deck.shuffle();

        while !self.should_finish() {
            self.rounds += 1;
            self.place_cards();
            self.round();
            self.end_round();
        }

        self.finish()
    }

    // =========================================================================
    // Round
    // =========================================================================

    /// Runs the countdown, servicing claims as they arrive.
    fn round(&mut self) {
        self.reset_countdown();
        self.status.set(DealerPhase::CountingDown);
        tracing::debug!(round = self.rounds, cards = self.ctx.board.card_count(), "round started");

        let tick = self.ctx.config.tick();
        let warning = self.ctx.config.turn_timeout_warning();
        while !self.ctx.halt.is_triggered() {
            let Some(remaining) = self.deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            if remaining.is_zero() {
                break;
            }
            self.ctx
                .presentation
                .set_countdown(remaining, remaining <= warning);

            match self.ctx.desk.wait_for_claim(remaining.min(tick)) {
                Wake::Claim(claim) => {
                    if !self.service_claim(claim) {
                        break;
                    }
                }
                Wake::Idle => {}
                Wake::Closed => break,
            }
        }
        self.ctx.presentation.set_countdown(Duration::ZERO, true);
    }

    /// Judges one claim. Returns false if the round must end early.
    fn service_claim(&mut self, claim: PendingClaim) -> bool {
        self.status.set(DealerPhase::ServicingClaim);
        let player = claim.player();
        let feature_size = self.ctx.config.feature_size;

        let cards = self.ctx.board.claimed_cards(player);
        if cards.len() != feature_size {
            tracing::debug!(player, markers = cards.len(), "stale claim abandoned");
            claim.resolve(ClaimVerdict::Abandoned);
            self.status.set(DealerPhase::CountingDown);
            return true;
        }

        let mut round_continues = true;
        if self.ctx.oracle.is_valid_set(&cards) {
            self.remove_cards(&cards);
            let score = self.award_point(player);
            tracing::info!(player, score, ?cards, "set accepted");
            claim.resolve(ClaimVerdict::Accepted { score });

            self.reset_countdown();
            if self.sets_left().is_empty() {
                tracing::info!("no set left on the table or in the deck");
                round_continues = false;
            } else {
                self.log_hints();
            }
        } else {
            tracing::info!(player, ?cards, "set rejected");
            claim.resolve(ClaimVerdict::Rejected);
        }

        self.status.set(DealerPhase::CountingDown);
        round_continues
    }

    /// Takes claimed cards off the table and refills from the deck.
    fn remove_cards(&mut self, cards: &[Card]) {
        let mut writer = self.ctx.board.exclusive();
        for &card in cards {
            let Some(slot) = writer.slot_of(card) else {
                continue;
            };
            if let Some(removed) = writer.remove_card(slot) {
                if !removed.displaced.is_empty() {
                    tracing::debug!(card, slot, players = ?removed.displaced, "markers displaced");
                }
            }
        }
        fill_empty_slots(&mut writer, &mut self.deck);
    }

    fn award_point(&mut self, player: PlayerId) -> u32 {
        let Some(score) = self.scores.get_mut(player) else {
            return 0;
        };
        *score += 1;
        let score = *score;
        self.ctx.presentation.set_score(player, score);
        score
    }

    // =========================================================================
    // Round boundary
    // =========================================================================

    /// Deals the deck into every empty slot.
    fn place_cards(&mut self) {
        self.status.set(DealerPhase::Dealing);
        {
            let mut writer = self.ctx.board.exclusive();
            let placed = fill_empty_slots(&mut writer, &mut self.deck);
            tracing::debug!(placed, deck = self.deck.len(), "cards dealt");
        }
        self.log_hints();
    }

    /// Returns every card to the deck and reshuffles.
    ///
    /// A claim still pending here is abandoned without a penalty, the same
    /// as a claim whose cards were taken by another player's set.
    fn end_round(&mut self) {
        self.status.set(DealerPhase::Reshuffling);
        if let Some(claim) = self.ctx.desk.take_pending() {
            tracing::debug!(player = claim.player(), "claim pending at round end abandoned");
            claim.resolve(ClaimVerdict::Abandoned);
        }
        self.drain_board();
        self.deck.shuffle();
    }

    fn drain_board(&mut self) {
        let cards = self.ctx.board.exclusive().clear();
        tracing::debug!(returned = cards.len(), "board drained");
        self.deck.return_cards(cards);
    }

    fn should_finish(&self) -> bool {
        self.ctx.halt.is_triggered() || self.sets_left().is_empty()
    }

    /// Up to one set among the table and the deck.
    fn sets_left(&self) -> Vec<Vec<Card>> {
        let mut cards = self.ctx.board.cards();
        cards.extend(self.deck.cards());
        self.ctx.oracle.find_sets(&cards, 1)
    }

    fn reset_countdown(&mut self) {
        self.deadline = Instant::now() + self.ctx.config.turn_timeout();
    }

    fn log_hints(&self) {
        if !self.ctx.config.hints {
            return;
        }
        let board = &self.ctx.board;
        for set in self.ctx.oracle.find_sets(&board.cards(), usize::MAX) {
            let slots: Vec<_> = set.iter().filter_map(|&card| board.slot_of(card)).collect();
            let features = self.ctx.oracle.cards_to_features(&set);
            tracing::info!(?slots, ?features, "hint");
        }
    }

    // =========================================================================
    // Game end
    // =========================================================================

    fn finish(mut self) -> GameSummary {
        self.status.set(DealerPhase::Announcing);
        self.ctx.stop();
        self.drain_board();

        let winners = winners(&self.scores);
        self.ctx.presentation.announce_winners(&winners);
        tracing::info!(?winners, scores = ?self.scores, rounds = self.rounds, "game over");

        self.status.set(DealerPhase::Stopped);
        GameSummary {
            scores: self.scores,
            winners,
            rounds: self.rounds,
        }
    }
}

impl std::fmt::Debug for Dealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dealer")
            .field("phase", &self.status.get())
            .field("deck", &self.deck)
            .field("scores", &self.scores)
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}

/// Fills empty slots in ascending order until the deck runs out.
fn fill_empty_slots(writer: &mut BoardWriter<'_>, deck: &mut Deck) -> usize {
    let mut placed = 0;
    for slot in writer.empty_slots() {
        let Some(card) = deck.draw() else {
            break;
        };
        if writer.place_card(card, slot) {
            placed += 1;
        }
    }
    placed
}

/// Every player holding the maximum score.
#[must_use]
pub fn winners(scores: &[u32]) -> Vec<PlayerId> {
    let Some(&best) = scores.iter().max() else {
        return Vec::new();
    };
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score == best)
        .map(|(player, _)| player)
        .collect()
}
