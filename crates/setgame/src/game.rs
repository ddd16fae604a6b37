//! # Game Runtime
//!
//! Starts every thread of a game and hands back a [`GameHandle`].
//!
//! ```text
//!   Game::start ──┬──> dealer          (1 thread)
//!                 ├──> player-0..N     (1 thread each)
//!                 └──> computer-i      (1 thread per non-human player)
//!
//!   GameHandle::terminate ──> Shutdown + ClaimDesk::close ──> every wait returns
//!   GameHandle::join      ──> GameSummary
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use setgame_core::Shutdown;
use setgame_shared::{GameConfig, GameError, GameResult, PlayerId, Presentation, SetOracle};

use crate::context::GameContext;
use crate::dealer::{Dealer, DealerPhase, DealerStatus, GameSummary};
use crate::input::{action_queue, ActionSender, ComputerInput};
use crate::player::{Player, PlayerState, PlayerStats, PlayerStatus};

/// Entry point for running a game.
#[derive(Debug)]
pub struct Game;

impl Game {
    /// Validates `config` and starts the dealer, the players and the
    /// computer inputs.
    ///
    /// # Arguments
    ///
    /// * `config` - Game configuration, validated here
    /// * `oracle` - Set validity rule
    /// * `presentation` - Display sink
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] for a rejected configuration and
    /// [`GameError::Spawn`] if a thread cannot be started. Threads already
    /// running when a spawn fails are stopped.
    pub fn start(
        config: GameConfig,
        oracle: Arc<dyn SetOracle>,
        presentation: Arc<dyn Presentation>,
    ) -> GameResult<GameHandle> {
        let ctx = GameContext::new(config, oracle, presentation)?;
        let seed = ctx.config.seed.unwrap_or_else(clock_seed);
        tracing::info!(
            seed,
            players = ctx.config.players,
            humans = ctx.config.human_players,
            table = ctx.config.table_size(),
            deck = ctx.config.deck_size(),
            "starting game"
        );

        let launched = GameHandle::launch(ctx.clone(), seed);
        if launched.is_err() {
            ctx.stop();
        }
        launched
    }
}

#[allow(clippy::cast_possible_truncation)]
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

/// A running game.
pub struct GameHandle {
    ctx: GameContext,
    senders: Vec<ActionSender>,
    dealer: JoinHandle<GameSummary>,
    dealer_status: Arc<DealerStatus>,
    players: Vec<JoinHandle<PlayerStats>>,
    player_status: Vec<Arc<PlayerStatus>>,
    computers: Vec<(PlayerId, JoinHandle<u64>)>,
}

impl GameHandle {
    fn launch(ctx: GameContext, seed: u64) -> GameResult<Self> {
        let count = ctx.config.players;
        let mut senders = Vec::with_capacity(count);
        let mut players = Vec::with_capacity(count);
        let mut player_status = Vec::with_capacity(count);
        let mut computers = Vec::new();

        for id in 0..count {
            let (sender, actions) = action_queue(id, ctx.config.feature_size);
            let player = Player::new(id, ctx.clone(), actions);
            player_status.push(player.status());
            players.push(player.spawn()?);

            if !ctx.config.is_human(id) {
                let computer = ComputerInput::new(
                    sender.clone(),
                    ctx.config.table_size(),
                    ctx.config.computer_delay(),
                    seed.wrapping_add(id as u64 + 1),
                    ctx.halt.clone(),
                );
                computers.push((id, computer.spawn()?));
            }
            senders.push(sender);
        }

        let dealer = Dealer::new(ctx.clone(), seed);
        let dealer_status = dealer.status();
        let dealer = dealer.spawn()?;

        Ok(Self {
            ctx,
            senders,
            dealer,
            dealer_status,
            players,
            player_status,
            computers,
        })
    }

    /// Input queue of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] for an id outside the game.
    pub fn sender(&self, player: PlayerId) -> GameResult<ActionSender> {
        self.senders
            .get(player)
            .cloned()
            .ok_or(GameError::UnknownPlayer(player))
    }

    /// The game's stop signal, for handlers that outlive a borrow of the handle.
    #[must_use]
    pub fn shutdown(&self) -> Shutdown {
        self.ctx.halt.clone()
    }

    /// Shared state of the game.
    #[must_use]
    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    /// Ends the game. Winners are still announced.
    pub fn terminate(&self) {
        tracing::info!("game terminated");
        self.ctx.stop();
    }

    /// Returns true once the dealer thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.dealer.is_finished()
    }

    /// Current phase of the dealer.
    #[must_use]
    pub fn dealer_phase(&self) -> DealerPhase {
        self.dealer_status.get()
    }

    /// Current state of `player`, if it exists.
    #[must_use]
    pub fn player_state(&self, player: PlayerId) -> Option<PlayerState> {
        self.player_status.get(player).map(|status| status.get())
    }

    /// Waits for the game to end and every thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ThreadPanicked`] naming the first thread that panicked.
    pub fn join(self) -> GameResult<GameSummary> {
        let summary = self.dealer.join();
        // A panicked dealer never stopped the others.
        self.ctx.stop();

        let mut failure = None;
        for (id, handle) in self.players.into_iter().enumerate() {
            match handle.join() {
                Ok(stats) => tracing::debug!(player = id, ?stats, "player joined"),
                Err(_) => {
                    failure.get_or_insert(GameError::ThreadPanicked(format!("player-{id}")));
                }
            }
        }
        for (id, handle) in self.computers {
            if handle.join().is_err() {
                failure.get_or_insert(GameError::ThreadPanicked(format!("computer-{id}")));
            }
        }

        let summary = summary.map_err(|_| GameError::ThreadPanicked(String::from("dealer")))?;
        match failure {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }
}

impl std::fmt::Debug for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameHandle")
            .field("players", &self.players.len())
            .field("computers", &self.computers.len())
            .field("phase", &self.dealer_phase())
            .finish_non_exhaustive()
    }
}
