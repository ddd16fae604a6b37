//! # Game Context
//!
//! Everything the dealer and the players share, bundled once.
//!
//! ```text
//!                 ┌──────────── GameContext (Clone) ────────────┐
//!                 │ config   Arc<GameConfig>      read only     │
//!                 │ oracle   Arc<dyn SetOracle>   pure          │
//!                 │ board    Arc<Board>           locked        │
//!                 │ desk     Arc<ClaimDesk>       ticketed      │
//!                 │ halt     Shutdown             one shot      │
//!                 │ display  Arc<dyn Presentation> fire & forget│
//!                 └─────────────────────────────────────────────┘
//! ```
//!
//! The deck and the scores are not here: they belong to the
//! dealer thread alone.

use std::sync::Arc;

use setgame_core::{Board, BoardLayout, ClaimDesk, Shutdown};
use setgame_shared::{GameConfig, GameResult, Presentation, SetOracle};

/// Shared handles of one game.
#[derive(Clone)]
pub struct GameContext {
    /// Validated configuration.
    pub config: Arc<GameConfig>,
    /// Set validity rule.
    pub oracle: Arc<dyn SetOracle>,
    /// The table.
    pub board: Arc<Board>,
    /// Claim arbitration.
    pub desk: Arc<ClaimDesk>,
    /// Game-wide stop signal.
    pub halt: Shutdown,
    /// Display sink.
    pub presentation: Arc<dyn Presentation>,
}

impl GameContext {
    /// Validates `config` and builds an empty board for it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`](setgame_shared::GameError::Config) if
    /// the configuration is rejected.
    pub fn new(
        config: GameConfig,
        oracle: Arc<dyn SetOracle>,
        presentation: Arc<dyn Presentation>,
    ) -> GameResult<Self> {
        config.validate()?;
        let layout = BoardLayout {
            table_size: config.table_size(),
            deck_size: config.deck_size(),
            players: config.players,
            feature_size: config.feature_size,
        };
        let board = Board::new(layout, config.table_delay(), Arc::clone(&presentation));
        Ok(Self {
            config: Arc::new(config),
            oracle,
            board: Arc::new(board),
            desk: Arc::new(ClaimDesk::new()),
            halt: Shutdown::new(),
            presentation,
        })
    }

    /// Stops every thread of the game.
    pub fn stop(&self) {
        self.halt.trigger();
        self.desk.close();
    }
}

impl std::fmt::Debug for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("config", &self.config)
            .field("board", &self.board)
            .field("desk", &self.desk)
            .field("halt", &self.halt)
            .finish_non_exhaustive()
    }
}
