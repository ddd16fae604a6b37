//! # SETGAME
//!
//! Dealer and player threads playing Set around a shared table.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────┐   press()   ┌──────────────┐  toggle_marker  ┌─────────┐
//!  │ input source │ ──────────> │ player-i     │ ──────────────> │  Board  │
//!  └──────────────┘             │ (thread)     │                 └─────────┘
//!                               └──────┬───────┘                      ^
//!                                      │ acquire / submit             │ exclusive
//!                                      v                              │
//!                               ┌──────────────┐  wait_for_claim ┌────┴────┐
//!                               │  ClaimDesk   │ <────────────── │ dealer  │
//!                               └──────────────┘    resolve      │ (thread)│
//!                                                                └─────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use setgame::Game;
//!
//! let game = Game::start(config, Arc::new(oracle), Arc::new(TracingPresentation::new()))?;
//! game.sender(0)?.press(4);
//! let summary = game.join()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod context;
pub mod dealer;
pub mod game;
pub mod input;
pub mod player;

pub use context::GameContext;
pub use dealer::{winners, Dealer, DealerPhase, DealerStatus, GameSummary};
pub use game::{Game, GameHandle};
pub use input::{action_queue, parse_press, ActionSender, ComputerInput, Press};
pub use player::{Player, PlayerState, PlayerStats, PlayerStatus};
