//! # SETGAME Core
//!
//! Shared state of a running game and the primitives that guard it.
//!
//! ## Architecture Rules
//!
//! 1. **One source of truth** - Marker counts are read off the board, never cached
//! 2. **Fixed lock order** - mode, slot, player, card index (see [`board`])
//! 3. **No lost claims** - Every submitted claim gets exactly one verdict
//!
//! ## Example
//!
//! ```rust,ignore
//! use setgame_core::{Board, BoardLayout};
//!
//! let board = Board::new(layout, Duration::ZERO, presentation);
//! board.place_card(7, 0);
//! board.toggle_marker(1, 0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod board;
pub mod claim;
pub mod deck;
pub mod shutdown;

pub use board::{Board, BoardLayout, BoardWriter, MarkerToggle, RemovedCard};
pub use claim::{ClaimDesk, ClaimHandle, ClaimToken, ClaimVerdict, PendingClaim, Wake};
pub use deck::Deck;
pub use shutdown::Shutdown;
