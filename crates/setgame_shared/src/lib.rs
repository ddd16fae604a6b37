//! # SETGAME Shared
//!
//! Common types used by the dealer, the players and any frontend.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER spawn threads or take locks on game state.
//! Everything here is either plain data, a pure function, or a
//! fire-and-forget sink.
//!
//! - [`config`]: `GameConfig`, loaded once from TOML
//! - [`oracle`]: the set validity rule (`SetOracle`, `FeatureOracle`)
//! - [`presentation`]: the display sink (`Presentation`, `TableEvent`)

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod oracle;
pub mod presentation;
pub mod types;

pub use config::GameConfig;
pub use error::{ConfigError, GameError, GameResult};
pub use oracle::{FeatureOracle, SetOracle};
pub use presentation::{
    EventPresentation, NullPresentation, Presentation, TableEvent, TracingPresentation,
};
pub use types::{Card, PlayerId, Slot};
