//! # Error Types
//!
//! Only setup and teardown can fail. Races during play (a marker on an
//! empty slot, a stale claim) are expected and never surface as errors.

use thiserror::Error;

/// Errors raised while loading or validating a [`GameConfig`](crate::GameConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has wrongly typed fields.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the game cannot run with.
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

/// Errors raised while starting or joining a game.
#[derive(Error, Debug)]
pub enum GameError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The OS refused to spawn a game thread.
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A game thread panicked before it could report back.
    #[error("thread {0} panicked")]
    ThreadPanicked(String),

    /// A player id outside `[0, players)` was used.
    #[error("unknown player {0}")]
    UnknownPlayer(usize),
}

/// Result type for game setup operations.
pub type GameResult<T> = Result<T, GameError>;
