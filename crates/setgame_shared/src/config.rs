//! # Game Configuration
//!
//! Tunables for one game, loaded once at startup and never mutated.
//!
//! ```toml
//! players = 4
//! human_players = 1
//! rows = 3
//! columns = 4
//! turn_timeout_ms = 60000
//! penalty_freeze_ms = 3000
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Total number of players (human and computer).
    pub players: usize,
    /// How many of the players, starting from id 0, are human.
    pub human_players: usize,
    /// Number of cards that make up a set, and values per feature.
    pub feature_size: usize,
    /// Number of features per card.
    pub feature_count: usize,
    /// Number of cards in the deck. Defaults to `feature_size ^ feature_count`.
    pub deck_size: Option<usize>,
    /// Board rows.
    pub rows: usize,
    /// Board columns.
    pub columns: usize,
    /// Length of a round before the board is reshuffled.
    pub turn_timeout_ms: u64,
    /// Remaining time below which the countdown is shown as a warning.
    pub turn_timeout_warning_ms: u64,
    /// Freeze applied after a successful claim.
    pub point_freeze_ms: u64,
    /// Freeze applied after a rejected claim.
    pub penalty_freeze_ms: u64,
    /// Artificial delay before every card placement or removal.
    pub table_delay_ms: u64,
    /// Countdown refresh period of the dealer.
    pub tick_ms: u64,
    /// Bounded wait of a claimant before it nudges the dealer again.
    pub claim_resignal_ms: u64,
    /// Pause between two generated key presses of a computer player.
    pub computer_delay_ms: u64,
    /// Log every valid set on the board after each deal.
    pub hints: bool,
    /// Seed for deck shuffles and computer players. Random when absent.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 2,
            human_players: 0,
            feature_size: 3,
            feature_count: 4,
            deck_size: None,
            rows: 3,
            columns: 4,
            turn_timeout_ms: 60_000,
            turn_timeout_warning_ms: 5_000,
            point_freeze_ms: 1_000,
            penalty_freeze_ms: 3_000,
            table_delay_ms: 100,
            tick_ms: 10,
            claim_resignal_ms: 15,
            computer_delay_ms: 10,
            hints: false,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parses and validates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks that the game can actually be played with these values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.players == 0 {
            return Err(invalid("players", "at least one player is required"));
        }
        if self.human_players > self.players {
            return Err(invalid(
                "human_players",
                format!("{} humans but only {} players", self.human_players, self.players),
            ));
        }
        if self.feature_size < 2 {
            return Err(invalid("feature_size", "a set needs at least two cards"));
        }
        if self.feature_count == 0 {
            return Err(invalid("feature_count", "cards need at least one feature"));
        }
        let Some(max_deck) = self.max_deck_size() else {
            return Err(invalid("feature_count", "feature space overflows usize"));
        };
        let deck_size = self.deck_size.unwrap_or(max_deck);
        if deck_size > max_deck {
            return Err(invalid(
                "deck_size",
                format!("{deck_size} cards but only {max_deck} distinct feature combinations"),
            ));
        }
        if deck_size < self.feature_size {
            return Err(invalid("deck_size", "deck is smaller than a single set"));
        }
        let Some(table_size) = self.rows.checked_mul(self.columns) else {
            return Err(invalid("rows", "rows * columns overflows usize"));
        };
        if table_size < self.feature_size {
            return Err(invalid("rows", "board is smaller than a single set"));
        }
        if self.penalty_freeze_ms < self.point_freeze_ms {
            return Err(invalid(
                "penalty_freeze_ms",
                "penalty freeze must not be shorter than the point freeze",
            ));
        }
        if self.turn_timeout_ms == 0 {
            return Err(invalid("turn_timeout_ms", "a round needs a positive length"));
        }
        if self.turn_timeout_warning_ms > self.turn_timeout_ms {
            return Err(invalid(
                "turn_timeout_warning_ms",
                "warning threshold exceeds the turn timeout",
            ));
        }
        if self.tick_ms == 0 {
            return Err(invalid("tick_ms", "must be positive"));
        }
        if self.claim_resignal_ms == 0 {
            return Err(invalid("claim_resignal_ms", "must be positive"));
        }
        Ok(())
    }

    fn max_deck_size(&self) -> Option<usize> {
        let exponent = u32::try_from(self.feature_count).ok()?;
        self.feature_size.checked_pow(exponent)
    }

    /// Number of board slots. Saturates on a config that failed validation.
    #[must_use]
    pub fn table_size(&self) -> usize {
        self.rows.saturating_mul(self.columns)
    }

    /// Number of cards in the deck.
    #[must_use]
    pub fn deck_size(&self) -> usize {
        self.deck_size
            .or_else(|| self.max_deck_size())
            .unwrap_or(0)
    }

    /// Returns true if `player` reads its input from a human.
    #[must_use]
    pub fn is_human(&self, player: usize) -> bool {
        player < self.human_players
    }

    /// Round length.
    #[must_use]
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    /// Countdown warning threshold.
    #[must_use]
    pub fn turn_timeout_warning(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_warning_ms)
    }

    /// Freeze after a point.
    #[must_use]
    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_ms)
    }

    /// Freeze after a penalty.
    #[must_use]
    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_ms)
    }

    /// Artificial card placement delay.
    #[must_use]
    pub fn table_delay(&self) -> Duration {
        Duration::from_millis(self.table_delay_ms)
    }

    /// Countdown refresh period.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Claimant bounded wait.
    #[must_use]
    pub fn claim_resignal(&self) -> Duration {
        Duration::from_millis(self.claim_resignal_ms)
    }

    /// Pause between generated key presses.
    #[must_use]
    pub fn computer_delay(&self) -> Duration {
        Duration::from_millis(self.computer_delay_ms)
    }
}
