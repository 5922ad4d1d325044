// Startup game parameters.
//
// `GameConfig` is the two-field record every game is built from: how many
// standard decks go into the pile and how many players will connect. It is
// read once before the listener binds, and a bad value is fatal there: no
// connection is ever accepted for an invalid game.
//
// Two start-file formats are accepted:
// - JSON (`{"decks": 2, "players": 3}`), chosen when the file starts with `{`.
// - The legacy text form: a header line, then `decks, players` on line two.
//   Whitespace around the values is ignored, further lines are ignored.
//
// Derived quantities (`total_cards`, `deal_count`, `pile_capacity`) live here
// so the game and the tests agree on them.

use std::fs;
use std::path::Path;

use card_exchange_protocol::DECK_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_DECKS: u32 = 1;
pub const MAX_DECKS: u32 = 4;
pub const MIN_PLAYERS: u32 = 2;
pub const MAX_PLAYERS: u32 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read start file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed start file: {0}")]
    Malformed(String),

    #[error("invalid JSON start file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid number of decks: {0} (expected 1 to 4)")]
    Decks(u32),

    #[error("invalid number of players: {0} (expected 2 to 4)")]
    Players(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub decks: u32,
    pub players: u32,
}

impl GameConfig {
    /// Build a validated config.
    pub fn new(decks: u32, players: u32) -> Result<Self, ConfigError> {
        let config = Self { decks, players };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DECKS..=MAX_DECKS).contains(&self.decks) {
            return Err(ConfigError::Decks(self.decks));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::Players(self.players));
        }
        Ok(())
    }

    /// Load and validate a start file in either supported format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse start-file contents, detecting the format.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config = if text.trim_start().starts_with('{') {
            serde_json::from_str::<GameConfig>(text)?
        } else {
            parse_legacy(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn player_count(&self) -> usize {
        self.players as usize
    }

    pub fn total_cards(&self) -> usize {
        self.decks as usize * DECK_SIZE
    }

    /// Cards each player receives in a full dealing pass.
    pub fn deal_count(&self) -> usize {
        self.total_cards() / self.player_count()
    }

    /// Maximum number of cards the pile may ever hold.
    pub fn pile_capacity(&self) -> usize {
        self.total_cards()
    }
}

fn parse_legacy(text: &str) -> Result<GameConfig, ConfigError> {
    let values = text
        .lines()
        .nth(1)
        .ok_or_else(|| ConfigError::Malformed("expected a header line and a values line".into()))?;
    let fields: Vec<&str> = values.split(',').map(str::trim).collect();
    if fields.len() < 2 {
        return Err(ConfigError::Malformed(format!(
            "expected `decks, players`, got {values:?}"
        )));
    }
    let parse = |field: &str, what: &str| {
        field
            .parse::<u32>()
            .map_err(|_| ConfigError::Malformed(format!("{what} is not a number: {field:?}")))
    };
    Ok(GameConfig {
        decks: parse(fields[0], "deck count")?,
        players: parse(fields[1], "player count")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_start_file_parses() {
        let config = GameConfig::parse("decks, players\n 2 , 3\n").unwrap();
        assert_eq!(config, GameConfig { decks: 2, players: 3 });
    }

    #[test]
    fn json_start_file_parses() {
        let config = GameConfig::parse(r#"{ "decks": 4, "players": 2 }"#).unwrap();
        assert_eq!(config, GameConfig { decks: 4, players: 2 });
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            GameConfig::parse("d,p\n5,2"),
            Err(ConfigError::Decks(5))
        ));
        assert!(matches!(
            GameConfig::parse("d,p\n1,1"),
            Err(ConfigError::Players(1))
        ));
        assert!(matches!(GameConfig::new(0, 2), Err(ConfigError::Decks(0))));
        assert!(matches!(
            GameConfig::new(1, 5),
            Err(ConfigError::Players(5))
        ));
    }

    #[test]
    fn malformed_files_are_rejected() {
        assert!(matches!(
            GameConfig::parse("only a header"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            GameConfig::parse("d,p\ntwo,3"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            GameConfig::parse("d,p\n2"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            GameConfig::parse(r#"{"decks": 2}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = GameConfig::load("/nonexistent/start.txt").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn derived_counts() {
        let config = GameConfig::new(2, 2).unwrap();
        assert_eq!(config.total_cards(), 104);
        assert_eq!(config.deal_count(), 52);
        assert_eq!(config.pile_capacity(), 104);

        let config = GameConfig::new(2, 3).unwrap();
        assert_eq!(config.deal_count(), 34);
        assert_eq!(config.total_cards() % config.player_count(), 2);
    }
}
