//! Optional TOML configuration (`duel.toml`).
//!
//! Lets users register engines under short names and override the default
//! games/movetime. Everything here is optional; with no file present the
//! CLI works purely from its arguments.
//!
//! ```toml
//! [defaults]
//! games = 100
//! movetime = 0.5
//!
//! [engines.sf17]
//! path = "/opt/stockfish-17/stockfish"
//! label = "Stockfish 17"
//!
//! [engines.stub]
//! path = "target/debug/stub-engine"
//! args = ["first"]
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One registered engine.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineEntry {
    /// Path to the engine executable.
    pub path: PathBuf,
    /// Display label; defaults to the entry's name.
    #[serde(default)]
    pub label: Option<String>,
    /// Extra command-line arguments passed to the engine.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Tournament defaults applied when the CLI flags are absent.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Defaults {
    pub games: Option<u32>,
    /// Seconds per move.
    pub movetime: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DuelConfig {
    #[serde(default)]
    pub engines: HashMap<String, EngineEntry>,
    #[serde(default)]
    pub defaults: Defaults,
}

impl DuelConfig {
    /// Loads `duel.toml` from the working directory, or the default empty
    /// configuration when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> PathBuf {
        PathBuf::from("duel.toml")
    }

    /// Looks up a registered engine by name.
    pub fn engine(&self, name: &str) -> Option<&EngineEntry> {
        self.engines.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: DuelConfig = toml::from_str(
            r#"
            [defaults]
            games = 20
            movetime = 0.1

            [engines.sf]
            path = "/opt/stockfish"
            label = "Stockfish 17"

            [engines.stub]
            path = "target/debug/stub-engine"
            args = ["slow"]
            "#,
        )
        .unwrap();

        assert_eq!(config.defaults.games, Some(20));
        assert_eq!(config.defaults.movetime, Some(0.1));

        let sf = config.engine("sf").unwrap();
        assert_eq!(sf.path, PathBuf::from("/opt/stockfish"));
        assert_eq!(sf.label.as_deref(), Some("Stockfish 17"));
        assert!(sf.args.is_empty());

        let stub = config.engine("stub").unwrap();
        assert_eq!(stub.args, vec!["slow".to_string()]);
        assert!(stub.label.is_none());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: DuelConfig = toml::from_str("").unwrap();
        assert!(config.engines.is_empty());
        assert_eq!(config.defaults.games, None);
    }

    #[test]
    fn test_missing_file_yields_default() {
        let config =
            DuelConfig::load_from(&PathBuf::from("/nonexistent/duel.toml")).unwrap();
        assert!(config.engines.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.toml");
        std::fs::write(&path, "engines = 5").unwrap();

        match DuelConfig::load_from(&path) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
