//! Game registry.
//!
//! Maps game names to factories. The registry is an ordinary value that the
//! caller builds and passes to whatever creates sessions.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::board::{BoardConfig, TopologyError};
use crate::config::SessionConfig;
use crate::game::Game;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown game '{0}'")]
    UnknownGame(String),

    #[error("game '{0}' is already registered")]
    Duplicate(String),

    #[error("invalid board: {0}")]
    Topology(#[from] TopologyError),
}

type Factory = Box<dyn Fn(&SessionConfig) -> Result<Game, RegistryError> + Send + Sync>;

#[derive(Default)]
pub struct GameRegistry {
    factories: BTreeMap<String, Factory>,
}

impl GameRegistry {
    pub fn new() -> Self {
        GameRegistry::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&SessionConfig) -> Result<Game, RegistryError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Registers a game played on `board`. The board is checked once here
    /// and every new game gets a fresh copy of its starting position.
    pub fn register_board(&mut self, board: BoardConfig) -> Result<(), RegistryError> {
        let start = board.build()?;
        self.register(board.name.clone(), move |config: &SessionConfig| {
            Ok(Game::new(start.clone(), config))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, config: &SessionConfig) -> Result<Game, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownGame(name.to_string()))?;
        factory(config)
    }
}
