//! Hermannia round adjudicator.
//!
//! Validates the orders players give each round of The Battle for Hermannia,
//! resolves them into battles and a new board position, and runs sessions
//! that drive the round lifecycle over an abstract message transport.

pub mod board;
pub mod config;
pub mod game;
pub mod protocol;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod validate;
