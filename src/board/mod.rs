//! Board representation and game-state types.
//!
//! Contains the static topology (areas, neighbors), the mutable position
//! (control, units, sieges, season), units, orders, and the JSON board
//! description used to build all of it.

pub mod area;
pub mod config;
pub mod map;
pub mod order;
pub mod state;
pub mod unit;

pub use area::{Area, AreaId, Neighbor};
pub use config::{AreaConfig, BoardConfig, NeighborConfig};
pub use map::{BoardMap, TopologyError};
pub use order::{Order, OrderSpec, OrderType};
pub use state::{BoardState, Season};
pub use unit::{Player, Unit, UnitType};
