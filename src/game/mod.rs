//! Game module

pub mod direction;
pub mod item;
pub mod ledger;
pub mod lives;
pub mod location;
pub mod snake;
pub mod spawner;
pub mod world;

pub use direction::Direction;
pub use item::ItemKind;
pub use ledger::{InventoryLedger, LedgerSnapshot};
pub use location::{Grid, Location};
pub use world::{TickOutcome, World};
