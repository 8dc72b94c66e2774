//! Per-connection game sessions

pub mod actor;
pub mod claim;
pub mod event;
pub mod outbound;
pub mod state;
pub mod timers;

pub use actor::{spawn_session, SessionDeps, SessionHandle};
pub use claim::ClaimCoordinator;
