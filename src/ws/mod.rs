//! WebSocket endpoint

mod handler;

pub use handler::ws_handler;
