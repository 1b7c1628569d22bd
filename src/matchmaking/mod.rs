//! Lobby placement into running sessions

pub mod service;

pub use service::{LobbyError, LobbyService};
