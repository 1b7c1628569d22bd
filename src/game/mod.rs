//! Game simulation modules

pub mod character;
pub mod components;
pub mod input;
pub mod inventory;
pub mod physics;
pub mod pickup;
pub mod projectile;
pub mod replication;
pub mod session;
pub mod snapshot;
pub mod timer;
pub mod weapon;
pub mod world;

pub use session::{GameSession, SessionHandle, SessionRegistry, SessionSettings};

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
