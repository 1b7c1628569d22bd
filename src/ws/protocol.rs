//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::inventory::InventoryView;
use crate::game::pickup::PickupSnapshot;
use crate::game::replication::{Multicast, ReplicatedCharacter, ServerRequest};
use crate::game::weapon::WeaponType;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the session the connection was assigned to
    JoinSession {
        display_name: String,
    },

    /// A replicated action for the authority to apply
    Request {
        request: ServerRequest,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave current session
    LeaveSession,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of session join, addressed to the joining player
    SessionJoined {
        user_id: Uuid,
        session_id: Uuid,
        tick: u64,
        characters: Vec<ReplicatedCharacter>,
        pickups: Vec<PickupSnapshot>,
    },

    /// Player joined the session
    PlayerJoined {
        character: ReplicatedCharacter,
    },

    /// Player left the session
    PlayerLeft {
        user_id: Uuid,
        reason: String,
    },

    /// Replicated state (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: u64,
        characters: Vec<ReplicatedCharacter>,
        pickups: Vec<PickupSnapshot>,
        /// Events that occurred since last snapshot
        events: Vec<GameEvent>,
    },

    /// Authority broadcast every observer applies immediately
    Multicast {
        message: Multicast,
    },

    /// Owner-only weapon inventory view
    Inventory {
        user_id: Uuid,
        view: InventoryView,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// A server message with its audience on the session broadcast channel
#[derive(Debug, Clone)]
pub struct Outgoing {
    /// `None` for everyone in the session
    pub to: Option<Uuid>,
    pub msg: ServerMsg,
}

impl Outgoing {
    pub fn all(msg: ServerMsg) -> Self {
        Self { to: None, msg }
    }

    pub fn to(user_id: Uuid, msg: ServerMsg) -> Self {
        Self {
            to: Some(user_id),
            msg,
        }
    }

    pub fn is_for(&self, user_id: Uuid) -> bool {
        self.to.map_or(true, |to| to == user_id)
    }
}

/// Why an incoming frame was not turned into a [`ClientMsg`]
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Binary frames are not supported")]
    Binary,
}

impl ClientMsg {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Gameplay events carried in snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A character walked over a visible pickup
    PickupCollected {
        pickup_id: Uuid,
        character_id: Uuid,
        weapon_type: WeaponType,
    },

    /// A collected pickup is visible again
    PickupRespawned {
        pickup_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_request_parses_from_json() {
        let text = r#"{"type":"request","request":{"kind":"equip","weapon":"rifle"}}"#;
        let msg = ClientMsg::parse(text).unwrap();

        match msg {
            ClientMsg::Request { request } => {
                assert_eq!(request, ServerRequest::Equip { weapon: WeaponType::Rifle });
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn inventory_is_addressed_to_its_owner() {
        use crate::game::components::WeaponVisuals;
        use crate::game::inventory::WeaponInventory;

        let owner = Uuid::new_v4();
        let view = WeaponInventory::new(&mut WeaponVisuals::new()).view();
        let out = Outgoing::to(owner, ServerMsg::Inventory { user_id: owner, view });
        assert!(out.is_for(owner));
        assert!(!out.is_for(Uuid::new_v4()));

        let out = Outgoing::all(ServerMsg::PlayerLeft {
            user_id: owner,
            reason: "disconnected".to_string(),
        });
        assert!(out.is_for(Uuid::new_v4()));
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        assert!(matches!(
            ClientMsg::parse("{\"type\":\"teleport\"}"),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
