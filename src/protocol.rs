//! Message vocabulary between the server core and clients
//!
//! Both directions are JSON objects with a `"type"` discriminator. The
//! transport itself (sockets, framing) is supplied by the embedder through
//! [`Transport`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::session::SessionPhase;
use crate::sim::entity::{PlayerId, PlayerInput};
use crate::sim::snapshot::{DungeonView, PickupView, StateSnapshot};
use crate::sim::{Direction, RoomCoord};

/// Opaque handle for one client connection, assigned by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Outbound delivery. Sends are best effort: a closed peer is silently skipped.
pub trait Transport: Send + Sync {
    fn send(&self, conn: ConnectionId, msg: &ServerMessage);

    fn broadcast(&self, conns: &[ConnectionId], msg: &ServerMessage) {
        for &conn in conns {
            self.send(conn, msg);
        }
    }
}

/// Client to server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Create,
    Join {
        #[serde(default)]
        code: String,
    },
    Ready {
        #[serde(default)]
        body_color: Option<String>,
        #[serde(default)]
        cape_color: Option<String>,
    },
    Start,
    Input(InputFrame),
    Exit,
}

impl ClientMessage {
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Raw per-frame input as sent by the client
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputFrame {
    pub dx: Option<f32>,
    pub dy: Option<f32>,
    pub facing: Option<f32>,
    pub shooting: bool,
    /// Negative means no switch requested
    pub switch_to: Option<i64>,
    pub pickup: bool,
    pub drop_weapon: bool,
}

impl InputFrame {
    /// Merge into a player's buffered input
    ///
    /// Movement is clamped to [-1, 1] per axis. Switch, pickup and drop
    /// requests stay latched until the next tick consumes them.
    pub fn apply(&self, input: &mut PlayerInput) {
        input.move_dir = Vec2::new(
            self.dx.unwrap_or(0.0).clamp(-1.0, 1.0),
            self.dy.unwrap_or(0.0).clamp(-1.0, 1.0),
        );
        input.facing = self.facing.filter(|f| f.is_finite()).unwrap_or(0.0);
        input.shooting = self.shooting;
        if let Some(slot) = self.switch_to.filter(|&s| s >= 0) {
            input.switch_to = Some(slot as usize);
        }
        input.pickup |= self.pickup;
        input.drop_weapon |= self.drop_weapon;
    }
}

/// One entry in the lobby roster
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub ready: bool,
    pub body_color: String,
    pub cape_color: String,
}

/// Server to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Joined {
        code: String,
        player_id: PlayerId,
        is_host: bool,
        seed: u64,
    },
    LobbyState {
        players: Vec<LobbyPlayer>,
        state: SessionPhase,
    },
    GameStart {
        seed: u64,
        dungeon: DungeonView,
        floor: u32,
    },
    State(StateSnapshot),
    EnemyKilled {
        enemy_id: u32,
        room: RoomCoord,
        xp: u32,
    },
    PlayerHit {
        player_id: PlayerId,
        damage: i32,
        hp: i32,
    },
    PlayerDead {
        player_id: PlayerId,
    },
    SpawnText {
        x: f32,
        y: f32,
        text: String,
        color: String,
    },
    PickupTaken {
        pickup_id: u32,
        player_id: PlayerId,
        room: RoomCoord,
    },
    WeaponDropped {
        pickup: PickupView,
        room: RoomCoord,
    },
    RoomCleared {
        room: RoomCoord,
    },
    ChestOpened {
        room: RoomCoord,
    },
    Explosion {
        x: f32,
        y: f32,
        room: RoomCoord,
    },
    NextFloor {
        floor: u32,
        seed: u64,
        dungeon: DungeonView,
    },
    GameOver {
        floor: u32,
        kills: u32,
    },
    HostTransferred,
    PlayerEnterRoom {
        player_id: PlayerId,
        room: RoomCoord,
        from_dir: Direction,
        px: f32,
        py: f32,
    },
    Error {
        msg: String,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The `"type"` tag this message serializes with
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Joined { .. } => "joined",
            ServerMessage::LobbyState { .. } => "lobby_state",
            ServerMessage::GameStart { .. } => "game_start",
            ServerMessage::State(_) => "state",
            ServerMessage::EnemyKilled { .. } => "enemy_killed",
            ServerMessage::PlayerHit { .. } => "player_hit",
            ServerMessage::PlayerDead { .. } => "player_dead",
            ServerMessage::SpawnText { .. } => "spawn_text",
            ServerMessage::PickupTaken { .. } => "pickup_taken",
            ServerMessage::WeaponDropped { .. } => "weapon_dropped",
            ServerMessage::RoomCleared { .. } => "room_cleared",
            ServerMessage::ChestOpened { .. } => "chest_opened",
            ServerMessage::Explosion { .. } => "explosion",
            ServerMessage::NextFloor { .. } => "next_floor",
            ServerMessage::GameOver { .. } => "game_over",
            ServerMessage::HostTransferred => "host_transferred",
            ServerMessage::PlayerEnterRoom { .. } => "player_enter_room",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures everything sent, in order
    #[derive(Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<(ConnectionId, ServerMessage)>>,
    }

    impl RecordingTransport {
        /// Drain and return everything recorded so far
        pub fn take(&self) -> Vec<(ConnectionId, ServerMessage)> {
            let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *sent)
        }

        /// Drain, keeping only what reached `conn`
        pub fn take_for(&self, conn: ConnectionId) -> Vec<ServerMessage> {
            self.take()
                .into_iter()
                .filter(|(c, _)| *c == conn)
                .map(|(_, m)| m)
                .collect()
        }

        /// Drain and return the message kinds delivered to `conn`
        pub fn kinds_for(&self, conn: ConnectionId) -> Vec<&'static str> {
            self.take_for(conn).iter().map(ServerMessage::kind).collect()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, conn: ConnectionId, msg: &ServerMessage) {
            let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
            sent.push((conn, msg.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::PlayerInput;

    #[test]
    fn test_parse_inbound_vocabulary() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"create"}"#).unwrap(),
            ClientMessage::Create
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"join","code":"ab2c"}"#).unwrap(),
            ClientMessage::Join {
                code: "ab2c".to_string()
            }
        );
        assert_eq!(
            ClientMessage::parse(r##"{"type":"ready","bodyColor":"#fff"}"##).unwrap(),
            ClientMessage::Ready {
                body_color: Some("#fff".to_string()),
                cape_color: None
            }
        );
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"input","dx":1,"shooting":true,"switchTo":2}"#),
            Ok(ClientMessage::Input(InputFrame {
                shooting: true,
                switch_to: Some(2),
                ..
            }))
        ));
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        for bad in ["", "not json", r#"{"type":"dance"}"#, r#"{"code":"ABCD"}"#, "42"] {
            assert!(
                matches!(ClientMessage::parse(bad), Err(ProtocolError::Malformed(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_input_is_clamped_and_latched() {
        let mut input = PlayerInput::default();
        InputFrame {
            dx: Some(5.0),
            dy: Some(-3.0),
            facing: Some(1.5),
            pickup: true,
            switch_to: Some(-1),
            ..Default::default()
        }
        .apply(&mut input);
        assert_eq!(input.move_dir, Vec2::new(1.0, -1.0));
        assert_eq!(input.facing, 1.5);
        assert_eq!(input.switch_to, None);
        assert!(input.pickup);

        // A later frame without the flag does not cancel a pending pickup
        InputFrame::default().apply(&mut input);
        assert!(input.pickup);
        assert_eq!(input.move_dir, Vec2::ZERO);
    }

    #[test]
    fn test_outbound_tags_and_field_case() {
        let msg = ServerMessage::PlayerEnterRoom {
            player_id: 2,
            room: RoomCoord::new(1, 3),
            from_dir: Direction::Left,
            px: 10.0,
            py: 20.0,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "player_enter_room");
        assert_eq!(value["playerId"], 2);
        assert_eq!(value["fromDir"], "left");
        assert_eq!(value["room"]["c"], 3);

        let value = serde_json::to_value(ServerMessage::HostTransferred).unwrap();
        assert_eq!(value, serde_json::json!({"type": "host_transferred"}));
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let samples = [
            ServerMessage::GameOver { floor: 2, kills: 9 },
            ServerMessage::Error {
                msg: "x".to_string(),
            },
            ServerMessage::ChestOpened {
                room: RoomCoord::ORIGIN,
            },
            ServerMessage::LobbyState {
                players: Vec::new(),
                state: SessionPhase::Forming,
            },
        ];
        for msg in samples {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["type"], msg.kind());
        }
    }
}
