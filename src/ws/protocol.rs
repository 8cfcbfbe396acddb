//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::game::input::{Intent, Movement};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Held keys, facing and action requests for the next tick
    Move { input: MoveInput },

    /// Attack request without changing held keys
    Swing,

    /// Latency probe, answered by the session without touching the match
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Body of a `move` message
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveInput {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    /// Facing in radians; omitted keeps the previous facing
    #[serde(default)]
    pub angle: Option<f32>,
    #[serde(default)]
    pub swing: bool,
    #[serde(default)]
    pub dash: bool,
}

impl ClientMsg {
    /// The intent this message carries, if any
    pub fn intent(&self) -> Option<Intent> {
        match self {
            ClientMsg::Move { input } => Some(Intent {
                movement: Some(Movement {
                    move_left: input.left,
                    move_right: input.right,
                    move_up: input.up,
                    move_down: input.down,
                }),
                facing_angle: input.angle,
                attack_requested: input.swing,
                dash_requested: input.dash,
            }),
            ClientMsg::Swing => Some(Intent::attack()),
            ClientMsg::Ping { .. } => None,
        }
    }
}

/// Client frame that could not be decoded
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed client message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("binary frames are not supported")]
    Binary,
}

/// Decode one text frame
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// First message on a new session: own identity plus everyone present
    #[serde(rename_all = "camelCase")]
    Init {
        player_id: Uuid,
        player_name: String,
        players: Vec<CombatantState>,
    },

    /// Periodic snapshot of every combatant
    GameState { players: Vec<CombatantState> },

    /// A combatant entered the arena
    PlayerJoined { player: CombatantState },

    /// A combatant's connection closed
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: Uuid },

    /// A life ended
    #[serde(rename_all = "camelCase")]
    PlayerEliminated {
        eliminated_id: Uuid,
        killed_by_id: Uuid,
        killer_state: CombatantState,
    },

    /// Reply to a ping
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Observable combatant state, exactly as clients receive it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CombatantState {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub radius: f32,
    pub is_swinging: bool,
    pub kills: u32,
    pub eliminated: bool,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_move_message() {
        let msg = decode_client_msg(
            r#"{"type":"move","input":{"left":false,"right":true,"up":false,"down":true,"angle":1.5,"swing":true}}"#,
        )
        .unwrap();

        let intent = msg.intent().unwrap();
        let movement = intent.movement.unwrap();
        assert!(movement.move_right && movement.move_down);
        assert!(!movement.move_left && !movement.move_up);
        assert_eq!(intent.facing_angle, Some(1.5));
        assert!(intent.attack_requested);
        assert!(!intent.dash_requested);
    }

    #[test]
    fn missing_fields_default_and_angle_is_optional() {
        let msg = decode_client_msg(r#"{"type":"move","input":{"up":true}}"#).unwrap();
        let intent = msg.intent().unwrap();
        assert!(intent.movement.unwrap().move_up);
        assert_eq!(intent.facing_angle, None);
    }

    #[test]
    fn unknown_input_fields_are_rejected() {
        let err = decode_client_msg(r#"{"type":"move","input":{"up":true,"teleport":true}}"#);
        assert!(matches!(err, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(decode_client_msg(r#"{"type":"fly"}"#).is_err());
        assert!(decode_client_msg("not json").is_err());
    }

    #[test]
    fn swing_and_ping_decode() {
        let swing = decode_client_msg(r#"{"type":"swing"}"#).unwrap();
        assert_eq!(swing.intent(), Some(Intent::attack()));

        let ping = decode_client_msg(r#"{"type":"ping","t":42}"#).unwrap();
        assert!(matches!(ping, ClientMsg::Ping { t: 42 }));
        assert!(ping.intent().is_none());
    }

    fn sample_state(id: Uuid) -> CombatantState {
        CombatantState {
            id,
            name: "Ada".into(),
            x: 1.0,
            y: 2.0,
            angle: 0.5,
            hp: 80.0,
            max_hp: 100.0,
            radius: 25.0,
            is_swinging: true,
            kills: 2,
            eliminated: false,
            color: "#FF6B6B".into(),
        }
    }

    #[test]
    fn combatant_state_uses_camel_case_fields() {
        let id = Uuid::nil();
        let value = serde_json::to_value(sample_state(id)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": id.to_string(),
                "name": "Ada",
                "x": 1.0,
                "y": 2.0,
                "angle": 0.5,
                "hp": 80.0,
                "maxHp": 100.0,
                "radius": 25.0,
                "isSwinging": true,
                "kills": 2,
                "eliminated": false,
                "color": "#FF6B6B"
            })
        );
    }

    #[test]
    fn server_messages_carry_type_tags() {
        let id = Uuid::nil();
        let init = serde_json::to_value(ServerMsg::Init {
            player_id: id,
            player_name: "Ada".into(),
            players: vec![],
        })
        .unwrap();
        assert_eq!(init["type"], "init");
        assert_eq!(init["playerId"], id.to_string());
        assert_eq!(init["playerName"], "Ada");

        let eliminated = serde_json::to_value(ServerMsg::PlayerEliminated {
            eliminated_id: id,
            killed_by_id: id,
            killer_state: sample_state(id),
        })
        .unwrap();
        assert_eq!(eliminated["type"], "playerEliminated");
        assert_eq!(eliminated["killedById"], id.to_string());
        assert_eq!(eliminated["killerState"]["maxHp"], 100.0);

        let left = serde_json::to_value(ServerMsg::PlayerLeft { player_id: id }).unwrap();
        assert_eq!(left["type"], "playerLeft");
        assert_eq!(left["playerId"], id.to_string());

        let state = serde_json::to_value(ServerMsg::GameState { players: vec![] }).unwrap();
        assert_eq!(state["type"], "gameState");
    }
}
