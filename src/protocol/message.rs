//! Message-oriented sub-protocol: one JSON object per line, discriminated by
//! its `type` field.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::protocol::Command;
use crate::registry::SessionId;
use crate::types::{BoardSnapshot, MoveRecord, Position};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Login { username: String },
    Create,
    Join { game_id: SessionId },
    Move { from_x: i32, from_y: i32, to_x: i32, to_y: i32 },
    State,
    Help,
    Leave,
    Stats,
}

impl From<ClientMessage> for Command {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Login { username } => Command::Login(username),
            ClientMessage::Create => Command::Create,
            ClientMessage::Join { game_id } => Command::Join(game_id),
            ClientMessage::Move {
                from_x,
                from_y,
                to_x,
                to_y,
            } => Command::Move {
                from: Position::new(from_x, from_y),
                to: Position::new(to_x, to_y),
            },
            ClientMessage::State => Command::State,
            ClientMessage::Help => Command::Help,
            ClientMessage::Leave => Command::Leave,
            ClientMessage::Stats => Command::Stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    #[serde(rename = "login_success")]
    LoginSuccess { username: String },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "game_created")]
    GameCreated { game_id: String },

    #[serde(rename = "game_joined")]
    GameJoined { game_id: String },

    #[serde(rename = "game_left")]
    GameLeft { game_id: String },

    #[serde(rename = "MoveResult")]
    MoveResult {
        success: bool,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record: Option<MoveRecord>,
    },

    #[serde(rename = "game_state")]
    GameState(BoardSnapshot),

    #[serde(rename = "game_over")]
    GameOver {
        game_id: String,
        winner_id: Option<String>,
        message: String,
    },

    #[serde(rename = "help")]
    Help { commands: Vec<String> },

    #[serde(rename = "stats")]
    Stats {
        username: String,
        wins: u32,
        losses: u32,
    },
}

pub fn parse_message(line: &str) -> Result<Command, ProtocolError> {
    serde_json::from_str::<ClientMessage>(line)
        .map(Command::from)
        .map_err(|err| ProtocolError::MalformedMessage(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{GameInfo, Phase};

    #[test]
    fn client_messages_parse_by_type_tag() {
        assert_eq!(
            parse_message(r#"{"type":"login","username":"alice"}"#),
            Ok(Command::Login("alice".to_string()))
        );
        assert_eq!(parse_message(r#"{"type":"create"}"#), Ok(Command::Create));
        assert_eq!(parse_message(r#"{"type":"join","gameId":7}"#), Ok(Command::Join(7)));
        assert_eq!(
            parse_message(r#"{"type":"move","fromX":1,"fromY":2,"toX":0,"toY":3}"#),
            Ok(Command::Move {
                from: Position::new(1, 2),
                to: Position::new(0, 3),
            })
        );
    }

    #[test]
    fn malformed_messages_are_protocol_errors() {
        assert!(matches!(
            parse_message(r#"{"type":"teleport"}"#),
            Err(ProtocolError::MalformedMessage(_))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"move","fromX":1}"#),
            Err(ProtocolError::MalformedMessage(_))
        ));
        assert!(matches!(parse_message("not json"), Err(ProtocolError::MalformedMessage(_))));
    }

    #[test]
    fn server_messages_carry_their_discriminator() {
        let created = serde_json::to_value(ServerMessage::GameCreated {
            game_id: "3".to_string(),
        })
        .unwrap();
        let result = serde_json::to_value(ServerMessage::MoveResult {
            success: false,
            message: "Invalid move".to_string(),
            record: None,
        })
        .unwrap();

        assert_eq!(created, json!({"type": "game_created", "gameId": "3"}));
        assert_eq!(
            result,
            json!({"type": "MoveResult", "success": false, "message": "Invalid move"})
        );
    }

    #[test]
    fn game_state_flattens_snapshot_fields() {
        let snapshot = BoardSnapshot {
            game_id: "1".to_string(),
            game_info: GameInfo {
                player1_id: "alice".to_string(),
                player2_id: None,
                current_turn: "Player1".to_string(),
                phase: Phase::Waiting,
                winner_id: None,
            },
            board: vec![vec![None; 8]; 8],
        };

        let value = serde_json::to_value(ServerMessage::GameState(snapshot.clone())).unwrap();

        assert_eq!(value["type"], "game_state");
        assert_eq!(value["gameId"], "1");
        assert_eq!(value["gameInfo"]["player1Id"], "alice");
        assert_eq!(value["gameInfo"]["phase"], "waiting");
        assert!(value["board"][0][0].is_null());
        let back: ServerMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, ServerMessage::GameState(snapshot));
    }
}
