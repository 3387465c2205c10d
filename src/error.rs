use thiserror::Error;

use crate::types::{Color, Position};

/// Why a submitted move was refused. None of these change any state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("the game is not in progress")]
    NotActive,

    #[error("{player} is not playing in this game")]
    NotAPlayer { player: String },

    #[error("it is {expected}'s turn")]
    NotYourTurn { expected: Color },

    #[error("move {from} -> {to} leaves the board")]
    OutOfBounds { from: Position, to: Position },

    #[error("there is no piece at {at}")]
    NoPiece { at: Position },

    #[error("the piece at {at} belongs to the opponent")]
    WrongColor { at: Position },

    #[error("the piece at {from} cannot move to {to}")]
    IllegalDestination { from: Position, to: Position },

    #[error("a capture is available and must be taken")]
    CaptureRequired,
}

/// A request line or message the server could not understand.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Unknown command. Type HELP for available commands.")]
    UnknownCommand(String),

    #[error("Missing username. Use: LOGIN username")]
    MissingUsername,

    #[error("Invalid game ID. Use: JOIN gameId")]
    InvalidGameId,

    #[error("Invalid move format. Use: MOVE fromX fromY toX toY")]
    InvalidMoveFormat,

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Line too long (limit {limit} bytes)")]
    LineTooLong { limit: usize },
}

/// A failed delivery to one endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("endpoint is closed")]
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} is empty")]
    Empty { key: &'static str },

    #[error("{key}={value} is not a valid {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}
