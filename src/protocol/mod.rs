pub mod dispatch;
pub mod line;
pub mod message;

use crate::error::ProtocolError;
use crate::registry::SessionId;
use crate::types::Position;
use message::ServerMessage;

/// A parsed client request, whichever sub-protocol it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Create,
    Join(SessionId),
    Move { from: Position, to: Position },
    State,
    Help,
    Leave,
    Stats,
}

/// How a connection talks: plain text lines or JSON objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Text,
    Json,
}

impl Encoding {
    /// A connection whose first request is a JSON object speaks JSON.
    pub fn detect(first_line: &str) -> Self {
        if first_line.trim_start().starts_with('{') {
            Self::Json
        } else {
            Self::Text
        }
    }

    pub fn parse(self, line: &str) -> Result<Command, ProtocolError> {
        match self {
            Self::Text => line::parse_line(line),
            Self::Json => message::parse_message(line),
        }
    }
}

/// One outbound message in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub message: ServerMessage,
}

impl Reply {
    pub fn new(text: impl Into<String>, message: ServerMessage) -> Self {
        Self {
            text: text.into(),
            message,
        }
    }

    pub fn error(reason: impl ToString) -> Self {
        let message = reason.to_string();
        Self::new(message.clone(), ServerMessage::Error { message })
    }

    /// Newline-terminated wire form for `encoding`.
    pub fn encode(&self, encoding: Encoding) -> Result<String, serde_json::Error> {
        let mut out = match encoding {
            Encoding::Text => self.text.clone(),
            Encoding::Json => serde_json::to_string(&self.message)?,
        };
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}
