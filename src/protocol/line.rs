//! Line-oriented sub-protocol: `VERB arg...`, verbs case-insensitive.

use once_cell::sync::Lazy;

use crate::error::ProtocolError;
use crate::protocol::Command;
use crate::types::Position;

const COMMANDS: [(&str, &str); 8] = [
    ("LOGIN username", "Log in with a username"),
    ("CREATE", "Create a new game"),
    ("JOIN gameId", "Join an existing game"),
    ("MOVE fromX fromY toX toY", "Make a move"),
    ("STATE", "Get the current game state"),
    ("LEAVE", "Leave the current game"),
    ("STATS", "Show your wins and losses"),
    ("HELP", "Show this help message"),
];

pub static HELP_LINES: Lazy<Vec<String>> = Lazy::new(|| {
    COMMANDS
        .iter()
        .map(|(usage, about)| format!("{usage} - {about}"))
        .collect()
});

pub static HELP_TEXT: Lazy<String> = Lazy::new(|| {
    let mut text = String::from("Available commands:\n");
    for line in HELP_LINES.iter() {
        text.push_str(line);
        text.push('\n');
    }
    text
});

pub fn parse_line(line: &str) -> Result<Command, ProtocolError> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();

    match verb.to_ascii_uppercase().as_str() {
        "LOGIN" => words
            .next()
            .map(|name| Command::Login(name.to_string()))
            .ok_or(ProtocolError::MissingUsername),
        "CREATE" => Ok(Command::Create),
        "JOIN" => words
            .next()
            .and_then(|id| id.parse().ok())
            .map(Command::Join)
            .ok_or(ProtocolError::InvalidGameId),
        "MOVE" => parse_move(words),
        "STATE" => Ok(Command::State),
        "HELP" => Ok(Command::Help),
        "LEAVE" => Ok(Command::Leave),
        "STATS" => Ok(Command::Stats),
        _ => Err(ProtocolError::UnknownCommand(verb.to_string())),
    }
}

fn parse_move<'a>(words: impl Iterator<Item = &'a str>) -> Result<Command, ProtocolError> {
    let coords = words
        .map(str::parse::<i32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ProtocolError::InvalidMoveFormat)?;

    match *coords.as_slice() {
        [from_x, from_y, to_x, to_y] => Ok(Command::Move {
            from: Position::new(from_x, from_y),
            to: Position::new(to_x, to_y),
        }),
        _ => Err(ProtocolError::InvalidMoveFormat),
    }
}
