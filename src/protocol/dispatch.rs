//! Turns parsed commands into session operations and replies.

use std::sync::Arc;

use tracing::{debug, info};

use crate::endpoint::{Endpoint, Payload};
use crate::error::TransportError;
use crate::protocol::line::{HELP_LINES, HELP_TEXT};
use crate::protocol::message::ServerMessage;
use crate::protocol::{Command, Reply};
use crate::registry::{SessionId, SessionRegistry};
use crate::session::GameSession;
use crate::stats::ScoreBoard;
use crate::types::Position;

const NOT_LOGGED_IN: &str = "Please login first with LOGIN username";
const NOT_IN_GAME: &str = "You are not in a game";
const ALREADY_IN_GAME: &str = "You are already in a game. Use LEAVE first";
const SESSION_NOT_FOUND: &str = "Game session not found";

/// Per-connection state: who is logged in, which game they sit in and where
/// their messages go.
pub struct Client {
    username: Option<String>,
    session: Option<SessionId>,
    endpoint: Arc<dyn Endpoint>,
}

impl Client {
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            username: None,
            session: None,
            endpoint,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Sends a reply to this client only.
    pub fn reply(&self, reply: Reply) -> Result<(), TransportError> {
        self.endpoint.send(&Payload::direct(reply))
    }
}

pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    scores: Arc<ScoreBoard>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, scores: Arc<ScoreBoard>) -> Self {
        Self { registry, scores }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs `command` for `client` and sends the reply. Only a failure to
    /// reach `client` itself is returned.
    ///
    /// Broadcasts travel through each endpoint's delivery queue, so their
    /// arrival relative to the reply is not fixed. A MOVE queues the new
    /// state before its reply is sent. A JOIN queues it after.
    pub fn dispatch(&self, client: &mut Client, command: Command) -> Result<(), TransportError> {
        let (reply, follow_up) = self.handle(client, command);
        client.reply(reply)?;
        if let Some(session) = follow_up {
            session.broadcast_game_state();
        }
        Ok(())
    }

    /// Detaches a departing client, abandoning any game still in progress.
    pub fn disconnect(&self, client: &mut Client) {
        let Some(session) = client.session.take().and_then(|id| self.registry.get_session(id)) else {
            return;
        };
        session.remove_endpoint(client.endpoint.id());
        if session.is_ended() {
            return;
        }
        if let Some(user) = client.username.as_deref() {
            session.mark_game_as_abandoned_by(user);
        }
    }

    fn handle(&self, client: &mut Client, command: Command) -> (Reply, Option<Arc<GameSession>>) {
        let user = match (&command, client.username.clone()) {
            (Command::Help | Command::Login(_), _) => String::new(),
            (_, Some(user)) => user,
            (_, None) => return (Reply::error(NOT_LOGGED_IN), None),
        };

        match command {
            Command::Help => {
                let help = ServerMessage::Help {
                    commands: HELP_LINES.clone(),
                };
                (Reply::new(HELP_TEXT.as_str(), help), None)
            }
            Command::Login(name) => (self.login(client, name), None),
            Command::Create => (self.create(client, &user), None),
            Command::Join(id) => self.join(client, &user, id),
            Command::Move { from, to } => (self.play(client, &user, from, to), None),
            Command::State => (self.state(client), None),
            Command::Leave => (self.leave(client, &user), None),
            Command::Stats => (self.stats(&user), None),
        }
    }

    fn login(&self, client: &mut Client, name: String) -> Reply {
        if self.live_session(client).is_some() {
            return Reply::error(ALREADY_IN_GAME);
        }
        info!("User {} logged in", name);
        let text = format!("Logged in as {name}");
        client.username = Some(name.clone());
        Reply::new(text, ServerMessage::LoginSuccess { username: name })
    }

    fn create(&self, client: &mut Client, user: &str) -> Reply {
        if self.live_session(client).is_some() {
            return Reply::error(ALREADY_IN_GAME);
        }
        self.detach(client);

        let id = self.registry.create_session(user);
        if let Some(session) = self.registry.get_session(id) {
            session.add_endpoint(Arc::clone(&client.endpoint));
        }
        client.session = Some(id);
        Reply::new(
            format!("Game created with ID: {id}"),
            ServerMessage::GameCreated {
                game_id: id.to_string(),
            },
        )
    }

    fn join(&self, client: &mut Client, user: &str, id: SessionId) -> (Reply, Option<Arc<GameSession>>) {
        if self.live_session(client).is_some() {
            return (Reply::error(ALREADY_IN_GAME), None);
        }
        let Some(session) = self.registry.get_session(id) else {
            return (Reply::error("Failed to join game"), None);
        };
        if !session.join_game(user) {
            return (Reply::error("Failed to join game"), None);
        }
        self.detach(client);

        session.add_endpoint(Arc::clone(&client.endpoint));
        client.session = Some(id);
        let reply = Reply::new(
            format!("Joined game with ID: {id}"),
            ServerMessage::GameJoined {
                game_id: id.to_string(),
            },
        );
        (reply, Some(session))
    }

    fn play(&self, client: &Client, user: &str, from: Position, to: Position) -> Reply {
        let Some(id) = client.session else {
            return Reply::error(NOT_IN_GAME);
        };
        let Some(session) = self.registry.get_session(id) else {
            return Reply::error(SESSION_NOT_FOUND);
        };

        match session.try_move(user, from, to) {
            Ok(record) => Reply::new(
                "Move accepted",
                ServerMessage::MoveResult {
                    success: true,
                    message: "Move accepted".to_string(),
                    record: Some(record),
                },
            ),
            Err(err) => {
                debug!("Game {}: {} sent an invalid move: {}", id, user, err);
                let message = format!("Invalid move: {err}");
                Reply::new(
                    message.clone(),
                    ServerMessage::MoveResult {
                        success: false,
                        message,
                        record: None,
                    },
                )
            }
        }
    }

    fn state(&self, client: &Client) -> Reply {
        let Some(id) = client.session else {
            return Reply::error(NOT_IN_GAME);
        };
        match self.registry.get_session(id) {
            Some(session) => Reply::new(
                session.board_state(),
                ServerMessage::GameState(session.board_state_json()),
            ),
            None => Reply::error(SESSION_NOT_FOUND),
        }
    }

    fn leave(&self, client: &mut Client, user: &str) -> Reply {
        let Some(id) = client.session else {
            return Reply::error(NOT_IN_GAME);
        };
        self.disconnect(client);
        info!("User {} left game {}", user, id);
        Reply::new(
            format!("Left game {id}"),
            ServerMessage::GameLeft {
                game_id: id.to_string(),
            },
        )
    }

    fn stats(&self, user: &str) -> Reply {
        let tally = self.scores.tally(user);
        Reply::new(
            format!("Stats for {user}: {} wins, {} losses", tally.wins, tally.losses),
            ServerMessage::Stats {
                username: user.to_string(),
                wins: tally.wins,
                losses: tally.losses,
            },
        )
    }

    /// The client's session, if it is still registered and not over.
    fn live_session(&self, client: &Client) -> Option<Arc<GameSession>> {
        client
            .session
            .and_then(|id| self.registry.get_session(id))
            .filter(|session| !session.is_ended())
    }

    /// Stops broadcasts from a finished game the client still points at.
    fn detach(&self, client: &mut Client) {
        if let Some(session) = client.session.take().and_then(|id| self.registry.get_session(id)) {
            session.remove_endpoint(client.endpoint.id());
        }
    }
}
