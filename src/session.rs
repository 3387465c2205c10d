use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use tracing::{debug, info, warn};
use web_time::Instant;

use crate::endpoint::{Endpoint, EndpointId, Payload};
use crate::error::MoveError;
use crate::game::Game;
use crate::protocol::Reply;
use crate::protocol::message::ServerMessage;
use crate::registry::SessionId;
use crate::stats::GameRecorder;
use crate::types::{BoardSnapshot, Color, GameInfo, MoveRecord, Phase, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Created, waiting for the second player.
    Waiting,
    Active,
    /// `winner` is `None` when a player left or the game timed out.
    Ended { winner: Option<Color> },
}

impl SessionStatus {
    pub fn phase(self) -> Phase {
        match self {
            Self::Waiting => Phase::Waiting,
            Self::Active => Phase::Active,
            Self::Ended { .. } => Phase::Ended,
        }
    }
}

/// An endpoint registered with one session.
///
/// Payloads are queued here in sequence order and sent by a thread that
/// serves only this endpoint, so a client that stops reading holds up its
/// own deliveries and nothing else. The thread exits once the subscription
/// is dropped and its queue is drained.
struct Subscriber {
    id: EndpointId,
    queue: Sender<Payload>,
}

impl Subscriber {
    fn spawn(endpoint: Arc<dyn Endpoint>) -> io::Result<Self> {
        let id = endpoint.id();
        let (queue, pending) = channel::unbounded::<Payload>();
        thread::Builder::new()
            .name(format!("checkers-endpoint-{id}"))
            .spawn(move || {
                for payload in pending {
                    if let Err(err) = endpoint.send(&payload) {
                        debug!("Send of payload {} to endpoint {} failed: {}", payload.seq, id, err);
                    }
                }
            })?;
        Ok(Self { id, queue })
    }

    fn enqueue(&self, payload: &Payload) -> bool {
        self.queue.send(payload.clone()).is_ok()
    }
}

struct SessionState {
    player2: Option<String>,
    status: SessionStatus,
    game: Game,
    subscribers: Vec<Subscriber>,
    next_seq: u64,
    last_activity: Instant,
}

impl SessionState {
    /// Stamps `reply` with the next sequence number and queues it for every
    /// endpoint. Returns how many queues took it.
    fn post(&mut self, reply: Reply) -> usize {
        self.next_seq += 1;
        let payload = Payload {
            seq: self.next_seq,
            reply,
        };
        self.subscribers
            .iter()
            .filter(|subscriber| subscriber.enqueue(&payload))
            .count()
    }
}

/// `(winner, loser)` player ids, reported once the lock is gone.
type Outcome = (String, String);

/// One game between two players, shared by every connection taking part.
///
/// All board, turn and endpoint-set changes happen under a single mutex.
/// Broadcasts are numbered and queued while it is held, which fixes their
/// order; the network sends themselves run on each endpoint's own thread.
pub struct GameSession {
    id: SessionId,
    player1: String,
    recorder: Arc<dyn GameRecorder>,
    state: Mutex<SessionState>,
}

impl GameSession {
    pub fn new(id: SessionId, player1: impl Into<String>, recorder: Arc<dyn GameRecorder>) -> Self {
        Self::with_game(id, player1, None, Game::new(), recorder)
    }

    fn with_game(
        id: SessionId,
        player1: impl Into<String>,
        player2: Option<String>,
        game: Game,
        recorder: Arc<dyn GameRecorder>,
    ) -> Self {
        let status = if player2.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::Waiting
        };
        Self {
            id,
            player1: player1.into(),
            recorder,
            state: Mutex::new(SessionState {
                player2,
                status,
                game,
                subscribers: Vec::new(),
                next_seq: 0,
                last_activity: Instant::now(),
            }),
        }
    }

    /// A session already joined by both players, playing `game`.
    #[cfg(test)]
    pub(crate) fn with_position(
        id: SessionId,
        player1: &str,
        player2: &str,
        game: Game,
        recorder: Arc<dyn GameRecorder>,
    ) -> Self {
        Self::with_game(id, player1, Some(player2.to_string()), game, recorder)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn player1(&self) -> &str {
        &self.player1
    }

    pub fn player2(&self) -> Option<String> {
        self.lock().player2.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn is_full(&self) -> bool {
        self.lock().player2.is_some()
    }

    pub fn has_started(&self) -> bool {
        self.lock().status != SessionStatus::Waiting
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.lock().status, SessionStatus::Ended { .. })
    }

    pub fn is_player(&self, player: &str) -> bool {
        let state = self.lock();
        self.color_of(&state, player).is_some()
    }

    pub fn turn(&self) -> Color {
        self.lock().game.turn()
    }

    pub fn endpoint_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Time since the session last changed.
    pub fn idle_for(&self) -> Duration {
        self.lock().last_activity.elapsed()
    }

    /// Seats `player2` as black and starts the game. Fails when the seat is
    /// taken or `player2` already plays white.
    pub fn join_game(&self, player2: &str) -> bool {
        let mut state = self.lock();
        if state.player2.is_some() || state.status != SessionStatus::Waiting || player2 == self.player1 {
            return false;
        }
        state.player2 = Some(player2.to_string());
        state.status = SessionStatus::Active;
        state.last_activity = Instant::now();
        info!("Player {} joined game {}", player2, self.id);
        true
    }

    /// Validates and applies one move, then broadcasts the new state (and the
    /// end of the game, if the move won it).
    pub fn try_move(&self, player: &str, from: Position, to: Position) -> Result<MoveRecord, MoveError> {
        let (record, outcome) = {
            let mut state = self.lock();
            if state.status != SessionStatus::Active {
                return Err(MoveError::NotActive);
            }
            let color = self
                .color_of(&state, player)
                .ok_or_else(|| MoveError::NotAPlayer {
                    player: player.to_string(),
                })?;

            let record = state.game.play(color, from, to)?;
            state.last_activity = Instant::now();
            info!("Game {}: {} played {} -> {}", self.id, player, from, to);

            self.post_state(&mut state);
            let outcome = state
                .game
                .winner()
                .map(|winner| self.conclude(&mut state, winner));
            (record, outcome)
        };

        if let Some(outcome) = outcome {
            self.report(outcome);
        }
        Ok(record)
    }

    pub fn make_move(&self, player: &str, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> bool {
        match self.try_move(player, Position::new(from_x, from_y), Position::new(to_x, to_y)) {
            Ok(_) => true,
            Err(err) => {
                debug!("Game {}: rejected move from {}: {}", self.id, player, err);
                false
            }
        }
    }

    /// Queues the current state for every endpoint and returns how many
    /// took it.
    pub fn broadcast_game_state(&self) -> usize {
        let mut state = self.lock();
        self.post_state(&mut state)
    }

    /// True iff one color has no pieces left. The first detection ends the
    /// session, records the result and announces it.
    pub fn check_for_winner(&self) -> bool {
        let outcome = {
            let mut state = self.lock();
            let Some(winner) = state.game.winner() else {
                return false;
            };
            if matches!(state.status, SessionStatus::Ended { .. }) {
                return true;
            }
            self.conclude(&mut state, winner)
        };

        self.report(outcome);
        true
    }

    /// Ends the session without a winner. Returns false if it had already
    /// ended.
    pub fn mark_game_as_abandoned_by(&self, player: &str) -> bool {
        let mut state = self.lock();
        if matches!(state.status, SessionStatus::Ended { .. }) {
            return false;
        }
        info!("Player {} abandoned game {}", player, self.id);
        self.end_without_winner(
            &mut state,
            format!("Player {player} has left the game. Game is now over."),
        );
        true
    }

    /// Ends the session if nothing has happened in it for `max_idle`,
    /// telling its players. Returns false if it is still in use or had
    /// already ended.
    pub fn expire(&self, max_idle: Duration) -> bool {
        let mut state = self.lock();
        if matches!(state.status, SessionStatus::Ended { .. }) || state.last_activity.elapsed() < max_idle {
            return false;
        }
        info!("Game {} expired after {:?} idle", self.id, state.last_activity.elapsed());
        self.end_without_winner(
            &mut state,
            format!("Game {} was closed after a period of inactivity. Game is now over.", self.id),
        );
        true
    }

    /// Board as text, headed by the players and whose turn it is.
    pub fn board_state(&self) -> String {
        let state = self.lock();
        self.render(&state)
    }

    pub fn board_state_json(&self) -> BoardSnapshot {
        let state = self.lock();
        self.snapshot(&state)
    }

    /// Registers an endpoint for broadcasts. Returns false if it was already
    /// registered or its delivery thread could not start.
    pub fn add_endpoint(&self, endpoint: Arc<dyn Endpoint>) -> bool {
        let id = endpoint.id();
        if self.has_endpoint(id) {
            return false;
        }
        let subscriber = match Subscriber::spawn(endpoint) {
            Ok(subscriber) => subscriber,
            Err(err) => {
                warn!("Game {}: no delivery thread for endpoint {}: {}", self.id, id, err);
                return false;
            }
        };

        let mut state = self.lock();
        if state.subscribers.iter().any(|sub| sub.id == id) {
            return false;
        }
        state.subscribers.push(subscriber);
        true
    }

    pub fn remove_endpoint(&self, id: EndpointId) -> bool {
        let mut state = self.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|sub| sub.id != id);
        state.subscribers.len() != before
    }

    fn has_endpoint(&self, id: EndpointId) -> bool {
        self.lock().subscribers.iter().any(|sub| sub.id == id)
    }

    fn color_of(&self, state: &SessionState, player: &str) -> Option<Color> {
        if player == self.player1 {
            Some(Color::White)
        } else if state.player2.as_deref() == Some(player) {
            Some(Color::Black)
        } else {
            None
        }
    }

    fn player_for(&self, state: &SessionState, color: Color) -> String {
        match color {
            Color::White => self.player1.clone(),
            Color::Black => state.player2.clone().unwrap_or_default(),
        }
    }

    fn render(&self, state: &SessionState) -> String {
        format!(
            "Game {} - Player1: {}, Player2: {}, Turn: {}\n\n{}",
            self.id,
            self.player1,
            state.player2.as_deref().unwrap_or("waiting"),
            state.game.turn().seat(),
            state.game.board().render()
        )
    }

    fn snapshot(&self, state: &SessionState) -> BoardSnapshot {
        let winner_id = match state.status {
            SessionStatus::Ended { winner: Some(color) } => Some(self.player_for(state, color)),
            _ => None,
        };
        BoardSnapshot {
            game_id: self.id.to_string(),
            game_info: GameInfo {
                player1_id: self.player1.clone(),
                player2_id: state.player2.clone(),
                current_turn: state.game.turn().seat().to_string(),
                phase: state.status.phase(),
                winner_id,
            },
            board: state.game.board().to_cells(),
        }
    }

    fn post_state(&self, state: &mut SessionState) -> usize {
        let reply = Reply::new(self.render(state), ServerMessage::GameState(self.snapshot(state)));
        state.post(reply)
    }

    fn conclude(&self, state: &mut SessionState, winner: Color) -> Outcome {
        state.status = SessionStatus::Ended {
            winner: Some(winner),
        };
        state.last_activity = Instant::now();

        let winner_id = self.player_for(state, winner);
        let loser_id = self.player_for(state, winner.opponent());
        info!("Game {} won by {} ({})", self.id, winner_id, winner);

        let message = format!(
            "{} WINS! Player {} is victorious!",
            winner.to_string().to_uppercase(),
            winner_id
        );
        state.post(Reply::new(
            message.clone(),
            ServerMessage::GameOver {
                game_id: self.id.to_string(),
                winner_id: Some(winner_id.clone()),
                message,
            },
        ));
        (winner_id, loser_id)
    }

    fn end_without_winner(&self, state: &mut SessionState, message: String) {
        state.status = SessionStatus::Ended { winner: None };
        state.last_activity = Instant::now();
        state.post(Reply::new(
            message.clone(),
            ServerMessage::GameOver {
                game_id: self.id.to_string(),
                winner_id: None,
                message,
            },
        ));
    }

    fn report(&self, (winner, loser): Outcome) {
        self.recorder.on_win(&winner);
        self.recorder.on_loss(&loser);
    }
}
