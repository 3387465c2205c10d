use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::session::GameSession;
use crate::stats::GameRecorder;

pub type SessionId = u64;

struct Sessions {
    next_id: SessionId,
    map: HashMap<SessionId, Arc<GameSession>>,
}

/// Maps session ids to live sessions.
///
/// The registry lock only guards the map. Session operations run on a cloned
/// `Arc` after it has been released, so games never contend through here.
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    recorder: Arc<dyn GameRecorder>,
}

impl SessionRegistry {
    pub fn new(recorder: Arc<dyn GameRecorder>) -> Self {
        Self {
            sessions: Mutex::new(Sessions {
                next_id: 1,
                map: HashMap::new(),
            }),
            recorder,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_session(&self, player1: &str) -> SessionId {
        let mut sessions = self.lock();
        let id = sessions.next_id;
        sessions.next_id += 1;
        let session = GameSession::new(id, player1, Arc::clone(&self.recorder));
        sessions.map.insert(id, Arc::new(session));
        info!("Game {} created by {}", id, player1);
        id
    }

    pub fn get_session(&self, id: SessionId) -> Option<Arc<GameSession>> {
        self.lock().map.get(&id).cloned()
    }

    pub fn join_session(&self, id: SessionId, player2: &str) -> bool {
        self.get_session(id)
            .is_some_and(|session| session.join_game(player2))
    }

    pub fn remove_session(&self, id: SessionId) -> Option<Arc<GameSession>> {
        self.lock().map.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops finished sessions, and ends then drops those that have seen
    /// nothing for `max_idle`. Players of an expired game are told before it
    /// goes. Returns how many went.
    pub fn sweep(&self, max_idle: Duration) -> usize {
        let candidates: Vec<Arc<GameSession>> = self.lock().map.values().cloned().collect();
        let stale: Vec<SessionId> = candidates
            .iter()
            .filter(|session| session.is_ended() || session.expire(max_idle))
            .map(|session| session.id())
            .collect();

        let mut sessions = self.lock();
        for id in &stale {
            sessions.map.remove(id);
        }
        if !stale.is_empty() {
            info!("Swept {} idle or finished game(s)", stale.len());
        }
        stale.len()
    }
}
