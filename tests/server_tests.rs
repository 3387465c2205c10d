use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use checkers::config::ServerConfig;
use checkers::registry::SessionRegistry;
use checkers::server::connection::WELCOME;
use checkers::server::{Server, ServerHandle};
use checkers::stats::ScoreBoard;
use serde_json::{Value, json};

fn start() -> ServerHandle {
    let config = ServerConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        workers: 4,
        ..ServerConfig::default()
    };
    let scores = Arc::new(ScoreBoard::default());
    let registry = Arc::new(SessionRegistry::new(scores.clone()));
    Server::bind(config, registry, scores).unwrap().spawn().unwrap()
}

struct Peer {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Peer {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut peer = Self {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
        };
        assert_eq!(peer.line(), WELCOME);
        peer
    }

    fn line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line.trim_end().to_string()
    }

    fn send(&mut self, line: &str) {
        writeln!(self.writer, "{line}").unwrap();
    }

    fn send_json(&mut self, value: Value) {
        self.send(&value.to_string());
    }

    /// Next message of type `kind`, skipping anything else.
    fn expect(&mut self, kind: &str) -> Value {
        loop {
            let value: Value = serde_json::from_str(&self.line()).unwrap();
            if value["type"] == kind {
                return value;
            }
        }
    }
}

#[test]
fn two_json_clients_play_and_one_leaves() {
    let server = start();
    let addr = server.local_addr();
    let mut alice = Peer::connect(addr);
    let mut bob = Peer::connect(addr);

    alice.send_json(json!({"type": "login", "username": "alice"}));
    assert_eq!(alice.expect("login_success")["username"], "alice");
    alice.send_json(json!({"type": "create"}));
    let game_id = alice.expect("game_created")["gameId"].clone();
    assert_eq!(game_id, "1");

    bob.send_json(json!({"type": "login", "username": "bob"}));
    bob.expect("login_success");
    bob.send_json(json!({"type": "join", "gameId": 1}));
    assert_eq!(bob.expect("game_joined")["gameId"], "1");
    let state = bob.expect("game_state");
    assert_eq!(state["gameInfo"]["player2Id"], "bob");
    assert_eq!(state["gameInfo"]["phase"], "active");

    alice.send_json(json!({"type": "move", "fromX": 1, "fromY": 2, "toX": 0, "toY": 3}));
    let result = alice.expect("MoveResult");
    assert_eq!(result["success"], true);
    let state = bob.expect("game_state");
    assert_eq!(state["gameInfo"]["currentTurn"], "Player2");
    assert_eq!(state["board"][3][0]["color"], "white");

    bob.send_json(json!({"type": "move", "fromX": 0, "fromY": 5, "toX": 0, "toY": 4}));
    assert_eq!(bob.expect("MoveResult")["success"], false);

    drop(bob);
    let over = alice.expect("game_over");
    assert_eq!(over["message"], "Player bob has left the game. Game is now over.");
    assert!(over["winnerId"].is_null());

    drop(alice);
    server.shutdown().unwrap();
}

#[test]
fn text_clients_get_plain_lines() {
    let server = start();
    let mut peer = Peer::connect(server.local_addr());

    peer.send("LOGIN");
    assert_eq!(peer.line(), "Missing username. Use: LOGIN username");
    peer.send("state");
    assert_eq!(peer.line(), "Please login first with LOGIN username");
    peer.send("login carol");
    assert_eq!(peer.line(), "Logged in as carol");
    peer.send("STATS");
    assert_eq!(peer.line(), "Stats for carol: 0 wins, 0 losses");
    peer.send("HELP");
    assert_eq!(peer.line(), "Available commands:");
    let help: Vec<String> = (0..8).map(|_| peer.line()).collect();
    assert_eq!(help.last().map(String::as_str), Some("HELP - Show this help message"));

    drop(peer);
    server.shutdown().unwrap();
}

#[test]
fn garbage_bytes_do_not_end_the_connection() {
    let server = start();
    let mut peer = Peer::connect(server.local_addr());

    peer.send("LOGIN dave");
    assert_eq!(peer.line(), "Logged in as dave");
    peer.writer.write_all(b"\xff\xfe\n").unwrap();
    assert_eq!(peer.line(), "Unknown command. Type HELP for available commands.");
    peer.send("STATS");
    assert_eq!(peer.line(), "Stats for dave: 0 wins, 0 losses");

    drop(peer);
    server.shutdown().unwrap();
}
