//! TCP front end: accept loop, worker pool, idle-session sweeper.

pub mod connection;
pub mod pool;

use std::collections::HashMap;
use std::io::{self, BufReader};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::protocol::dispatch::Dispatcher;
use crate::registry::SessionRegistry;
use crate::stats::ScoreBoard;
use pool::WorkerPool;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// A client that accepts no bytes for this long is treated as gone.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open sockets, so a shutdown can unblock workers stuck reading them.
#[derive(Default)]
struct Connections {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, TcpStream>>,
}

impl Connections {
    fn track(&self, stream: &TcpStream) -> Option<u64> {
        let clone = stream.try_clone().ok()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.open.lock().unwrap_or_else(PoisonError::into_inner).insert(id, clone);
        Some(id)
    }

    fn forget(&self, id: u64) {
        self.open.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    fn close_all(&self) {
        for (_, stream) in self.open.lock().unwrap_or_else(PoisonError::into_inner).drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn bind(config: ServerConfig, registry: Arc<SessionRegistry>, scores: Arc<ScoreBoard>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)?;
        Ok(Self {
            listener,
            config,
            dispatcher: Arc::new(Dispatcher::new(registry, scores)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.dispatcher.registry()
    }

    /// Serves on the calling thread until the listener fails.
    pub fn run(self) -> io::Result<()> {
        self.serve_until(Arc::new(AtomicBool::new(false)))
    }

    /// Serves on a background thread.
    pub fn spawn(self) -> io::Result<ServerHandle> {
        let addr = self.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));
        let thread = thread::Builder::new().name("checkers-accept".to_string()).spawn({
            let stop = Arc::clone(&stop);
            move || self.serve_until(stop)
        })?;
        Ok(ServerHandle {
            addr,
            stop,
            thread: Some(thread),
        })
    }

    fn serve_until(self, stop: Arc<AtomicBool>) -> io::Result<()> {
        let addr = self.local_addr()?;
        let pool = WorkerPool::new(self.config.workers)?;
        let connections = Arc::new(Connections::default());
        let (sweep_stop, sweeper) = self.spawn_sweeper()?;
        info!("Listening on {} with {} workers", addr, pool.size());

        for stream in self.listener.incoming() {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("Failed to accept connection: {}", err);
                    continue;
                }
            };
            let dispatcher = Arc::clone(&self.dispatcher);
            let connections = Arc::clone(&connections);
            pool.execute(move || handle_connection(stream, &dispatcher, &connections));
        }

        info!("Shutting down {}", addr);
        drop(sweep_stop);
        let _ = sweeper.join();
        connections.close_all();
        drop(pool);
        Ok(())
    }

    fn spawn_sweeper(&self) -> io::Result<(channel::Sender<()>, JoinHandle<()>)> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let registry = Arc::clone(self.registry());
        let idle_timeout = self.config.idle_timeout;
        let interval = (idle_timeout / 4).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);

        let handle = thread::Builder::new()
            .name("checkers-sweeper".to_string())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(interval) {
                    let removed = registry.sweep(idle_timeout);
                    debug!("Sweep removed {} session(s), {} left", removed, registry.len());
                }
            })?;
        Ok((stop_tx, handle))
    }
}

fn handle_connection(stream: TcpStream, dispatcher: &Dispatcher, connections: &Connections) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
    if let Err(err) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
        warn!("Could not set write timeout for {}: {}", peer, err);
    }
    let reader = match stream.try_clone() {
        Ok(read_half) => BufReader::new(read_half),
        Err(err) => {
            warn!("Could not split stream from {}: {}", peer, err);
            return;
        }
    };
    let tracked = connections.track(&stream);
    info!("Client connected from {}", peer);

    match connection::serve(reader, stream, dispatcher) {
        Ok(()) => info!("Client {} disconnected", peer),
        Err(err) => warn!("Connection to {} ended: {}", peer, err),
    }
    if let Some(id) = tracked {
        connections.forget(id);
    }
}

/// Running server. Dropping the handle leaves the server running.
pub struct ServerHandle {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting, closes open connections and waits for the workers.
    pub fn shutdown(mut self) -> io::Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the blocking accept.
        let wake = if self.addr.ip().is_unspecified() {
            SocketAddr::from((Ipv4Addr::LOCALHOST, self.addr.port()))
        } else {
            self.addr
        };
        let _ = TcpStream::connect(wake);

        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| io::Error::other("server thread panicked"))?,
            None => Ok(()),
        }
    }
}
