use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam::channel::Sender;

use crate::error::TransportError;
use crate::protocol::{Encoding, Reply};

pub type EndpointId = u64;

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_endpoint_id() -> EndpointId {
    NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed)
}

/// One outbound message. `seq` orders a session's broadcasts; direct replies
/// use 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub seq: u64,
    pub reply: Reply,
}

impl Payload {
    pub fn direct(reply: Reply) -> Self {
        Self { seq: 0, reply }
    }
}

/// A connected client as seen by a session: something that accepts payloads.
///
/// Implementations report failures instead of panicking; sessions log and
/// drop them.
pub trait Endpoint: Send + Sync {
    fn id(&self) -> EndpointId;

    fn send(&self, payload: &Payload) -> Result<(), TransportError>;
}

/// Byte-stream client (a TCP socket, a pipe, a buffer). Each payload becomes
/// one newline-terminated record in the connection's encoding.
pub struct StreamEndpoint<W> {
    id: EndpointId,
    encoding: Encoding,
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send> StreamEndpoint<W> {
    pub fn new(encoding: Encoding, writer: Arc<Mutex<W>>) -> Self {
        Self {
            id: next_endpoint_id(),
            encoding,
            writer,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl<W: Write + Send> Endpoint for StreamEndpoint<W> {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn send(&self, payload: &Payload) -> Result<(), TransportError> {
        let record = payload.reply.encode(self.encoding)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(record.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Message-oriented client: payloads are handed whole to an event loop
/// through a channel.
pub struct ChannelEndpoint {
    id: EndpointId,
    sender: Sender<Payload>,
}

impl ChannelEndpoint {
    pub fn new(sender: Sender<Payload>) -> Self {
        Self {
            id: next_endpoint_id(),
            sender,
        }
    }
}

impl Endpoint for ChannelEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn send(&self, payload: &Payload) -> Result<(), TransportError> {
        self.sender
            .send(payload.clone())
            .map_err(|_| TransportError::Closed)
    }
}
