use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::endpoint::StreamEndpoint;
use crate::error::{ProtocolError, TransportError};
use crate::protocol::dispatch::{Client, Dispatcher};
use crate::protocol::{Encoding, Reply};

pub const WELCOME: &str = "Welcome to Checkers Server";

/// Longest request line accepted, not counting the line ending.
pub const MAX_LINE_BYTES: usize = 1024;

enum Frame {
    Line(String),
    TooLong,
    Eof,
}

/// Serves one client until it hangs up or can no longer be written to.
///
/// The first non-empty line decides the encoding for the rest of the
/// connection. Whatever happens, the client is detached from its game on
/// the way out.
pub fn serve<R, W>(reader: R, writer: W, dispatcher: &Dispatcher) -> Result<(), TransportError>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));
    {
        let mut out = writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{WELCOME}")?;
        out.flush()?;
    }

    let mut session: Option<(Encoding, Client)> = None;
    let result = read_loop(reader, &writer, dispatcher, &mut session);
    if let Some((_, client)) = session.as_mut() {
        dispatcher.disconnect(client);
    }
    result
}

fn read_loop<R, W>(
    mut reader: R,
    writer: &Arc<Mutex<W>>,
    dispatcher: &Dispatcher,
    session: &mut Option<(Encoding, Client)>,
) -> Result<(), TransportError>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let mut buf = Vec::with_capacity(256);
    loop {
        let raw = match next_frame(&mut reader, &mut buf)? {
            Frame::Eof => return Ok(()),
            Frame::TooLong => {
                warn!("Rejected a request longer than {} bytes", MAX_LINE_BYTES);
                reject(writer, session, ProtocolError::LineTooLong { limit: MAX_LINE_BYTES })?;
                continue;
            }
            Frame::Line(raw) => raw,
        };
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (encoding, client) = session.get_or_insert_with(|| {
            let encoding = Encoding::detect(line);
            let endpoint = StreamEndpoint::new(encoding, Arc::clone(writer));
            (encoding, Client::new(Arc::new(endpoint)))
        });

        match encoding.parse(line) {
            Ok(command) => dispatcher.dispatch(client, command)?,
            Err(err) => {
                warn!("Rejected request {:?}: {}", line, err);
                client.reply(Reply::error(err))?;
            }
        }
    }
}

/// Reads one line of at most `MAX_LINE_BYTES`. Bytes that are not UTF-8
/// become U+FFFD. The rest of an overlong line is discarded.
fn next_frame<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Frame> {
    buf.clear();
    let limit = MAX_LINE_BYTES as u64 + 1;
    if reader.by_ref().take(limit).read_until(b'\n', buf)? == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() != Some(&b'\n') && buf.len() > MAX_LINE_BYTES {
        skip_line(reader)?;
        return Ok(Frame::TooLong);
    }
    Ok(Frame::Line(String::from_utf8_lossy(buf).into_owned()))
}

fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Sends a protocol error to a client that may not have picked an encoding
/// yet. Such a client gets plain text.
fn reject<W: Write>(
    writer: &Arc<Mutex<W>>,
    session: &Option<(Encoding, Client)>,
    err: ProtocolError,
) -> Result<(), TransportError> {
    if let Some((_, client)) = session {
        return client.reply(Reply::error(err));
    }
    let record = Reply::error(err).encode(Encoding::Text)?;
    let mut out = writer.lock().unwrap_or_else(PoisonError::into_inner);
    out.write_all(record.as_bytes())?;
    out.flush()?;
    Ok(())
}
