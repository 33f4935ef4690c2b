//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every client read, backend read and backend connect
//! - Turn the result of a bounded read into an explicit outcome value
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeouts are distinct from errors and from an orderly close
//! - An expired read is simply dropped; `read` on a socket is cancel safe,
//!   so nothing is consumed from the stream

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::time;

/// Result of a single bounded read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n` bytes were read into the buffer.
    Data(usize),
    /// The peer closed its side (zero-byte read).
    Closed,
    /// Nothing arrived within the wait window.
    TimedOut,
    /// The read failed.
    Failed(io::Error),
}

/// Read once into `buf`, waiting at most `wait`.
pub async fn read_with_timeout<R>(reader: &mut R, buf: &mut [u8], wait: Duration) -> ReadOutcome
where
    R: AsyncRead + Unpin,
{
    match time::timeout(wait, reader.read(buf)).await {
        Err(_) => ReadOutcome::TimedOut,
        Ok(Ok(0)) => ReadOutcome::Closed,
        Ok(Ok(n)) => ReadOutcome::Data(n),
        Ok(Err(e)) => ReadOutcome::Failed(e),
    }
}

/// Open a TCP connection to `addr`, failing with `ErrorKind::TimedOut` after `wait`.
pub async fn connect_with_timeout(addr: &str, wait: Duration) -> io::Result<TcpStream> {
    match time::timeout(wait, TcpStream::connect(addr)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect to {} timed out after {:?}", addr, wait),
        )),
    }
}
