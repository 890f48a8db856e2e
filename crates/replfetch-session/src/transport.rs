//! Transport abstraction.
//!
//! The engine only needs two operations on an already-open duplex channel:
//! write some bytes, and read up to a bounded number of bytes with a
//! per-call timeout. Opening, closing, and channel/interface selection stay
//! with the caller.
//!
//! Per-call timeouts are reported as `io::ErrorKind::TimedOut` (or
//! `WouldBlock`, which some platforms use for the same condition); the
//! engine absorbs those and retries, so a transport must never report a
//! genuine failure under either kind.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

pub mod fake;

/// A byte-oriented duplex channel.
pub trait Transport {
    /// Write all of `data` to the channel.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read up to `max_len` bytes, waiting at most `timeout`. A timeout with
    /// no data surfaces as `io::ErrorKind::TimedOut` or `WouldBlock`; a
    /// closed channel is `io::ErrorKind::UnexpectedEof`.
    fn read_chunk(&mut self, max_len: usize, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Assert or deassert the channel's readiness signal (e.g. DTR on a
    /// USB-CDC link). Transports without one ignore this.
    fn set_line_state(&mut self, _asserted: bool) -> io::Result<()> {
        Ok(())
    }

    /// Whether the remote side routes data only while the readiness signal
    /// is asserted. The session asserts it at connect and deasserts it at
    /// teardown when this returns true.
    fn requires_line_state(&self) -> bool {
        false
    }
}

/// Transport over a TCP stream.
///
/// Test rigs and network-attached boards commonly expose a UART as a TCP
/// port; this adapter maps the stream's read-timeout semantics onto the
/// [`Transport`] contract.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `addr` (`host:port`).
    pub fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport { stream })
    }

    /// Wrap an already-connected stream.
    pub fn new(stream: TcpStream) -> Self {
        TcpTransport { stream }
    }
}

impl Transport for TcpTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    fn read_chunk(&mut self, max_len: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        self.stream.set_read_timeout(Some(timeout))?;
        let mut buf = vec![0u8; max_len];
        match self.stream.read(&mut buf) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "transport closed by remote side",
            )),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) => Err(e),
        }
    }
}
