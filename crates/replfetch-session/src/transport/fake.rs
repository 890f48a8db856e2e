//! Scripted fake transport used in tests to exercise the engine without a
//! board on the other end.

use std::collections::VecDeque;
use std::io;
use std::thread;
use std::time::Duration;

use replfetch_protocol::CTRL_EXECUTE;

use crate::transport::Transport;

/// One scripted outcome for a `read_chunk` call.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    /// Deliver these bytes (split across calls if larger than `max_len`).
    Data(Vec<u8>),
    /// Report a per-call timeout with no data.
    TimedOut,
    /// Fail the read with this error kind.
    Error(io::ErrorKind, &'static str),
}

impl From<&[u8]> for ScriptedRead {
    fn from(data: &[u8]) -> Self {
        ScriptedRead::Data(data.to_vec())
    }
}

/// Fake transport fed a script of read outcomes; records every write.
///
/// Reads past the end of the script report per-call timeouts, as an idle
/// line would, sleeping out the requested timeout like a blocking
/// transport. With [`ScriptedTransport::with_responses`], outcomes are
/// released one batch per execution trigger, matching a board that only
/// produces output after a script runs.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    reads: VecDeque<ScriptedRead>,
    pending: VecDeque<Vec<ScriptedRead>>,
    writes: Vec<Vec<u8>>,
    requires_line_state: bool,
    line_states: Vec<bool>,
}

impl ScriptedTransport {
    /// Create a transport that serves the given read outcomes in order,
    /// immediately available.
    pub fn new(reads: Vec<ScriptedRead>) -> Self {
        ScriptedTransport {
            reads: reads.into(),
            ..Default::default()
        }
    }

    /// Create a transport that delivers each slice as one read.
    pub fn with_chunks(chunks: &[&[u8]]) -> Self {
        Self::new(chunks.iter().map(|c| ScriptedRead::from(*c)).collect())
    }

    /// Create a transport that releases one batch of outcomes per observed
    /// execution trigger byte. An empty batch starves that command.
    pub fn with_responses(batches: Vec<Vec<ScriptedRead>>) -> Self {
        ScriptedTransport {
            pending: batches.into(),
            ..Default::default()
        }
    }

    /// Declare that this transport needs its readiness signal asserted.
    pub fn require_line_state(mut self) -> Self {
        self.requires_line_state = true;
        self
    }

    /// Every write issued against this transport, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Readiness-signal transitions observed, in order.
    pub fn line_states(&self) -> &[bool] {
        &self.line_states
    }
}

impl Transport for ScriptedTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writes.push(data.to_vec());
        if data == [CTRL_EXECUTE].as_slice() {
            if let Some(batch) = self.pending.pop_front() {
                self.reads.extend(batch);
            }
        }
        Ok(())
    }

    fn read_chunk(&mut self, max_len: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        match self.reads.pop_front() {
            Some(ScriptedRead::Data(mut data)) => {
                if data.len() > max_len {
                    let rest = data.split_off(max_len);
                    self.reads.push_front(ScriptedRead::Data(rest));
                }
                Ok(data)
            }
            Some(ScriptedRead::TimedOut) | None => {
                // Behave like a blocking read on an idle line.
                thread::sleep(timeout);
                Err(io::Error::new(io::ErrorKind::TimedOut, "scripted read timeout"))
            }
            Some(ScriptedRead::Error(kind, msg)) => Err(io::Error::new(kind, msg)),
        }
    }

    fn set_line_state(&mut self, asserted: bool) -> io::Result<()> {
        self.line_states.push(asserted);
        Ok(())
    }

    fn requires_line_state(&self) -> bool {
        self.requires_line_state
    }
}
