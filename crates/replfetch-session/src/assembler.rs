//! Frame assembly.
//!
//! The transport delivers response bytes in arbitrarily-sized,
//! arbitrarily-timed chunks with no framing of its own. The assembler
//! accumulates reads into a buffer and scans for the sentinel after each
//! append; the bytes preceding the first occurrence are the frame, and the
//! sentinel plus anything after it is discarded.

use std::io;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use log::{debug, trace};

use replfetch_protocol::{
    ProtocolError, DEFAULT_DEADLINE_MS, DEFAULT_MAX_RESPONSE, DEFAULT_READ_CHUNK,
    DEFAULT_READ_TIMEOUT_MS,
};

use crate::transport::Transport;

/// Sizing and timing for one collection loop.
#[derive(Debug, Clone)]
pub struct DeadlinePolicy {
    /// Upper bound for a single transport read.
    pub read_chunk: usize,
    /// Timeout for a single read. Expiring here is not a failure; the board
    /// is usually still executing the script.
    pub per_read_timeout: Duration,
    /// Wall-clock budget for the whole collection loop. Expiring here is
    /// [`ProtocolError::Timeout`].
    pub overall_deadline: Duration,
    /// Ceiling on the buffered response size.
    pub max_response: usize,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        DeadlinePolicy {
            read_chunk: DEFAULT_READ_CHUNK,
            per_read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            overall_deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            max_response: DEFAULT_MAX_RESPONSE,
        }
    }
}

/// Collect one response frame: everything the transport delivers up to (but
/// not including) the first occurrence of `sentinel`.
///
/// Bytes buffered after the sentinel are discarded; the engine does not
/// pipeline a second command's data. On [`ProtocolError::Timeout`] the
/// partial buffer is discarded too — without the sentinel there is no way
/// to know whether it was complete.
pub fn collect<T: Transport>(
    transport: &mut T,
    sentinel: &[u8],
    policy: &DeadlinePolicy,
) -> Result<Vec<u8>, ProtocolError> {
    let deadline = Instant::now() + policy.overall_deadline;
    let mut buffer = BytesMut::with_capacity(policy.read_chunk);

    loop {
        if let Some(pos) = find_sentinel(&buffer, sentinel) {
            let frame = buffer.split_to(pos);
            trace!(
                "sentinel found, frame is {} bytes ({} trailing bytes discarded)",
                frame.len(),
                buffer.len() - sentinel.len()
            );
            return Ok(frame.to_vec());
        }

        if buffer.len() > policy.max_response {
            return Err(ProtocolError::ResponseTooLarge {
                max: policy.max_response,
                actual: buffer.len(),
            });
        }

        if Instant::now() >= deadline {
            debug!(
                "deadline elapsed with {} bytes buffered and no sentinel",
                buffer.len()
            );
            return Err(ProtocolError::Timeout);
        }

        match transport.read_chunk(policy.read_chunk, policy.per_read_timeout) {
            Ok(data) => buffer.extend_from_slice(&data),
            Err(e) if is_read_timeout(&e) => {
                // Expected while the script runs; keep waiting for output.
                trace!("per-read timeout, retrying");
            }
            Err(e) => return Err(ProtocolError::TransportFailure(e)),
        }
    }
}

/// Position of the first sentinel occurrence in `buffer`, if complete.
fn find_sentinel(buffer: &[u8], sentinel: &[u8]) -> Option<usize> {
    if sentinel.is_empty() || buffer.len() < sentinel.len() {
        return None;
    }
    buffer.windows(sentinel.len()).position(|w| w == sentinel)
}

fn is_read_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::{ScriptedRead, ScriptedTransport};

    const SENTINEL: &[u8] = b"_--EOT--_";

    fn quick_policy() -> DeadlinePolicy {
        DeadlinePolicy {
            read_chunk: 64,
            per_read_timeout: Duration::from_millis(1),
            overall_deadline: Duration::from_millis(50),
            max_response: 4096,
        }
    }

    #[test]
    fn test_collect_single_chunk() {
        let mut transport = ScriptedTransport::with_chunks(&[b"hello_--EOT--_"]);
        let frame = collect(&mut transport, SENTINEL, &quick_policy()).unwrap();
        assert_eq!(frame, b"hello");
    }

    #[test]
    fn test_collect_chunking_independent() {
        let stream = b"some response text_--EOT--_";
        let expected = b"some response text";

        // Whole stream in one read.
        let mut whole = ScriptedTransport::with_chunks(&[stream]);
        assert_eq!(
            collect(&mut whole, SENTINEL, &quick_policy()).unwrap(),
            expected
        );

        // One byte per read.
        let mut bytewise = ScriptedTransport::new(
            stream
                .iter()
                .map(|b| ScriptedRead::Data(vec![*b]))
                .collect(),
        );
        assert_eq!(
            collect(&mut bytewise, SENTINEL, &quick_policy()).unwrap(),
            expected
        );

        // Split in the middle of the sentinel.
        let mut split = ScriptedTransport::with_chunks(&[
            &stream[..stream.len() - 4],
            &stream[stream.len() - 4..],
        ]);
        assert_eq!(
            collect(&mut split, SENTINEL, &quick_policy()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_collect_discards_bytes_after_sentinel() {
        let mut transport =
            ScriptedTransport::with_chunks(&[b"frame_--EOT--_trailing junk"]);
        let frame = collect(&mut transport, SENTINEL, &quick_policy()).unwrap();
        assert_eq!(frame, b"frame");
    }

    #[test]
    fn test_per_read_timeouts_are_absorbed() {
        let mut transport = ScriptedTransport::new(vec![
            ScriptedRead::TimedOut,
            ScriptedRead::Data(b"par".to_vec()),
            ScriptedRead::TimedOut,
            ScriptedRead::TimedOut,
            ScriptedRead::Data(b"tial_--EOT--_".to_vec()),
        ]);
        let frame = collect(&mut transport, SENTINEL, &quick_policy()).unwrap();
        assert_eq!(frame, b"partial");
    }

    #[test]
    fn test_missing_sentinel_times_out() {
        let mut transport = ScriptedTransport::with_chunks(&[b"no terminator here"]);
        let err = collect(&mut transport, SENTINEL, &quick_policy()).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout));
    }

    #[test]
    fn test_transport_error_aborts_collection() {
        let mut transport = ScriptedTransport::new(vec![
            ScriptedRead::Data(b"par".to_vec()),
            ScriptedRead::Error(io::ErrorKind::BrokenPipe, "cable yanked"),
        ]);
        let err = collect(&mut transport, SENTINEL, &quick_policy()).unwrap_err();
        assert!(matches!(err, ProtocolError::TransportFailure(_)));
    }

    #[test]
    fn test_response_ceiling() {
        let mut policy = quick_policy();
        policy.max_response = 8;
        let mut transport =
            ScriptedTransport::with_chunks(&[b"way more than eight bytes"]);
        let err = collect(&mut transport, SENTINEL, &policy).unwrap_err();
        assert!(matches!(err, ProtocolError::ResponseTooLarge { max: 8, .. }));
    }

    #[test]
    fn test_empty_frame() {
        let mut transport = ScriptedTransport::with_chunks(&[b"_--EOT--_"]);
        let frame = collect(&mut transport, SENTINEL, &quick_policy()).unwrap();
        assert!(frame.is_empty());
    }
}
