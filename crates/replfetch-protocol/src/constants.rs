//! Protocol constants
//!
//! Control bytes understood by the remote shell, the default markers used to
//! delimit and classify responses, and the default sizing/timing values for
//! response collection.

// ============================================================================
// Control Bytes (host → board)
// ============================================================================

/// Interrupt the interactive loop and enter raw (non-echoing) script mode.
pub const CTRL_ENTER_RAW: u8 = 0x01;
/// Leave raw mode and return to the interactive prompt.
pub const CTRL_EXIT_RAW: u8 = 0x02;
/// End script input and start execution.
pub const CTRL_EXECUTE: u8 = 0x04;

// ============================================================================
// Markers (board → host)
// ============================================================================

/// Default sentinel emitted as the last bytes of every script's output.
///
/// Must never occur inside legitimate response content; this is a protocol
/// precondition the engine cannot verify.
pub const DEFAULT_SENTINEL: &str = "_--EOT--_";
/// Prefix emitted by a script's error path, ahead of the exception text.
pub const ERROR_MARKER: &str = "###ERROR###:";
/// Interactive prompt sequence; anything before its last occurrence in a
/// frame is residual shell output, not response content.
pub const PROMPT_MARKER: &str = ">>> ";
/// Delimiter between filenames in a listing response.
pub const LIST_DELIMITER: char = ',';

// ============================================================================
// Sizes and Timing
// ============================================================================

/// Default ceiling on the size of a collected response frame.
pub const DEFAULT_MAX_RESPONSE: usize = 512 * 1024;
/// Default upper bound for a single transport read.
pub const DEFAULT_READ_CHUNK: usize = 4096;
/// Default per-read timeout in milliseconds. Reads timing out at this
/// granularity are expected while the board executes a script.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;
/// Default wall-clock budget for collecting one complete response.
pub const DEFAULT_DEADLINE_MS: u64 = 10_000;
