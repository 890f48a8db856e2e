//! MicroPython raw-REPL file-fetch protocol
//!
//! This crate provides the wire-level types for pulling files off a board
//! running a MicroPython-style interactive shell over a byte-oriented duplex
//! channel (USB-serial in the common case). The shell's interactive mode
//! echoes input and prints prompts, so real output is unrecoverable unless
//! the shell is first switched into raw (non-echoing) script mode and the
//! submitted script brackets its own output with an out-of-band sentinel.
//!
//! # Protocol Overview
//!
//! - **Mode entry** (host → board): a single control byte interrupts the
//!   interactive loop and enters raw mode.
//! - **Payload** (host → board): the script text for a command, terminated
//!   with `\r\n`; a second control byte triggers execution.
//! - **Response** (board → host): whatever the script prints, always ending
//!   with the sentinel marker (the scripts emit it from a `finally:` block,
//!   so it arrives even when the script's own logic fails).
//!
//! # Example
//!
//! ```rust,ignore
//! use replfetch_protocol::{Classifier, Command, ScriptBuilder};
//!
//! // Build the script for a command
//! let builder = ScriptBuilder::new();
//! let script = builder.render(&Command::List);
//!
//! // Classify the collected response frame
//! let classifier = Classifier::new();
//! let response = classifier.classify(b"alpha.txt,beta.py", &Command::List)?;
//! ```
//!
//! The actual byte shuffling (handshake, chunk reassembly, deadlines) lives
//! in the `replfetch-session` crate; everything here is a pure function of
//! already-collected bytes.

mod commands;
mod constants;
mod error;
mod responses;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use responses::*;
