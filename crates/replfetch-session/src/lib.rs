//! Raw-mode session engine.
//!
//! This crate drives the replfetch protocol over any byte-oriented duplex
//! [`Transport`]: it forces the remote shell into raw script mode, submits
//! the script for a command, triggers execution, and collects the response
//! by scanning for the sentinel marker — surviving arbitrarily-chunked
//! reads and per-read timeouts along the way.
//!
//! # Example
//!
//! ```rust,ignore
//! use replfetch_protocol::Command;
//! use replfetch_session::{Session, SessionConfig, TcpTransport};
//!
//! let transport = TcpTransport::connect("192.168.4.1:5050")?;
//! let mut session = Session::connect(transport, SessionConfig::default())?;
//! let listing = session.execute(Command::List)?;
//! ```
//!
//! One command is in flight at a time; the session owns its transport
//! exclusively for the connected lifetime.

pub mod assembler;
pub mod session;
pub mod transport;

pub use assembler::{collect, DeadlinePolicy};
pub use session::{Session, SessionConfig, SessionState};
pub use transport::{TcpTransport, Transport};
