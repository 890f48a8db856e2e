//! Commands and the script builder.
//!
//! A [`Command`] is a logical request; the [`ScriptBuilder`] renders it into
//! the MicroPython script text that actually gets submitted to the board.
//! Every rendered script upholds the same contract:
//!
//! - it ends by printing the sentinel exactly once, from a `finally:` block,
//!   so the host always observes a terminator even when the script's own
//!   logic fails;
//! - its error path prints [`crate::ERROR_MARKER`] followed by the exception
//!   text, ahead of the sentinel;
//! - listing output uses the comma-joined, percent-escaped filename encoding
//!   expected by the classifier.

use crate::constants::DEFAULT_SENTINEL;

/// A logical request to the board. Exists only for the duration of one
/// request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the filenames in the board's filesystem root.
    List,

    /// Read the contents of one file.
    Read {
        /// Path of the file on the board.
        path: String,
    },
}

/// How `Read` scripts emit file bytes.
///
/// The engine treats payload bytes opaquely; binary-safe transfer is a
/// property of the builder/classifier pair, not of the transport loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadEncoding {
    /// Emit the file as text, verbatim. Only safe for content that cannot
    /// contain the sentinel or stray control bytes.
    #[default]
    Text,
    /// Emit the file base64-encoded for binary-safe transfer. Decode with
    /// [`crate::decode_content`].
    Base64,
}

/// Renders the script text for a [`Command`].
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    sentinel: String,
    encoding: PayloadEncoding,
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptBuilder {
    /// Create a builder with the default sentinel and text payload encoding.
    pub fn new() -> Self {
        ScriptBuilder {
            sentinel: DEFAULT_SENTINEL.to_string(),
            encoding: PayloadEncoding::default(),
        }
    }

    /// Use a custom sentinel marker. The caller must ensure the sentinel
    /// cannot occur inside legitimate response content.
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Set the payload encoding used by `Read` scripts.
    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The sentinel the rendered scripts will emit.
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// The payload encoding used by `Read` scripts.
    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    /// Render the script text for a command, without the line terminator.
    pub fn render(&self, command: &Command) -> String {
        match command {
            Command::List => self.render_list(),
            Command::Read { path } => self.render_read(path),
        }
    }

    fn render_list(&self) -> String {
        format!(
            "try:\n\
             \x20   import os\n\
             \x20   _ns = []\n\
             \x20   for _n in os.listdir():\n\
             \x20       _n = _n.replace('%', '%25').replace(',', '%2C').replace('>', '%3E')\n\
             \x20       _n = _n.replace('\\r', '%0D').replace('\\n', '%0A')\n\
             \x20       _ns.append(_n)\n\
             \x20   print(','.join(_ns), end='')\n\
             {trailer}",
            trailer = self.trailer(),
        )
    }

    fn render_read(&self, path: &str) -> String {
        let path = py_str(path);
        let body = match self.encoding {
            PayloadEncoding::Text => format!(
                "\x20   with open({path}, 'r') as _f:\n\
                 \x20       print(_f.read(), end='')\n"
            ),
            PayloadEncoding::Base64 => format!(
                "\x20   import ubinascii\n\
                 \x20   with open({path}, 'rb') as _f:\n\
                 \x20       print(ubinascii.b2a_base64(_f.read()).decode().strip(), end='')\n"
            ),
        };
        format!("try:\n{body}{trailer}", trailer = self.trailer())
    }

    /// Shared error and cleanup tail. The `finally:` print is what makes the
    /// sentinel unconditional.
    fn trailer(&self) -> String {
        format!(
            "except Exception as _e:\n\
             \x20   print({marker} + str(_e), end='')\n\
             finally:\n\
             \x20   print({sentinel}, end='')",
            marker = py_str(crate::ERROR_MARKER),
            sentinel = py_str(&self.sentinel),
        )
    }
}

/// Quote a string as a Python single-quoted literal.
fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
