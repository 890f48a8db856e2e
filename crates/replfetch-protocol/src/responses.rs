//! Response classification.
//!
//! A collected frame is not clean script output: some transports still
//! prepend residual shell artifacts (a trailing interactive prompt, boot
//! banner text) when a read races the shell's switch into raw mode. The
//! classifier strips those boundary artifacts first, then decodes the
//! remainder per the command that produced it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::trace;

use crate::commands::{Command, PayloadEncoding};
use crate::constants::{ERROR_MARKER, LIST_DELIMITER, PROMPT_MARKER};
use crate::error::{ProtocolError, ProtocolResult};

/// Tagged result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedResponse {
    /// Filenames from a `List` command, decoded and unescaped, in the order
    /// the board reported them.
    Listing(Vec<String>),

    /// Raw textual content from a `Read` command. Never mutated beyond the
    /// boundary-artifact stripping; decode with [`decode_content`] if the
    /// payload was base64-encoded.
    Content(String),

    /// The remote script ran, hit its error path, and reported a
    /// domain-level failure (e.g. file not found). The protocol itself
    /// worked correctly.
    RemoteError(String),
}

impl ClassifiedResponse {
    /// Check if this is a remote-reported failure.
    pub fn is_remote_error(&self) -> bool {
        matches!(self, ClassifiedResponse::RemoteError(_))
    }

    /// Get the filenames if this is a `Listing` response.
    pub fn as_listing(&self) -> Option<&[String]> {
        match self {
            ClassifiedResponse::Listing(names) => Some(names),
            _ => None,
        }
    }

    /// Get the text if this is a `Content` response.
    pub fn as_content(&self) -> Option<&str> {
        match self {
            ClassifiedResponse::Content(text) => Some(text),
            _ => None,
        }
    }

    /// Get the message if this is a `RemoteError` response.
    pub fn as_remote_error(&self) -> Option<&str> {
        match self {
            ClassifiedResponse::RemoteError(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Decodes collected frames into [`ClassifiedResponse`] values.
#[derive(Debug, Clone)]
pub struct Classifier {
    prompt_marker: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Create a classifier using the default interactive prompt marker.
    pub fn new() -> Self {
        Classifier {
            prompt_marker: PROMPT_MARKER.to_string(),
        }
    }

    /// Use a custom prompt marker for boundary stripping.
    pub fn with_prompt_marker(mut self, marker: impl Into<String>) -> Self {
        self.prompt_marker = marker.into();
        self
    }

    /// Classify a collected frame for the command that produced it.
    pub fn classify(
        &self,
        frame: &[u8],
        command: &Command,
    ) -> ProtocolResult<ClassifiedResponse> {
        match command {
            Command::List => self.classify_listing(frame),
            Command::Read { .. } => self.classify_content(frame),
        }
    }

    fn classify_listing(&self, frame: &[u8]) -> ProtocolResult<ClassifiedResponse> {
        let text = std::str::from_utf8(frame)
            .map_err(|_| ProtocolError::Malformed("listing is not valid UTF-8".to_string()))?;
        let cleaned = self.strip_boundary(text).trim();

        if let Some(message) = find_remote_error(cleaned) {
            return Ok(ClassifiedResponse::RemoteError(message));
        }

        // An empty listing encodes as the empty string; only a bad escape
        // sequence is a parse failure.
        if cleaned.is_empty() {
            return Ok(ClassifiedResponse::Listing(Vec::new()));
        }

        let mut names = Vec::new();
        for part in cleaned.split(LIST_DELIMITER) {
            // Join-based encodings produce empty entries around stray
            // delimiters; those are artifacts, not filenames.
            if part.is_empty() {
                continue;
            }
            names.push(unescape_name(part)?);
        }
        Ok(ClassifiedResponse::Listing(names))
    }

    fn classify_content(&self, frame: &[u8]) -> ProtocolResult<ClassifiedResponse> {
        let text = String::from_utf8_lossy(frame);
        let cleaned = self.strip_boundary(&text);

        if let Some(message) = find_remote_error(cleaned) {
            return Ok(ClassifiedResponse::RemoteError(message));
        }

        Ok(ClassifiedResponse::Content(cleaned.to_string()))
    }

    /// Discard everything up to and including the last prompt occurrence.
    /// Applied before any structural parse; this is the only defense
    /// against boundary noise. When no prompt is present there is no
    /// artifact, and the text passes through untouched.
    fn strip_boundary<'a>(&self, text: &'a str) -> &'a str {
        match text.rfind(&self.prompt_marker) {
            Some(pos) => {
                trace!("discarding {} bytes of boundary artifacts", pos);
                let after = &text[pos + self.prompt_marker.len()..];
                // The line-ending echoed after the prompt belongs to the
                // artifact, not the response.
                after.trim_start_matches(|c: char| c.is_ascii_control())
            }
            None => text,
        }
    }
}

/// Extract the message if the cleaned text begins with the remote error
/// marker. A marker occurring mid-content is just content.
fn find_remote_error(cleaned: &str) -> Option<String> {
    cleaned
        .strip_prefix(ERROR_MARKER)
        .map(|rest| rest.trim_end().to_string())
}

/// Undo the percent-escaping applied to a single filename by the listing
/// script.
fn unescape_name(name: &str) -> ProtocolResult<String> {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let digits = (
            chars.next().and_then(|d| d.to_digit(16)),
            chars.next().and_then(|d| d.to_digit(16)),
        );
        match digits {
            (Some(hi), Some(lo)) => out.push((hi * 16 + lo) as u8 as char),
            _ => {
                return Err(ProtocolError::Malformed(format!(
                    "invalid escape sequence in filename: {name:?}"
                )))
            }
        }
    }
    Ok(out)
}

/// Decode a `Content` payload per the encoding the read script used.
pub fn decode_content(text: &str, encoding: PayloadEncoding) -> ProtocolResult<Vec<u8>> {
    match encoding {
        PayloadEncoding::Text => Ok(text.as_bytes().to_vec()),
        PayloadEncoding::Base64 => BASE64
            .decode(text.trim())
            .map_err(|e| ProtocolError::Malformed(format!("invalid base64 payload: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_cmd() -> Command {
        Command::Read {
            path: "f.txt".to_string(),
        }
    }

    #[test]
    fn test_listing_plain() {
        let response = Classifier::new()
            .classify(b"alpha.txt,beta.py", &Command::List)
            .unwrap();
        assert_eq!(
            response.as_listing(),
            Some(&["alpha.txt".to_string(), "beta.py".to_string()][..])
        );
    }

    #[test]
    fn test_listing_discards_prompt_artifact() {
        let response = Classifier::new()
            .classify(b"garbage>>> alpha.txt,beta.py", &Command::List)
            .unwrap();
        assert_eq!(
            response,
            ClassifiedResponse::Listing(vec!["alpha.txt".to_string(), "beta.py".to_string()])
        );
    }

    #[test]
    fn test_listing_empty_is_valid() {
        let response = Classifier::new().classify(b"", &Command::List).unwrap();
        assert_eq!(response, ClassifiedResponse::Listing(Vec::new()));

        // Prompt artifact followed by nothing is still an empty listing.
        let response = Classifier::new()
            .classify(b"\r\n>>> ", &Command::List)
            .unwrap();
        assert_eq!(response, ClassifiedResponse::Listing(Vec::new()));
    }

    #[test]
    fn test_listing_filters_empty_entries() {
        let response = Classifier::new()
            .classify(b"alpha.txt,beta.py,", &Command::List)
            .unwrap();
        assert_eq!(response.as_listing().unwrap().len(), 2);
    }

    #[test]
    fn test_listing_unescapes_names() {
        let response = Classifier::new()
            .classify(b"a%2Cb.txt,p%25q.py,r%3Es", &Command::List)
            .unwrap();
        assert_eq!(
            response,
            ClassifiedResponse::Listing(vec![
                "a,b.txt".to_string(),
                "p%q.py".to_string(),
                "r>s".to_string(),
            ])
        );
    }

    #[test]
    fn test_listing_bad_escape_is_malformed() {
        let err = Classifier::new()
            .classify(b"oops%2", &Command::List)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));

        let err = Classifier::new()
            .classify(b"oops%zz", &Command::List)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_listing_invalid_utf8_is_malformed() {
        let err = Classifier::new()
            .classify(&[0xff, 0xfe, b'a'], &Command::List)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_content_verbatim() {
        let response = Classifier::new()
            .classify(b"hello\nworld\n", &read_cmd())
            .unwrap();
        assert_eq!(response.as_content(), Some("hello\nworld\n"));
    }

    #[test]
    fn test_content_strips_prompt_artifact_only() {
        let response = Classifier::new()
            .classify(b"banner>>> \r\nline one\nline two", &read_cmd())
            .unwrap();
        assert_eq!(response.as_content(), Some("line one\nline two"));
    }

    #[test]
    fn test_content_keeps_leading_whitespace_without_artifact() {
        // No prompt artifact means nothing to strip: content that starts
        // with a tab or newline comes back byte-for-byte.
        let response = Classifier::new()
            .classify(b"\tindented line\n", &read_cmd())
            .unwrap();
        assert_eq!(response.as_content(), Some("\tindented line\n"));

        let response = Classifier::new()
            .classify(b"\n\nblank-led file", &read_cmd())
            .unwrap();
        assert_eq!(response.as_content(), Some("\n\nblank-led file"));
    }

    #[test]
    fn test_error_marker_mid_content_is_content() {
        // The marker only signals a remote failure as a prefix; a file that
        // happens to mention it stays verbatim content.
        let frame: &[u8] = b"log line\n###ERROR###: not really an error\ntail";
        let response = Classifier::new().classify(frame, &read_cmd()).unwrap();
        assert_eq!(
            response.as_content(),
            Some("log line\n###ERROR###: not really an error\ntail")
        );
    }

    #[test]
    fn test_error_marker_mid_listing_is_not_remote() {
        // The prefix rule applies to listings too: a marker that is not at
        // the start parses as ordinary (if odd) filenames.
        let response = Classifier::new()
            .classify(b"a.txt,###ERROR###:oops", &Command::List)
            .unwrap();
        assert!(!response.is_remote_error());
    }

    #[test]
    fn test_remote_error_message_exact() {
        let response = Classifier::new()
            .classify(b"###ERROR###:[Errno 2] no such file", &read_cmd())
            .unwrap();
        assert_eq!(
            response,
            ClassifiedResponse::RemoteError("[Errno 2] no such file".to_string())
        );
    }

    #[test]
    fn test_remote_error_after_boundary_artifacts() {
        let response = Classifier::new()
            .classify(b">>> \r\n###ERROR###:[Errno 2] no such file", &read_cmd())
            .unwrap();
        assert_eq!(
            response.as_remote_error(),
            Some("[Errno 2] no such file")
        );
    }

    #[test]
    fn test_remote_error_on_listing() {
        let response = Classifier::new()
            .classify(b"###ERROR###:no filesystem", &Command::List)
            .unwrap();
        assert!(response.is_remote_error());
    }

    #[test]
    fn test_decode_content_text() {
        let bytes = decode_content("hi", PayloadEncoding::Text).unwrap();
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn test_decode_content_base64() {
        let bytes = decode_content("aGVsbG8=", PayloadEncoding::Base64).unwrap();
        assert_eq!(bytes, b"hello");

        let err = decode_content("not!!base64", PayloadEncoding::Base64).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
