//! Raw-mode session state machine.
//!
//! The remote shell's default interactive mode echoes input and prints
//! prompts, which are indistinguishable from real output. The session
//! therefore runs a three-step handshake around every command: a control
//! byte that switches the shell into raw (unprompted, unechoed) mode, the
//! command's script text, and a second control byte that triggers
//! execution. Collection and classification follow, and the session returns
//! to idle.

use log::{debug, trace, warn};

use replfetch_protocol::{
    Classifier, ClassifiedResponse, Command, PayloadEncoding, ProtocolError, ScriptBuilder,
    CTRL_ENTER_RAW, CTRL_EXECUTE, CTRL_EXIT_RAW, DEFAULT_SENTINEL, PROMPT_MARKER,
};

use crate::assembler::{collect, DeadlinePolicy};
use crate::transport::Transport;

/// State of the session's command cycle.
///
/// `Faulted` is terminal for the current command only: the session resets
/// to `Idle` after surfacing the error, so a subsequent command may be
/// attempted. It says nothing about whether the transport itself is still
/// usable; that call belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No command in flight.
    Idle,
    /// Writing the raw-mode control byte.
    EnteringRawMode,
    /// Writing the command's script text.
    SubmittingPayload,
    /// Writing the execution control byte.
    TriggeringExecution,
    /// Collecting the response frame.
    AwaitingResponse,
    /// The current command failed.
    Faulted,
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sentinel marker the scripts will emit and the assembler will scan
    /// for. Must not occur inside legitimate response content.
    pub sentinel: String,
    /// Prompt sequence stripped as a boundary artifact during
    /// classification.
    pub prompt_marker: String,
    /// Payload encoding for `Read` scripts.
    pub encoding: PayloadEncoding,
    /// Sizing and timing for response collection.
    pub policy: DeadlinePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            sentinel: DEFAULT_SENTINEL.to_string(),
            prompt_marker: PROMPT_MARKER.to_string(),
            encoding: PayloadEncoding::default(),
            policy: DeadlinePolicy::default(),
        }
    }
}

/// A connected protocol session.
///
/// Owns its transport exclusively for the connected lifetime; exactly one
/// command is in flight at a time.
pub struct Session<T: Transport> {
    transport: T,
    state: SessionState,
    builder: ScriptBuilder,
    classifier: Classifier,
    policy: DeadlinePolicy,
    sentinel: Vec<u8>,
    line_state_asserted: bool,
    closed: bool,

    // Statistics
    commands_executed: u64,
    commands_failed: u64,
}

impl<T: Transport> Session<T> {
    /// Bind a session to an already-open transport, asserting the readiness
    /// signal first when the transport requires one.
    pub fn connect(mut transport: T, config: SessionConfig) -> Result<Self, ProtocolError> {
        let line_state_asserted = transport.requires_line_state();
        if line_state_asserted {
            debug!("asserting transport readiness signal");
            transport.set_line_state(true)?;
        }

        let sentinel = config.sentinel.as_bytes().to_vec();
        Ok(Session {
            transport,
            state: SessionState::Idle,
            builder: ScriptBuilder::new()
                .with_sentinel(config.sentinel)
                .with_encoding(config.encoding),
            classifier: Classifier::new().with_prompt_marker(config.prompt_marker),
            policy: config.policy,
            sentinel,
            line_state_asserted,
            closed: false,
            commands_executed: 0,
            commands_failed: 0,
        })
    }

    /// Current state of the command cycle.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Commands executed successfully over this session's lifetime.
    pub fn commands_executed(&self) -> u64 {
        self.commands_executed
    }

    /// Commands that faulted over this session's lifetime.
    pub fn commands_failed(&self) -> u64 {
        self.commands_failed
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one command to completion and classify its response.
    ///
    /// Suspends the calling flow until the response resolves or the
    /// deadline elapses. Fails fast with [`ProtocolError::Busy`] if a
    /// command is already in flight, without touching the transport.
    pub fn execute(&mut self, command: Command) -> Result<ClassifiedResponse, ProtocolError> {
        if self.state != SessionState::Idle {
            return Err(ProtocolError::Busy);
        }

        let result = self.run(&command);
        match &result {
            Ok(_) => self.commands_executed += 1,
            Err(e) => {
                warn!("command {:?} faulted: {}", command, e);
                self.state = SessionState::Faulted;
                self.commands_failed += 1;
            }
        }
        // Faulted is terminal for the command, not the session.
        self.state = SessionState::Idle;
        result
    }

    fn run(&mut self, command: &Command) -> Result<ClassifiedResponse, ProtocolError> {
        self.state = SessionState::EnteringRawMode;
        self.transport.write_all(&[CTRL_ENTER_RAW])?;

        self.state = SessionState::SubmittingPayload;
        let script = self.builder.render(command);
        trace!("submitting {} byte script", script.len());
        self.transport.write_all(script.as_bytes())?;
        self.transport.write_all(b"\r\n")?;

        self.state = SessionState::TriggeringExecution;
        self.transport.write_all(&[CTRL_EXECUTE])?;

        self.state = SessionState::AwaitingResponse;
        let frame = collect(&mut self.transport, &self.sentinel, &self.policy)?;
        debug!("collected {} byte frame for {:?}", frame.len(), command);

        self.classifier.classify(&frame, command)
    }

    /// Tear the session down: best-effort return of the shell to its
    /// interactive prompt and release of the readiness signal.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.transport.write_all(&[CTRL_EXIT_RAW]);
        if self.line_state_asserted {
            let _ = self.transport.set_line_state(false);
        }
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
