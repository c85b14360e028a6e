//! Session state machine.
//!
//! [`Session`] is a pure reducer: it owns every piece of conversion state
//! and turns one [`SessionEvent`] into the [`Action`]s the orchestrator
//! must perform. It never touches a socket or a thread.
//!
//! # Protocol Sequence
//!
//! ```text
//! Convert ─► ReadPage
//! PageRead(ok) ─► Connect
//! Connected ─► Send(initialize)
//! initialize ok ─► Send(thread/start)
//! thread/start ok ─► Send(turn/start)              [Converting]
//! item/agentMessage/delta ─► append output
//! turn/completed ─► Disconnect                     [Done]
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::converter::ConverterOptions;
use crate::error::{Error, ReaderError};
use crate::identifiers::ThreadId;
use crate::page::PageContent;
use crate::protocol::{
    Correlator, Incoming, InitializeParams, Method, Notification, Reply, Response, ServerRequest,
    ThreadStartParams, ThreadStartResult, TurnStartParams,
};

use super::prompt::build_prompt;
use super::state::{ConversionState, Snapshot};

// ============================================================================
// Types
// ============================================================================

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Start a conversion.
    Convert,
    /// The page reader finished for the given generation.
    PageRead {
        /// Generation from the matching [`Action::ReadPage`].
        generation: u64,
        /// Reader outcome.
        result: Result<PageContent, ReaderError>,
    },
    /// The transport finished its handshake.
    Connected,
    /// One text frame from the transport.
    Message(String),
    /// The transport went away.
    Disconnected(String),
    /// Abandon the conversion, keeping output.
    Cancel,
    /// Abandon the conversion and clear everything.
    Reset,
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the page reader off the event loop.
    ReadPage {
        /// Tag to hand back with [`SessionEvent::PageRead`].
        generation: u64,
    },
    /// Open a new transport connection.
    Connect,
    /// Send one text frame.
    Send(String),
    /// Tear the transport down.
    Disconnect,
}

/// Actions emitted by one event.
pub type Actions = Vec<Action>;

// ============================================================================
// Session
// ============================================================================

/// Conversion session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Configuration.
    options: ConverterOptions,
    /// Current state.
    state: ConversionState,
    /// Request ids and pending table.
    correlator: Correlator,
    /// Thread assigned by `thread/start`.
    thread_id: Option<ThreadId>,
    /// Page being converted, held until `turn/start` is sent.
    page: Option<PageContent>,
    /// Bumped on every accepted convert.
    generation: u64,
    /// Streamed Markdown.
    output: String,
    source_title: String,
    source_url: String,
    page_char_count: usize,
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new(options: ConverterOptions) -> Self {
        Self {
            options,
            state: ConversionState::Idle,
            correlator: Correlator::new(),
            thread_id: None,
            page: None,
            generation: 0,
            output: String::new(),
            source_title: String::new(),
            source_url: String::new(),
            page_char_count: 0,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    /// Returns the streamed output.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the thread id, once assigned.
    #[inline]
    #[must_use]
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Returns the number of unanswered requests.
    #[inline]
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Captures the observable state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            output: self.output.clone(),
            source_title: self.source_title.clone(),
            source_url: self.source_url.clone(),
            page_char_count: self.page_char_count,
        }
    }

    /// Applies one event and returns the resulting actions.
    pub fn handle(&mut self, event: SessionEvent) -> Actions {
        match event {
            SessionEvent::Convert => self.on_convert(),
            SessionEvent::PageRead { generation, result } => self.on_page_read(generation, result),
            SessionEvent::Connected => self.on_connected(),
            SessionEvent::Message(text) => self.on_message(&text),
            SessionEvent::Disconnected(reason) => self.on_disconnected(reason),
            SessionEvent::Cancel => self.on_cancel(),
            SessionEvent::Reset => self.on_reset(),
        }
    }
}

// ============================================================================
// Session - User Commands
// ============================================================================

impl Session {
    fn on_convert(&mut self) -> Actions {
        if !self.state.accepts_convert() {
            debug!(state = %self.state, "Convert ignored while in flight");
            return Vec::new();
        }

        self.output.clear();
        self.thread_id = None;
        self.page = None;
        self.correlator.reset();
        self.generation += 1;
        self.transition(ConversionState::ReadingPage);

        vec![Action::ReadPage {
            generation: self.generation,
        }]
    }

    fn on_cancel(&mut self) -> Actions {
        if self.state == ConversionState::Idle {
            return Vec::new();
        }

        self.thread_id = None;
        self.page = None;
        self.correlator.reset();
        self.transition(ConversionState::Idle);

        vec![Action::Disconnect]
    }

    fn on_reset(&mut self) -> Actions {
        self.output.clear();
        self.source_title.clear();
        self.source_url.clear();
        self.page_char_count = 0;
        self.thread_id = None;
        self.page = None;
        self.correlator.reset();
        self.transition(ConversionState::Idle);

        vec![Action::Disconnect]
    }
}

// ============================================================================
// Session - Reader And Transport
// ============================================================================

impl Session {
    fn on_page_read(&mut self, generation: u64, result: Result<PageContent, ReaderError>) -> Actions {
        if generation != self.generation || self.state != ConversionState::ReadingPage {
            debug!(generation, current = self.generation, "Discarding stale page read");
            return Vec::new();
        }

        let page = match result.and_then(|page| page.prepare(self.options.max_body_chars)) {
            Ok(page) => page,
            Err(e) => return self.fail(e.into()),
        };

        self.source_title = page.title().to_string();
        self.source_url = page.url().to_string();
        self.page_char_count = page.char_count();
        info!(
            title = %self.source_title,
            url = %self.source_url,
            chars = self.page_char_count,
            "Page read"
        );

        self.page = Some(page);
        self.transition(ConversionState::Connecting);

        vec![Action::Connect]
    }

    fn on_connected(&mut self) -> Actions {
        if self.state != ConversionState::Connecting {
            trace!(state = %self.state, "Ignoring connect outside Connecting");
            return Vec::new();
        }

        let params = InitializeParams {
            client_info: self.options.client.clone(),
        };
        self.send(Method::Initialize, params)
    }

    fn on_disconnected(&mut self, reason: String) -> Actions {
        match self.state {
            ConversionState::Converting => self.fail(Error::disconnected(reason)),
            ConversionState::Connecting => {
                debug!(%reason, "Transport lost while connecting");
                self.fail(Error::unreachable(self.options.endpoint.ws_url()))
            }
            _ => {
                trace!(%reason, state = %self.state, "Ignoring disconnect");
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Session - RPC
// ============================================================================

impl Session {
    fn on_message(&mut self, text: &str) -> Actions {
        if !self.state.is_online() {
            trace!(state = %self.state, "Ignoring message while offline");
            return Vec::new();
        }

        match self.correlator.classify(text) {
            Incoming::Response(response) => self.on_response(response),
            Incoming::ServerRequest(request) => self.on_server_request(request),
            Incoming::Notification(notification) => self.on_notification(notification),
            Incoming::Ignored => Vec::new(),
        }
    }

    fn on_response(&mut self, response: Response) -> Actions {
        let result = match response.outcome {
            Ok(result) => result,
            Err(error) => return self.fail(Error::server(response.method.as_str(), error.message)),
        };

        match response.method {
            Method::Initialize => {
                debug!("Initialized");
                let params = ThreadStartParams {
                    model: self.options.model.clone(),
                    ephemeral: true,
                    cwd: self.options.cwd_string(),
                };
                self.send(Method::ThreadStart, params)
            }
            Method::ThreadStart => self.on_thread_started(&result),
            Method::TurnStart => {
                trace!("Turn accepted");
                Vec::new()
            }
        }
    }

    fn on_thread_started(&mut self, result: &Value) -> Actions {
        let Some(thread_id) = ThreadStartResult::thread_id(result) else {
            return self.fail(Error::MissingThread);
        };

        let Some(page) = self.page.take() else {
            return self.fail(Error::protocol("thread started without a page"));
        };

        info!(thread = %thread_id, "Thread started");
        let params = TurnStartParams::text(thread_id.clone(), self.options.effort, build_prompt(&page));
        self.thread_id = Some(thread_id);
        self.transition(ConversionState::Converting);

        self.send(Method::TurnStart, params)
    }

    fn on_server_request(&mut self, request: ServerRequest) -> Actions {
        if !request.is_approval() {
            debug!(method = %request.method, "Ignoring server request");
            return Vec::new();
        }

        debug!(method = %request.method, id = %request.id, "Auto-accepting");
        match serde_json::to_string(&Reply::accept(request.id)) {
            Ok(text) => vec![Action::Send(text)],
            Err(e) => self.fail(e.into()),
        }
    }

    fn on_notification(&mut self, notification: Notification) -> Actions {
        match notification {
            Notification::AgentMessageDelta { delta } => {
                if self.state == ConversionState::Converting {
                    self.output.push_str(&delta);
                } else {
                    trace!("Dropping delta before turn start");
                }
                Vec::new()
            }
            Notification::TurnCompleted => {
                info!(chars = self.output.chars().count(), "Conversion done");
                self.transition(ConversionState::Done);
                vec![Action::Disconnect]
            }
            Notification::TurnError { message } => self.fail(Error::turn(message)),
            Notification::Other { method } => {
                trace!(%method, "Ignoring notification");
                Vec::new()
            }
        }
    }

    /// Serializes and sends a request, failing the session on error.
    fn send<P: serde::Serialize>(&mut self, method: Method, params: P) -> Actions {
        match self.correlator.request(method, params) {
            Ok((_, text)) => vec![Action::Send(text)],
            Err(e) => self.fail(e),
        }
    }
}

// ============================================================================
// Session - Transitions
// ============================================================================

impl Session {
    fn transition(&mut self, next: ConversionState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    /// Enters the error state and tears the transport down.
    fn fail(&mut self, error: Error) -> Actions {
        warn!(error = %error, state = %self.state, "Conversion failed");
        self.transition(ConversionState::Error(error.to_string()));
        vec![Action::Disconnect]
    }
}

// ============================================================================
// Tests
// ============================================================================
