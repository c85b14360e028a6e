//! Converter handle and its event loop.
//!
//! The [`Converter`] is a cheap, cloneable handle. All conversion state
//! lives in one spawned task that owns the [`Session`], the transport
//! [`Connection`] and its event receiver. Everything that can change that
//! state arrives on a channel:
//!
//! | Source | Event |
//! |--------|-------|
//! | Handle methods | `convert`, `cancel`, `reset` |
//! | Blocking reader worker | page read result |
//! | Transport event loop | connected, message, disconnected |
//!
//! # Example
//!
//! ```no_run
//! use codex_markdown::{Converter, PageContent};
//!
//! # async fn example() -> codex_markdown::Result<()> {
//! let converter = Converter::builder()
//!     .reader(|| Ok(PageContent::new("https://example.com", "Example", "Hello")))
//!     .build()?;
//!
//! let markdown = converter.run().await?;
//! println!("{markdown}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, spawn_blocking};
use tracing::{debug, trace};

use crate::error::{Error, ReaderError, Result};
use crate::page::{PageContent, SharedReader};
use crate::session::{Action, ConversionState, Session, SessionEvent, Snapshot};
use crate::transport::{Connection, TransportEvent};

use super::builder::ConverterBuilder;
use super::options::ConverterOptions;

// ============================================================================
// Types
// ============================================================================

/// Request from a handle to the event loop.
#[derive(Debug)]
enum Command {
    /// Start a conversion.
    Convert,
    /// Abandon the conversion, keeping output.
    Cancel,
    /// Abandon the conversion and clear everything.
    Reset,
    /// Resolve once no conversion is in flight.
    Finished(oneshot::Sender<Result<String>>),
}

/// Reader result tagged with its generation.
type PageResult = (u64, std::result::Result<PageContent, ReaderError>);

/// Receiver of the live connection's events.
type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Shared state behind every handle clone.
struct ConverterInner {
    /// Validated configuration.
    options: ConverterOptions,
    /// Command queue into the event loop.
    commands: mpsc::UnboundedSender<Command>,
    /// Latest published snapshot.
    snapshot: watch::Receiver<Snapshot>,
    /// The event loop task.
    task: JoinHandle<()>,
}

impl Drop for ConverterInner {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Converter
// ============================================================================

/// Page-to-Markdown converter backed by a Codex app-server.
#[derive(Clone)]
pub struct Converter {
    /// Shared inner state.
    inner: Arc<ConverterInner>,
}

// ============================================================================
// Converter - Display
// ============================================================================

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("endpoint", &self.inner.options.endpoint)
            .field("state", &self.inner.snapshot.borrow().state)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Converter - Public API
// ============================================================================

impl Converter {
    /// Creates a configuration builder for the converter.
    #[inline]
    #[must_use]
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    /// Spawns the event loop for validated options.
    pub(crate) fn spawn(options: ConverterOptions, reader: SharedReader) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (pages_tx, pages_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let event_loop = EventLoop {
            session: Session::new(options.clone()),
            reader,
            connection: None,
            events: None,
            pages_tx,
            snapshot_tx,
            waiters: Vec::new(),
        };

        let task = tokio::spawn(event_loop.run(commands_rx, pages_rx));

        Self {
            inner: Arc::new(ConverterInner {
                options,
                commands: commands_tx,
                snapshot: snapshot_rx,
                task,
            }),
        }
    }

    /// Starts a conversion.
    ///
    /// Ignored while one is already in flight.
    pub fn convert(&self) {
        self.command(Command::Convert);
    }

    /// Abandons the current conversion and returns to idle.
    ///
    /// Output streamed so far stays visible.
    pub fn cancel(&self) {
        self.command(Command::Cancel);
    }

    /// Abandons the current conversion and clears all output.
    pub fn reset(&self) {
        self.command(Command::Reset);
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.clone()
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConverterOptions {
        &self.inner.options
    }

    /// Waits until no conversion is in flight.
    ///
    /// Commands are processed in order, so calling this right after
    /// [`convert`](Self::convert) waits for that conversion.
    ///
    /// # Errors
    ///
    /// - [`Error::Failed`] if the conversion ended in the error state
    /// - [`Error::Cancelled`] if it was cancelled or reset, or never started
    pub async fn finished(&self) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Finished(tx));
        rx.await.unwrap_or(Err(Error::Cancelled))
    }

    /// Starts a conversion and waits for its outcome.
    ///
    /// # Errors
    ///
    /// See [`finished`](Self::finished).
    pub async fn run(&self) -> Result<String> {
        self.convert();
        self.finished().await
    }

    fn command(&self, command: Command) {
        if self.inner.commands.send(command).is_err() {
            trace!("Converter event loop gone, dropping command");
        }
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// One input to the event loop.
enum Input {
    Command(Command),
    Session(SessionEvent),
    TransportClosed,
    Shutdown,
}

/// Exclusive owner of session and transport.
struct EventLoop {
    session: Session,
    reader: SharedReader,
    connection: Option<Connection>,
    events: Option<TransportEvents>,
    pages_tx: mpsc::UnboundedSender<PageResult>,
    snapshot_tx: watch::Sender<Snapshot>,
    waiters: Vec<oneshot::Sender<Result<String>>>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut pages: mpsc::UnboundedReceiver<PageResult>,
    ) {
        debug!(endpoint = %self.session.options().endpoint, "Converter started");

        loop {
            let input = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Input::Command(command),
                    None => Input::Shutdown,
                },
                Some((generation, result)) = pages.recv() => {
                    Input::Session(SessionEvent::PageRead { generation, result })
                }
                event = next_transport_event(&mut self.events) => match event {
                    Some(event) => Input::Session(session_event(event)),
                    None => Input::TransportClosed,
                },
            };

            match input {
                Input::Command(Command::Convert) => self.dispatch(SessionEvent::Convert),
                Input::Command(Command::Cancel) => self.dispatch(SessionEvent::Cancel),
                Input::Command(Command::Reset) => self.dispatch(SessionEvent::Reset),
                Input::Command(Command::Finished(waiter)) => {
                    self.waiters.push(waiter);
                    self.resolve_waiters();
                }
                Input::Session(event) => self.dispatch(event),
                Input::TransportClosed => self.events = None,
                Input::Shutdown => break,
            }
        }

        self.disconnect();
        debug!("Converter stopped");
    }

    /// Feeds one event to the session and performs its actions.
    fn dispatch(&mut self, event: SessionEvent) {
        for action in self.session.handle(event) {
            self.perform(action);
        }

        let snapshot = self.session.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });

        self.resolve_waiters();
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::ReadPage { generation } => self.read_page(generation),
            Action::Connect => self.connect(),
            Action::Send(text) => match &self.connection {
                Some(connection) => connection.send(text),
                None => trace!("No connection, dropping frame"),
            },
            Action::Disconnect => self.disconnect(),
        }
    }

    /// Runs the reader on the blocking pool.
    fn read_page(&self, generation: u64) {
        let reader = self.reader.clone();
        let pages = self.pages_tx.clone();

        tokio::spawn(async move {
            let result = match spawn_blocking(move || reader.read_page()).await {
                Ok(result) => result,
                Err(e) => Err(ReaderError::scripting(format!("reader task failed: {e}"))),
            };

            if pages.send((generation, result)).is_err() {
                trace!(generation, "Converter gone, dropping page read");
            }
        });
    }

    /// Replaces any live connection with a new one.
    fn connect(&mut self) {
        self.disconnect();

        let options = self.session.options();
        let (connection, events) =
            Connection::connect(options.endpoint.clone(), options.connect_timeout);

        self.connection = Some(connection);
        self.events = Some(events);
    }

    /// Drops the live connection and any events it still had queued.
    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.disconnect();
        }
        self.events = None;
    }

    /// Answers `finished` callers once nothing is in flight.
    fn resolve_waiters(&mut self) {
        let state = self.session.state();
        if !(state.is_terminal() || *state == ConversionState::Idle) {
            return;
        }

        for waiter in self.waiters.drain(..) {
            let outcome = match state {
                ConversionState::Done => Ok(self.session.output().to_string()),
                ConversionState::Error(message) => Err(Error::failed(message.clone())),
                _ => Err(Error::Cancelled),
            };
            // The caller may have stopped waiting.
            let _ = waiter.send(outcome);
        }
    }
}

/// Maps a transport event onto the session's input.
fn session_event(event: TransportEvent) -> SessionEvent {
    match event {
        TransportEvent::Connected => SessionEvent::Connected,
        TransportEvent::Message(text) => SessionEvent::Message(text),
        TransportEvent::Disconnected(reason) => SessionEvent::Disconnected(reason),
    }
}

/// Next event from the live connection; pends forever without one.
async fn next_transport_event(events: &mut Option<TransportEvents>) -> Option<TransportEvent> {
    match events {
        Some(events) => events.recv().await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
