//! End-to-end conversions against a fake Codex app-server.
//!
//! The fake server speaks just enough JSON-RPC over tokio-tungstenite to
//! walk the converter through `initialize`, `thread/start` and
//! `turn/start`, and records every text frame it receives.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use codex_markdown::{ConversionState, Converter, Error, PageContent, ReaderError};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Fake Server
// ============================================================================

const WAIT: Duration = Duration::from_secs(10);

/// How the fake server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    /// Full run with an approval request in the middle.
    Happy,
    /// `thread/start` fails with "boom".
    ThreadError,
    /// `thread/start` succeeds without a thread id.
    MissingThread,
    /// `turn/error` after `turn/start`.
    TurnError,
    /// One delta, then a close frame.
    DropMidTurn,
}

type Server = WebSocketStream<TcpStream>;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("codex_markdown=debug"))
        .with_test_writer()
        .try_init();
}

/// Starts the fake server; returns its port and a log of received frames.
async fn start_server(scenario: Scenario) -> Result<(u16, mpsc::UnboundedReceiver<Value>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let (log_tx, log_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log_tx = log_tx.clone();
            tokio::spawn(async move {
                let _ = serve(stream, scenario, log_tx).await;
            });
        }
    });

    Ok((port, log_rx))
}

async fn reply(ws: &mut Server, message: Value) -> Result<()> {
    ws.send(Message::Text(message.to_string().into())).await?;
    Ok(())
}

async fn serve(stream: TcpStream, scenario: Scenario, log: mpsc::UnboundedSender<Value>) -> Result<()> {
    let mut ws = accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        let Message::Text(text) = message? else {
            continue;
        };
        let text: &str = &text;
        let request: Value = serde_json::from_str(text)?;
        let _ = log.send(request.clone());

        let id = request["id"].clone();
        let Some(method) = request["method"].as_str() else {
            // Reply to our approval request
            if id == json!(9) && scenario == Scenario::Happy {
                for delta in ["Hello ", "World"] {
                    reply(&mut ws, json!({"method": "item/agentMessage/delta", "params": {"delta": delta}}))
                        .await?;
                }
                reply(&mut ws, json!({"method": "turn/completed", "params": {}})).await?;
            }
            continue;
        };

        match (method, scenario) {
            ("initialize", _) => {
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": {"userAgent": "fake"}})).await?;
            }
            ("thread/start", Scenario::ThreadError) => {
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": "boom"}}))
                    .await?;
            }
            ("thread/start", Scenario::MissingThread) => {
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": {"thread": {}}})).await?;
            }
            ("thread/start", _) => {
                reply(&mut ws, json!({"method": "thread/started", "params": {}})).await?;
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": {"thread": {"id": "t1"}}})).await?;
            }
            ("turn/start", Scenario::Happy) => {
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": {}})).await?;
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": 9, "method": "commandExecutionApproval", "params": {}}))
                    .await?;
            }
            ("turn/start", Scenario::TurnError) => {
                reply(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": {}})).await?;
                reply(&mut ws, json!({"method": "turn/error", "params": {"error": "quota exceeded"}})).await?;
            }
            ("turn/start", Scenario::DropMidTurn) => {
                reply(&mut ws, json!({"method": "item/agentMessage/delta", "params": {"delta": "partial"}}))
                    .await?;
                ws.close(None).await?;
                return Ok(());
            }
            _ => {}
        }
    }

    Ok(())
}

fn converter(port: u16) -> Result<Converter> {
    Ok(Converter::builder()
        .port(port)
        .cwd("/work")
        .client_info("codex-markdown-tests", "0.0.1")
        .reader(|| Ok(PageContent::new("https://example.com/post", "A Post", "Some page body")))
        .build()?)
}

fn drain(log: &mut mpsc::UnboundedReceiver<Value>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = log.try_recv() {
        frames.push(frame);
    }
    frames
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_happy_path_streams_markdown() -> Result<()> {
    init_logging();
    let (port, mut log) = start_server(Scenario::Happy).await?;
    let converter = converter(port)?;

    let markdown = tokio_test::assert_ok!(timeout(WAIT, converter.run()).await?);
    assert_eq!(markdown, "Hello World");

    let snapshot = converter.snapshot();
    assert_eq!(snapshot.state, ConversionState::Done);
    assert_eq!(snapshot.source_title, "A Post");
    assert_eq!(snapshot.source_url, "https://example.com/post");
    assert_eq!(snapshot.page_char_count, 14);
    assert_eq!(snapshot.status_text(), "Done — 11 chars");

    let frames = drain(&mut log);
    assert_eq!(frames.len(), 4);

    assert_eq!(
        frames[0],
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"clientInfo": {"name": "codex-markdown-tests", "version": "0.0.1"}}
        })
    );
    assert_eq!(
        frames[1],
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "thread/start",
            "params": {"model": "gpt-5.3-codex-spark", "ephemeral": true, "cwd": "/work"}
        })
    );

    assert_eq!(frames[2]["id"], 3);
    assert_eq!(frames[2]["method"], "turn/start");
    assert_eq!(frames[2]["params"]["threadId"], "t1");
    assert_eq!(frames[2]["params"]["effort"], "medium");
    let input = &frames[2]["params"]["input"];
    assert_eq!(input.as_array().map(Vec::len), Some(1));
    assert_eq!(input[0]["type"], "text");
    assert_eq!(input[0]["textElements"], json!([]));
    let prompt = input[0]["text"].as_str().unwrap_or_default();
    assert!(prompt.contains("> Source: [A Post](https://example.com/post)"));
    assert!(prompt.contains("--- PAGE CONTENT ---\nSome page body\n--- END PAGE CONTENT ---"));

    assert_eq!(
        frames[3],
        json!({"jsonrpc": "2.0", "id": 9, "result": {"decision": "accept"}})
    );
    Ok(())
}

#[tokio::test]
async fn test_second_run_restarts_ids() -> Result<()> {
    let (port, mut log) = start_server(Scenario::Happy).await?;
    let converter = converter(port)?;

    assert_eq!(timeout(WAIT, converter.run()).await??, "Hello World");
    let first = drain(&mut log);

    assert_eq!(timeout(WAIT, converter.run()).await??, "Hello World");
    let second = drain(&mut log);

    let ids = |frames: &[Value]| -> Vec<Value> { frames.iter().map(|f| f["id"].clone()).collect() };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(ids(&second), vec![json!(1), json!(2), json!(3), json!(9)]);
    Ok(())
}

#[tokio::test]
async fn test_thread_start_server_error() -> Result<()> {
    let (port, _log) = start_server(Scenario::ThreadError).await?;
    let converter = converter(port)?;

    let err = timeout(WAIT, converter.run()).await?.unwrap_err();
    assert!(matches!(err, Error::Failed { .. }));
    assert_eq!(err.to_string(), "Server error (thread/start): boom");
    assert_eq!(
        converter.snapshot().status_text(),
        "Server error (thread/start): boom"
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_thread_id() -> Result<()> {
    let (port, _log) = start_server(Scenario::MissingThread).await?;
    let converter = converter(port)?;

    let err = timeout(WAIT, converter.run()).await?.unwrap_err();
    assert_eq!(err.to_string(), "Failed to create thread");
    Ok(())
}

#[tokio::test]
async fn test_turn_error() -> Result<()> {
    let (port, _log) = start_server(Scenario::TurnError).await?;
    let converter = converter(port)?;

    let err = timeout(WAIT, converter.run()).await?.unwrap_err();
    assert_eq!(err.to_string(), "quota exceeded");
    Ok(())
}

#[tokio::test]
async fn test_close_mid_turn_keeps_partial_output() -> Result<()> {
    let (port, _log) = start_server(Scenario::DropMidTurn).await?;
    let converter = converter(port)?;

    let err = timeout(WAIT, converter.run()).await?.unwrap_err();
    assert_eq!(err.to_string(), "Disconnected: Server closed connection");
    assert_eq!(converter.snapshot().output, "partial");
    Ok(())
}

#[tokio::test]
async fn test_no_server_running() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let converter = converter(port)?;
    let err = timeout(WAIT, converter.run()).await?.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Could not connect to Codex server. Is `codex-app-server --listen ws://127.0.0.1:{port}` running?")
    );
    Ok(())
}

#[tokio::test]
async fn test_reader_error_skips_network() -> Result<()> {
    let (port, mut log) = start_server(Scenario::Happy).await?;
    let converter = Converter::builder()
        .port(port)
        .reader(|| Err(ReaderError::EmptyContent))
        .build()?;

    let err = timeout(WAIT, converter.run()).await?.unwrap_err();
    assert!(err.to_string().starts_with("Page content is empty."));
    assert!(drain(&mut log).is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reset_after_done_clears_snapshot() -> Result<()> {
    let (port, _log) = start_server(Scenario::Happy).await?;
    let converter = converter(port)?;

    timeout(WAIT, converter.run()).await??;
    converter.reset();

    // `finished` is queued behind the reset
    assert!(matches!(converter.finished().await, Err(Error::Cancelled)));
    let snapshot = converter.snapshot();
    assert_eq!(snapshot.state, ConversionState::Idle);
    assert_eq!(snapshot.output, "");
    assert_eq!(snapshot.source_title, "");
    assert_eq!(snapshot.status_text(), "Ready");
    Ok(())
}
