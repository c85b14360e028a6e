//! Convert a local text file to Markdown.
//!
//! Demonstrates:
//! - Building a Converter with a closure reader
//! - Watching snapshots while the conversion streams
//! - Printing the final Markdown
//!
//! Requires a running app-server:
//!   codex-app-server --listen ws://127.0.0.1:8080
//!
//! Usage:
//!   cargo run --example convert_file -- page.txt
//!   cargo run --example convert_file -- page.txt --endpoint ws://127.0.0.1:9000
//!   cargo run --example convert_file -- page.txt --title "My Page" --url https://example.com
//!   cargo run --example convert_file -- page.txt --debug

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use codex_markdown::{Converter, PageContent, ReaderError, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8080";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    path: Option<PathBuf>,
    endpoint: String,
    title: Option<String>,
    url: Option<String>,
    debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Self {
        let mut args = Self {
            path: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            title: None,
            url: None,
            debug: false,
        };

        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" => args.debug = true,
                "--endpoint" => args.endpoint = iter.next().unwrap_or(args.endpoint),
                "--title" => args.title = iter.next(),
                "--url" => args.url = iter.next(),
                _ => args.path = Some(PathBuf::from(arg)),
            }
        }

        args
    }
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "codex_markdown=debug"
    } else {
        "codex_markdown=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let Some(path) = args.path else {
        eprintln!("Usage: convert_file <path> [--endpoint URL] [--title T] [--url U] [--debug]");
        std::process::exit(2);
    };

    let title = args
        .title
        .unwrap_or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
    let url = args.url.unwrap_or_else(|| format!("file://{}", path.display()));

    let converter = Converter::builder()
        .endpoint(args.endpoint)
        .connect_timeout(CONNECT_TIMEOUT)
        .reader(move || -> std::result::Result<PageContent, ReaderError> {
            let body = std::fs::read_to_string(&path).map_err(|e| ReaderError::scripting(e.to_string()))?;
            Ok(PageContent::new(url.clone(), title.clone(), body))
        })
        .build()?;

    // Status lines go to stderr, Markdown to stdout
    let mut updates = converter.subscribe();
    let status = tokio::spawn(async move {
        let mut last = String::new();
        while updates.changed().await.is_ok() {
            let line = updates.borrow_and_update().status_text();
            if line != last {
                eprintln!("[Status] {line}");
                last = line;
            }
        }
    });

    let markdown = converter.run().await;
    status.abort();

    println!("{}", markdown?);
    Ok(())
}
