use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use dockstream_decode::{Cursor, ExtraMap, LogStreamDecoder, MalformedPolicy};

/// Dockstream - replay container log bytes through the stream decoder
#[derive(Parser, Debug)]
#[command(name = "dockstream")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log file to replay (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Container identifier stamped into every event
    #[arg(long, default_value = "local")]
    container_id: String,

    /// Resume position; lines at or before this instant are dropped
    #[arg(long, value_name = "RFC3339")]
    since: Option<DateTime<Utc>>,

    /// Read size used when feeding the decoder
    #[arg(long, default_value = "4096")]
    chunk_size: usize,

    /// Event channel capacity
    #[arg(long, default_value = "256")]
    channel_capacity: usize,

    /// Tag lines without a timestamp prefix instead of stopping
    #[arg(long)]
    lenient: bool,

    /// Decode a trailing line with no terminator as a final event
    #[arg(long)]
    flush: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(args.channel_capacity.max(1));

    let cursor = args.since.map(Cursor::new).unwrap_or_default();
    let mut decoder = LogStreamDecoder::new(
        args.container_id.clone(),
        tx,
        ExtraMap::new(),
        cursor.clone(),
    );
    if args.lenient {
        decoder = decoder.with_malformed_policy(MalformedPolicy::Tag);
    }

    // Print one JSON line per event; ends when the decoder is dropped
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "failed to serialize event"),
            }
        }
    });

    let mut reader: Box<dyn AsyncRead + Unpin> = match &args.file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut chunk = vec![0u8; args.chunk_size.max(1)];
    loop {
        let n = reader.read(&mut chunk).await.context("read failed")?;
        if n == 0 {
            break;
        }
        decoder.accept(&chunk[..n]).await?;
    }

    if args.flush {
        decoder.finish().await?;
    } else {
        drop(decoder);
    }

    printer.await?;
    tracing::info!(watermark = %cursor.load().to_rfc3339(), "replay complete");
    Ok(())
}
