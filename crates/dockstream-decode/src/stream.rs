use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use dockstream_types::{CONTAINER_ID_KEY, ExtraMap, LogEvent, TAG_DECODE_FAILED};

use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::timestamp::{self, TimestampPrefix};

const LINE_TERMINATOR: u8 = b'\n';

/// What to do with a line that has no usable timestamp prefix
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Return an error and let the caller end the session
    #[default]
    Halt,
    /// Emit the line anyway, tagged, with a decode-time timestamp
    Tag,
}

/// Decodes one container's raw log byte stream into [`LogEvent`]s
///
/// One instance per tail session. Bytes arrive in arbitrarily sized chunks via
/// [`accept`](Self::accept); complete lines are framed on `\n`, their
/// timestamp prefix parsed, replayed history dropped against the watermark,
/// and the surviving events sent to the bounded output channel.
pub struct LogStreamDecoder {
    /// Source container identifier
    id: String,

    /// Bounded hand-off to the downstream pipeline; draining is the
    /// consumer's responsibility
    tx: mpsc::Sender<LogEvent>,

    /// Per-instance metadata stamped onto every event
    extra: ExtraMap,

    /// Watermark of the latest accepted event timestamp
    since: Cursor,

    /// Bytes of the current, not-yet-terminated line
    buffer: Vec<u8>,

    on_malformed: MalformedPolicy,
}

impl LogStreamDecoder {
    /// Create a decoder for one container log session
    ///
    /// `extra` is copied; the decoder owns its metadata from here on. `since`
    /// is the resume watermark: lines whose parsed timestamp does not strictly
    /// exceed it are dropped. Keep a clone of the cursor to read the position
    /// back for persistence.
    pub fn new(
        id: impl Into<String>,
        tx: mpsc::Sender<LogEvent>,
        extra: ExtraMap,
        since: Cursor,
    ) -> Self {
        let id = id.into();
        let mut extra = extra;
        extra.insert(CONTAINER_ID_KEY.to_string(), Value::String(id.clone()));
        Self {
            id,
            tx,
            extra,
            since,
            buffer: Vec::new(),
            on_malformed: MalformedPolicy::default(),
        }
    }

    /// Set the policy for lines without a timestamp prefix
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    /// Source container identifier
    pub fn container_id(&self) -> &str {
        &self.id
    }

    /// Current tail-resume position
    pub fn watermark(&self) -> DateTime<Utc> {
        self.since.load()
    }

    /// Absorb a chunk of raw log bytes
    ///
    /// Chunk boundaries need not align with line boundaries: complete lines
    /// are decoded and sent, a trailing partial line waits for the next call,
    /// and empty lines are consumed without producing events. Returns the
    /// number of bytes absorbed, always the full chunk.
    ///
    /// Suspends only on the channel send; a full channel blocks the caller,
    /// which is the backpressure path onto the upstream reader.
    pub async fn accept(&mut self, bytes: &[u8]) -> Result<usize, DecodeError> {
        self.buffer.extend_from_slice(bytes);

        while let Some(idx) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) {
            let line: Vec<u8> = self.buffer.drain(..=idx).collect();
            let line = &line[..idx];
            if !line.is_empty() {
                self.decode_line(line).await?;
            }
        }

        Ok(bytes.len())
    }

    /// Decode any non-terminated trailing bytes as a final line
    ///
    /// Dropping the decoder instead discards the remainder, which matches
    /// runtimes that always terminate their output.
    pub async fn finish(mut self) -> Result<(), DecodeError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line).await
    }

    async fn decode_line(&mut self, raw: &[u8]) -> Result<(), DecodeError> {
        let line = String::from_utf8_lossy(raw);

        let mut event = LogEvent::new(Utc::now(), line.to_string());
        event.extra = self.extra.clone();

        match timestamp::extract(&line) {
            TimestampPrefix::Parsed { timestamp, rest } => {
                // Already delivered on a previous run of this tail
                if timestamp < self.since.load() {
                    return Ok(());
                }
                event.timestamp = timestamp;
                event.message = rest.to_string();
            }
            TimestampPrefix::Unparseable { error } => {
                warn!(container = %self.id, %error, "timestamp prefix did not parse");
                event.add_tag(TAG_DECODE_FAILED);
            }
            TimestampPrefix::Missing => match self.on_malformed {
                MalformedPolicy::Halt => {
                    return Err(DecodeError::MalformedLine {
                        line: line.into_owned(),
                    });
                }
                MalformedPolicy::Tag => {
                    warn!(container = %self.id, line = %line, "log line without timestamp prefix");
                    event.add_tag(TAG_DECODE_FAILED);
                }
            },
        }

        // Anything at or behind the watermark is a replay; only a strictly
        // newer event may advance it and go out
        if !self.since.advance(event.timestamp) {
            return Ok(());
        }

        event.message = event.message.trim().to_string();

        self.tx
            .send(event)
            .await
            .map_err(|_| DecodeError::ChannelClosed)?;
        Ok(())
    }
}
