use thiserror::Error;

/// Errors surfaced to the caller driving a decoder
///
/// The caller decides whether to end the session, retry, or skip; the decoder
/// itself never terminates anything.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line carried no recognizable timestamp prefix near its start
    #[error("malformed log line, no timestamp prefix: {line:?}")]
    MalformedLine { line: String },

    /// The consumer dropped the receiving end of the event channel
    #[error("event channel closed by consumer")]
    ChannelClosed,
}
