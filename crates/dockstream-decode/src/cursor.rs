use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Shared watermark of the latest accepted event timestamp
///
/// One decoder and its caller hold clones of the same cursor: the decoder
/// advances it as events are accepted, the caller reads it back to persist the
/// tail-resume position. The watermark only ever moves forward.
#[derive(Clone, Debug)]
pub struct Cursor {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl Cursor {
    /// Create a cursor seeded with a saved resume position
    pub fn new(since: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(since)),
        }
    }

    /// Read the current watermark
    pub fn load(&self) -> DateTime<Utc> {
        *self.inner.lock()
    }

    /// Advance the watermark to `ts` if it is strictly later
    ///
    /// Returns whether the watermark moved; an equal or earlier `ts` leaves it
    /// untouched.
    pub fn advance(&self, ts: DateTime<Utc>) -> bool {
        let mut current = self.inner.lock();
        if ts > *current {
            *current = ts;
            true
        } else {
            false
        }
    }
}

impl Default for Cursor {
    /// Epoch cursor: accept everything
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_advance_is_monotonic() {
        let cursor = Cursor::default();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 6).unwrap();

        assert!(cursor.advance(t2));
        assert_eq!(cursor.load(), t2);

        // Earlier and equal timestamps never move it back
        assert!(!cursor.advance(t1));
        assert!(!cursor.advance(t2));
        assert_eq!(cursor.load(), t2);
    }

    #[test]
    fn test_clones_share_state() {
        let cursor = Cursor::default();
        let observer = cursor.clone();
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        cursor.advance(t);
        assert_eq!(observer.load(), t);
    }
}
