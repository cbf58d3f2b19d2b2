//! Client-side session cache.
//!
//! Events have no durable identifier on the client; they are addressed by
//! their position in the most recent listing. The session remembers how many
//! events that listing held so donate and details requests can be bounded
//! without a round trip. The count can go stale if other clients add events,
//! and the server remains the final judge of an index.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no events have been listed yet")]
    NoListing,
    #[error("event index {index} is outside the last listing of {count} events")]
    IndexOutOfRange { index: i64, count: u32 },
}

/// Zero-based position of an event in the last listing, already checked
/// against the cached count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventIndex(i32);

impl EventIndex {
    pub fn zero_based(self) -> i32 {
        self.0
    }

    pub fn display(self) -> i32 {
        self.0 + 1
    }
}

#[derive(Debug, Default)]
pub struct Session {
    last_known_event_count: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_known_event_count(&self) -> u32 {
        self.last_known_event_count
    }

    /// Only a successful listing exchange may call this.
    pub fn record_listing(&mut self, count: u32) {
        self.last_known_event_count = count;
    }

    /// Inclusive 1-based range a user may pick from, if any listing was seen.
    pub fn display_range(&self) -> Option<(i32, i32)> {
        if self.last_known_event_count == 0 {
            return None;
        }
        let max = i32::try_from(self.last_known_event_count).unwrap_or(i32::MAX);
        Some((1, max))
    }

    pub fn check_index(&self, zero_based: i32) -> Result<EventIndex, SessionError> {
        let count = self.last_known_event_count;
        if count == 0 {
            return Err(SessionError::NoListing);
        }
        match u32::try_from(zero_based) {
            Ok(index) if index < count => Ok(EventIndex(zero_based)),
            _ => Err(SessionError::IndexOutOfRange {
                index: i64::from(zero_based),
                count,
            }),
        }
    }

    pub fn check_display_index(&self, one_based: i32) -> Result<EventIndex, SessionError> {
        match one_based.checked_sub(1) {
            Some(zero_based) => self.check_index(zero_based),
            None => Err(SessionError::IndexOutOfRange {
                index: i64::from(one_based) - 1,
                count: self.last_known_event_count,
            }),
        }
    }
}
