//! Clock normalization
//!
//! Both sources report time as elapsed `mm:ss` within a period. The join axis
//! is `(period, elapsed_seconds)`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A point on the game clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClockPoint {
    pub period: u32,
    pub seconds: u32,
}

impl ClockPoint {
    pub fn new(period: u32, seconds: u32) -> Self {
        Self { period, seconds }
    }

    /// Parse an elapsed `mm:ss` clock within `period`.
    pub fn parse(period: u32, raw: &str) -> Result<Self> {
        Ok(Self::new(period, normalize(raw)?))
    }
}

/// Convert an elapsed `mm:ss` clock into total seconds.
///
/// Minutes may have any number of digits; seconds must be below 60. Anything
/// that is not exactly two colon-separated unsigned integers is
/// `MalformedClock`.
pub fn normalize(raw: &str) -> Result<u32> {
    let malformed = || CoreError::MalformedClock {
        raw: raw.to_string(),
    };

    let (minutes, seconds) = raw.trim().split_once(':').ok_or_else(malformed)?;
    let minutes = parse_digits(minutes).ok_or_else(malformed)?;
    let seconds = parse_digits(seconds).ok_or_else(malformed)?;
    if seconds >= 60 {
        return Err(malformed());
    }

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(malformed)
}

fn parse_digits(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
