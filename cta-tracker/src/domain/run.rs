//! Rail run number type.

use std::fmt;

/// Maximum number of digits in a run number.
const MAX_DIGITS: usize = 4;

/// A validated rail run number.
///
/// The train tracker reports runs as short digit strings (e.g. "301", "004").
/// Leading zeros are significant: the schedule stores the run as part of the
/// trip's `schd_trip_id` exactly as reported, so "004" and "4" are different runs.
///
/// # Examples
///
/// ```
/// use cta_tracker::domain::RunNumber;
///
/// let run = RunNumber::parse("301").unwrap();
/// assert_eq!(run.as_str(), "301");
/// assert_eq!(run.schedule_key(), "R301");
///
/// assert!(RunNumber::parse("3O1").is_none());
/// assert!(RunNumber::parse("").is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunNumber {
    digits: [u8; MAX_DIGITS],
    len: u8,
}

impl RunNumber {
    /// Parse a run number from a string of one to four ASCII digits.
    ///
    /// Surrounding whitespace is ignored. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.trim().as_bytes();

        if bytes.is_empty() || bytes.len() > MAX_DIGITS {
            return None;
        }

        if !bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }

        let mut digits = [0u8; MAX_DIGITS];
        digits[..bytes.len()].copy_from_slice(bytes);
        Some(RunNumber {
            digits,
            len: bytes.len() as u8,
        })
    }

    /// Parse the run out of a schedule trip key such as "R301".
    pub fn from_schedule_key(key: &str) -> Option<Self> {
        key.strip_prefix('R').and_then(Self::parse)
    }

    /// Returns the run number as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII digits are ever stored.
        std::str::from_utf8(&self.digits[..self.len as usize]).unwrap_or_default()
    }

    /// The key under which the schedule files this run's trips.
    pub fn schedule_key(&self) -> String {
        format!("R{}", self.as_str())
    }
}

impl fmt::Debug for RunNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunNumber({})", self.as_str())
    }
}

impl fmt::Display for RunNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_runs() {
        assert!(RunNumber::parse("301").is_some());
        assert!(RunNumber::parse("1").is_some());
        assert!(RunNumber::parse("9999").is_some());
        assert!(RunNumber::parse(" 217 ").is_some());
    }

    #[test]
    fn keeps_leading_zeros() {
        let run = RunNumber::parse("004").unwrap();
        assert_eq!(run.as_str(), "004");
        assert_ne!(run, RunNumber::parse("4").unwrap());
    }

    #[test]
    fn reject_non_digits() {
        assert!(RunNumber::parse("R301").is_none());
        assert!(RunNumber::parse("30a").is_none());
        assert!(RunNumber::parse("-1").is_none());
    }

    #[test]
    fn reject_wrong_length() {
        assert!(RunNumber::parse("").is_none());
        assert!(RunNumber::parse("   ").is_none());
        assert!(RunNumber::parse("12345").is_none());
    }

    #[test]
    fn schedule_key_roundtrip() {
        let run = RunNumber::parse("217").unwrap();
        assert_eq!(run.schedule_key(), "R217");
        assert_eq!(RunNumber::from_schedule_key("R217"), Some(run));
        assert_eq!(RunNumber::from_schedule_key("217"), None);
    }

    #[test]
    fn display_and_debug() {
        let run = RunNumber::parse("831").unwrap();
        assert_eq!(format!("{}", run), "831");
        assert_eq!(format!("{:?}", run), "RunNumber(831)");
    }
}
