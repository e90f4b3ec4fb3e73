use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{IovDataError, MAX_SUBSTAMP_LENGTH, MAX_SUBSTAMP_VALUE};

/// A point in time at database precision.
///
/// Ordering is by whole seconds, then by the sub-second digits. The
/// canonical text form is `"<stamp>.<substamp>"` with the substamp always
/// zero padded to [`MAX_SUBSTAMP_LENGTH`] digits, which is also what the
/// conditions database sends back in its interval headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IovTimeStamp {
    stamp: u64,
    substamp: u32,
}

impl IovTimeStamp {
    /// Open upper bound, "valid forever"
    pub const MAX: Self = Self {
        stamp: u64::MAX,
        substamp: MAX_SUBSTAMP_VALUE,
    };

    pub const ZERO: Self = Self {
        stamp: 0,
        substamp: 0,
    };

    pub fn new(stamp: u64, substamp: u32) -> Result<Self, IovDataError> {
        if substamp > MAX_SUBSTAMP_VALUE {
            return Err(IovDataError::SubStampOutOfRange(substamp));
        }
        Ok(Self { stamp, substamp })
    }

    /// Whole seconds since epoch
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Sub-second digits at database precision
    pub fn substamp(&self) -> u32 {
        self.substamp
    }

    pub fn is_max(&self) -> bool {
        *self == Self::MAX
    }

    /// Canonical database representation, ex. `1620000000.000123`
    pub fn db_stamp(&self) -> String {
        self.to_string()
    }

    /// Truncates sub-microsecond precision. Instants before the epoch
    /// can't be represented.
    pub fn from_jiff(ts: jiff::Timestamp) -> Result<Self, IovDataError> {
        let stamp =
            u64::try_from(ts.as_second()).map_err(|_| IovDataError::MalformedTimeStamp(ts.to_string()))?;
        let substamp = (ts.subsec_nanosecond() / 1_000) as u32;
        Self::new(stamp, substamp)
    }

    /// `None` for stamps past what `jiff` can represent (including [`Self::MAX`])
    pub fn to_jiff(&self) -> Option<jiff::Timestamp> {
        let secs = i64::try_from(self.stamp).ok()?;
        jiff::Timestamp::new(secs, (self.substamp * 1_000) as i32).ok()
    }
}

impl fmt::Display for IovTimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.stamp,
            self.substamp,
            width = MAX_SUBSTAMP_LENGTH
        )
    }
}

impl FromStr for IovTimeStamp {
    type Err = IovDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IovDataError::MalformedTimeStamp(s.to_string());

        let s_trim = s.trim();
        let (secs, frac) = match s_trim.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (s_trim, ""),
        };

        if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let stamp = secs.parse::<u64>().map_err(|_| malformed())?;

        // fit the fraction to database precision: cut extra digits, pad missing ones
        let mut digits: String = frac.chars().take(MAX_SUBSTAMP_LENGTH).collect();
        while digits.len() < MAX_SUBSTAMP_LENGTH {
            digits.push('0');
        }
        let substamp = digits.parse::<u32>().map_err(|_| malformed())?;

        Self::new(stamp, substamp)
    }
}

impl TryFrom<String> for IovTimeStamp {
    type Error = IovDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IovTimeStamp> for String {
    fn from(value: IovTimeStamp) -> Self {
        value.to_string()
    }
}
