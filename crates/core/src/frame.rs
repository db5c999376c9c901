//! Frame numbers and the frame filename convention.
//!
//! Frame files are named `frame_<digits>.txt`. The digits are the frame
//! number in base 10; leading zeros are allowed, so `frame_001.txt` and
//! `frame_1.txt` both name frame 1.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FILE_PREFIX: &str = "frame_";
const FILE_SUFFIX: &str = ".txt";

/// Unique, non-negative identifier of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameNumber(u32);

impl FrameNumber {
    /// Largest representable frame number.
    pub const MAX: Self = Self(u32::MAX);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Value as stored in the database column.
    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FrameNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for FrameNumber {
    type Error = crate::Error;

    fn try_from(value: i64) -> crate::Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| crate::Error::InvalidFrameNumber(value.to_string()))
    }
}

/// Parses a bare run of ASCII digits.
///
/// Signs, whitespace and values beyond [`FrameNumber::MAX`] are rejected.
impl FromStr for FrameNumber {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::Error::InvalidFrameNumber(s.to_string()));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| crate::Error::InvalidFrameNumber(s.to_string()))
    }
}

/// Extract the frame number from a file name of the form `frame_<digits>.txt`.
///
/// Returns `None` for any other name, including names whose digits do not
/// fit a [`FrameNumber`].
pub fn parse_frame_file_name(name: &str) -> Option<FrameNumber> {
    let digits = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    digits.parse().ok()
}

/// Canonical file name for a frame (no zero padding).
pub fn frame_file_name(frame_number: FrameNumber) -> String {
    format!("{FILE_PREFIX}{frame_number}{FILE_SUFFIX}")
}
