//! Migration version identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Four-segment numeric version uniquely naming a migration, written
/// `<major>.<minor>.<patch>_<sequence>` (eg. `1.0.2_7`).
///
/// Ordering compares the segments numerically in order, never
/// lexicographically: `0.0.0_2 < 0.0.0_10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub sequence: u64,
}

impl Version {
    /// Construct a version from its four segments.
    pub fn new(major: u64, minor: u64, patch: u64, sequence: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            sequence,
        }
    }
}

fn parse_segment(input: &str, raw: &str) -> Result<u64, Error> {
    // Strict digits only; u64::parse would also accept a leading '+'.
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidVersionFormat(raw.to_string()));
    }
    input
        .parse::<u64>()
        .map_err(|_| Error::InvalidVersionFormat(raw.to_string()))
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dotted, sequence) = s
            .split_once('_')
            .ok_or_else(|| Error::InvalidVersionFormat(s.to_string()))?;

        let parts: Vec<&str> = dotted.split('.').collect();
        if parts.len() != 3 || sequence.contains('_') {
            return Err(Error::InvalidVersionFormat(s.to_string()));
        }

        Ok(Version {
            major: parse_segment(parts[0], s)?,
            minor: parse_segment(parts[1], s)?,
            patch: parse_segment(parts[2], s)?,
            sequence: parse_segment(sequence, s)?,
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.patch.cmp(&other.patch))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}_{}",
            self.major, self.minor, self.patch, self.sequence
        )
    }
}

// Versions serialize as their canonical string form so ledger and
// control records stay readable in the backing store.
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_valid() {
        let v: Version = "1.0.0_0".parse().unwrap();
        assert_eq!(v, Version::new(1, 0, 0, 0));

        let v: Version = "2.13.4_27".parse().unwrap();
        assert_eq!(v.major, 2);
        assert_eq!(v.minor, 13);
        assert_eq!(v.patch, 4);
        assert_eq!(v.sequence, 27);
    }

    #[test]
    fn test_version_parse_invalid() {
        for bad in [
            "", "1.0.0", "1.0_0", "1.0.0.0", "1.0.0_0_0", "a.b.c_d", "1.0.x_0", "1..0_0",
            "1.0.0_", "_", "1.0.0_+2", "-1.0.0_0", " 1.0.0_0",
        ] {
            let parsed = bad.parse::<Version>();
            assert!(parsed.is_err(), "expected failure for {bad:?}");
            assert!(matches!(
                parsed.unwrap_err(),
                Error::InvalidVersionFormat(_)
            ));
        }
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        let v2: Version = "0.0.0_2".parse().unwrap();
        let v10: Version = "0.0.0_10".parse().unwrap();
        assert!(v2 < v10, "sequence must compare numerically");

        let a: Version = "2.0.0_0".parse().unwrap();
        let b: Version = "10.0.0_0".parse().unwrap();
        assert!(a < b, "major must compare numerically");
    }

    #[test]
    fn test_version_ordering_segment_precedence() {
        let v1: Version = "1.0.0_9".parse().unwrap();
        let v2: Version = "1.0.1_0".parse().unwrap();
        let v3: Version = "1.1.0_0".parse().unwrap();
        let v4: Version = "2.0.0_0".parse().unwrap();

        assert!(v1 < v2);
        assert!(v2 < v3);
        assert!(v3 < v4);
    }

    #[test]
    fn test_version_display_round_trip() {
        let v: Version = "1.2.3_4".parse().unwrap();
        assert_eq!(v.to_string(), "1.2.3_4");
        assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
    }

    #[test]
    fn test_version_serde_as_string() {
        let v: Version = "1.2.3_4".parse().unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.2.3_4\"");

        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        assert!(serde_json::from_str::<Version>("\"1.2.3\"").is_err());
    }
}
