//! Negative exception codes for collective operations.
//!
//! A collective operation that fails on one rank must still complete on every
//! rank. The failing rank feeds an [`ExceptionCode`] into the collective; the
//! collective combines codes from all ranks and hands the same code back
//! everywhere, so every rank can unwind the phase identically.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A negative exception code.
///
/// Construction guarantees the value is strictly negative. When several ranks
/// raise different codes in the same collective, the smallest (most negative)
/// one wins, which makes the combined result independent of arrival order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct ExceptionCode(i32);

impl ExceptionCode {
    /// A rank announced more sends than there are other ranks.
    pub const TOO_MANY_SENDS: Self = Self(-1);
    /// A rank announced a send to itself or to a rank outside the run.
    pub const INVALID_DESTINATION: Self = Self(-2);
    /// A buffer could not be allocated, even after reclaiming.
    pub const OUT_OF_MEMORY: Self = Self(-3);
    /// A point-to-point channel to a discovered partner could not be set up.
    pub const CHANNEL_UNAVAILABLE: Self = Self(-4);
    /// The transport reported an error while a phase was in flight.
    pub const TRANSPORT: Self = Self(-5);

    /// Create from a raw code. The code must be negative.
    pub fn new(code: i32) -> Result<Self, CoreError> {
        if code < 0 {
            Ok(Self(code))
        } else {
            Err(CoreError::NotAnException(code))
        }
    }

    /// The raw negative value.
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Combine two codes raised in the same collective.
    pub fn combine(self, other: Self) -> Self {
        self.min(other)
    }

    /// Combine an optional accumulated code with another optional code.
    pub fn merge(acc: Option<Self>, other: Option<Self>) -> Option<Self> {
        match (acc, other) {
            (Some(a), Some(b)) => Some(a.combine(b)),
            (a, b) => a.or(b),
        }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::TOO_MANY_SENDS => Some("too many sends"),
            Self::INVALID_DESTINATION => Some("invalid destination"),
            Self::OUT_OF_MEMORY => Some("out of memory"),
            Self::CHANNEL_UNAVAILABLE => Some("channel unavailable"),
            Self::TRANSPORT => Some("transport failure"),
            _ => None,
        }
    }
}

impl fmt::Debug for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExceptionCode({})", self.0)
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl TryFrom<i32> for ExceptionCode {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<ExceptionCode> for i32 {
    fn from(code: ExceptionCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_negative() {
        assert!(ExceptionCode::new(0).is_err());
        assert!(ExceptionCode::new(5).is_err());
        assert_eq!(ExceptionCode::new(-7).unwrap().code(), -7);
    }

    #[test]
    fn test_merge() {
        let a = ExceptionCode::OUT_OF_MEMORY;
        assert_eq!(ExceptionCode::merge(None, None), None);
        assert_eq!(ExceptionCode::merge(Some(a), None), Some(a));
        assert_eq!(ExceptionCode::merge(None, Some(a)), Some(a));
        assert_eq!(
            ExceptionCode::merge(Some(ExceptionCode::TOO_MANY_SENDS), Some(a)),
            Some(a)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ExceptionCode::TOO_MANY_SENDS.to_string(),
            "-1 (too many sends)"
        );
        assert_eq!(ExceptionCode::new(-42).unwrap().to_string(), "-42");
    }

    #[test]
    fn test_serde_validates() {
        let json = serde_json::to_string(&ExceptionCode::OUT_OF_MEMORY).unwrap();
        assert_eq!(json, "-3");
        assert!(serde_json::from_str::<ExceptionCode>("3").is_err());
    }

    proptest! {
        #[test]
        fn combine_is_commutative(a in i32::MIN..0, b in i32::MIN..0) {
            let a = ExceptionCode::new(a).unwrap();
            let b = ExceptionCode::new(b).unwrap();
            prop_assert_eq!(a.combine(b), b.combine(a));
        }
    }
}
