use crate::foundation::error::{WavyteError, WavyteResult};

pub use kurbo::{Affine, Vec2};

/// Global frame number driven by the host player or renderer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open range of global frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame in the range.
    pub start: FrameIndex,
    /// Exclusive end frame.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> WavyteResult<Self> {
        if start.0 > end.0 {
            return Err(WavyteError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames covered.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// `true` when the range covers no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// `true` when `f` lies in `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Rational frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator.
    pub num: u32,
    /// Denominator, must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a validated frame rate.
    pub fn new(num: u32, den: u32) -> WavyteResult<Self> {
        if den == 0 {
            return Err(WavyteError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(WavyteError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Length of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert a (possibly fractional) frame position to seconds.
    pub fn frames_to_secs(self, frames: f64) -> f64 {
        frames * f64::from(self.den) / f64::from(self.num)
    }

    /// Convert seconds to a (fractional) frame position.
    pub fn secs_to_frames(self, secs: f64) -> f64 {
        secs * self.as_f64()
    }
}

/// Output pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A duration in frames that may be unbounded.
///
/// Serialized as a plain integer, or as the string `"infinite"` (also accepted: `"inf"`,
/// `"infinity"`, `null`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameSpan {
    /// A bounded number of frames.
    Finite(u64),
    /// No upper bound.
    #[default]
    Infinite,
}

impl FrameSpan {
    /// `Some(n)` for finite spans.
    pub fn finite(self) -> Option<u64> {
        match self {
            Self::Finite(n) => Some(n),
            Self::Infinite => None,
        }
    }

    /// `true` for finite spans.
    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// `true` when `local` lies in `[0, self)`.
    pub fn contains(self, local: i64) -> bool {
        if local < 0 {
            return false;
        }
        match self {
            Self::Finite(n) => (local as u64) < n,
            Self::Infinite => true,
        }
    }

    /// Exclusive end frame when the span starts at `start`.
    pub fn end_after(self, start: i64) -> Option<i64> {
        self.finite()
            .map(|n| start.saturating_add(i64::try_from(n).unwrap_or(i64::MAX)))
    }

    /// Smaller of two spans; `Infinite` is the identity.
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Finite(a), Self::Finite(b)) => Self::Finite(a.min(b)),
            (Self::Finite(a), Self::Infinite) | (Self::Infinite, Self::Finite(a)) => {
                Self::Finite(a)
            }
            (Self::Infinite, Self::Infinite) => Self::Infinite,
        }
    }
}

impl From<u64> for FrameSpan {
    fn from(n: u64) -> Self {
        Self::Finite(n)
    }
}

impl std::fmt::Display for FrameSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::Infinite => f.write_str("infinite"),
        }
    }
}

impl serde::Serialize for FrameSpan {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Finite(n) => serializer.serialize_u64(*n),
            Self::Infinite => serializer.serialize_str("infinite"),
        }
    }
}

impl<'de> serde::Deserialize<'de> for FrameSpan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Frames(u64),
            Keyword(String),
            Null(()),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Frames(n) => Ok(Self::Finite(n)),
            Repr::Null(()) => Ok(Self::Infinite),
            Repr::Keyword(s) => match s.as_str() {
                "infinite" | "inf" | "infinity" => Ok(Self::Infinite),
                other => Err(serde::de::Error::custom(format!(
                    "expected a frame count or \"infinite\", got \"{other}\""
                ))),
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
