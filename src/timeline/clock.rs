use crate::foundation::core::FrameIndex;

/// The frame a subtree observes and whether playback is running.
///
/// The host sets a non-negative frame once per tick; clocks republished by time-scope nodes may
/// carry any integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameClock {
    /// Current frame.
    pub frame: i64,
    /// Whether native playback should be running.
    pub playing: bool,
}

impl FrameClock {
    /// Paused clock at a host frame (scrubbing, off-line capture).
    pub fn paused(frame: FrameIndex) -> Self {
        Self {
            frame: frame_i64(frame),
            playing: false,
        }
    }

    /// Running clock at a host frame (interactive playback).
    pub fn playing(frame: FrameIndex) -> Self {
        Self {
            frame: frame_i64(frame),
            playing: true,
        }
    }

    /// Same play state, different frame.
    pub fn with_frame(self, frame: i64) -> Self {
        Self { frame, ..self }
    }
}

fn frame_i64(frame: FrameIndex) -> i64 {
    i64::try_from(frame.0).unwrap_or(i64::MAX)
}
