/// Convenience result type used across the timeline crate.
pub type WavyteResult<T> = Result<T, WavyteError>;

/// Top-level error taxonomy used by timeline, hold and session APIs.
#[derive(thiserror::Error, Debug)]
pub enum WavyteError {
    /// Invalid composition, node configuration or override data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while evaluating timeline state for a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A render hold outlived its timeout and was evicted.
    #[error(
        "hold timeout: render hold {handle} (\"{label}\") was not released within {timeout_ms}ms"
    )]
    HoldTimeout {
        /// Handle of the evicted hold.
        handle: u64,
        /// Human label given when the hold was taken.
        label: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Release of a handle that is not pending (never issued, already released, or timed out).
    #[error("unknown hold: render hold {0} is not pending (double release or never issued)")]
    UnknownHold(u64),

    /// A frame did not settle within the driver's global wait budget.
    #[error("frame timeout: frame {frame} did not settle; pending holds: {}", .pending.join(", "))]
    FrameTimeout {
        /// Frame being captured.
        frame: u64,
        /// Labels of holds still outstanding.
        pending: Vec<String>,
    },

    /// Out-of-band fatal abort requested by a caller.
    #[error("render aborted: {0}")]
    Aborted(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WavyteError {
    /// Build a [`WavyteError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`WavyteError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`WavyteError::Aborted`] value.
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Build a [`WavyteError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that end the current render job.
    pub fn is_fatal_render_error(&self) -> bool {
        matches!(
            self,
            Self::HoldTimeout { .. } | Self::FrameTimeout { .. } | Self::Aborted(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
