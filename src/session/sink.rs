use kurbo::Affine;

use crate::audio::registry::AudioAsset;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::WavyteResult;
use crate::media::sync::Presentation;

/// Configuration provided to a [`FrameSink`] at the start of a range capture.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Audio contributions to mix alongside the frames; empty when audio is disabled.
    pub audio: Vec<AudioAsset>,
}

/// One visible leaf in a captured frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedLayer {
    /// Full node path.
    pub path: String,
    /// Leaf kind tag.
    pub kind: &'static str,
    /// Leaf id.
    pub id: String,
    /// Frame the leaf observed, relative to its scope.
    pub local_frame: i64,
    /// Editor track of the enclosing sequence.
    pub track_index: u32,
    /// Accumulated override placement.
    pub placement: Affine,
    /// What the leaf shows.
    pub presentation: Presentation,
}

/// A settled frame: every hold released, every visible leaf in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Host frame.
    pub frame: FrameIndex,
    /// Visible leaves in document order.
    pub layers: Vec<CapturedLayer>,
}

impl CapturedFrame {
    /// Layer at a full path.
    pub fn layer(&self, path: &str) -> Option<&CapturedLayer> {
        self.layers.iter().find(|l| l.path == path)
    }
}

/// Sink contract for consuming captured frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order within the
/// requested range.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> WavyteResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, frame: &CapturedFrame) -> WavyteResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> WavyteResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<CapturedFrame>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    /// `true` once `end` was called.
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> WavyteResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &CapturedFrame) -> WavyteResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> WavyteResult<()> {
        self.ended = true;
        Ok(())
    }
}
