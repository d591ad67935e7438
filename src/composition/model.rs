use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps, FrameSpan};
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::timeline::tree::Timeline;

/// Static per-composition metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositionDescriptor {
    /// Stable composition identifier; also the root of every node path.
    pub id: String,
    /// Output dimensions.
    pub canvas: Canvas,
    /// Frame rate.
    pub fps: Fps,
    /// Total duration. Off-line rendering requires a finite value.
    pub duration_in_frames: FrameSpan,
    /// Default input parameters handed to display leaves.
    #[serde(default)]
    pub default_props: serde_json::Map<String, serde_json::Value>,
}

impl CompositionDescriptor {
    /// Validate descriptor invariants.
    pub fn validate(&self) -> WavyteResult<()> {
        if self.id.trim().is_empty() {
            return Err(WavyteError::validation("composition id must be non-empty"));
        }
        if self.id.contains('/') {
            return Err(WavyteError::validation(format!(
                "composition id '{}' must not contain '/'",
                self.id
            )));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(WavyteError::validation("canvas width/height must be > 0"));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(WavyteError::validation("fps must have num>0 and den>0"));
        }
        if self.duration_in_frames == FrameSpan::Finite(0) {
            return Err(WavyteError::validation(
                "composition duration must be > 0 frames",
            ));
        }
        Ok(())
    }
}

/// A composition document: descriptor plus the declarative node tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Composition {
    /// Composition metadata.
    #[serde(flatten)]
    pub descriptor: CompositionDescriptor,
    /// Top-level nodes, rendered in order.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

impl Composition {
    /// Parse a composition from a JSON string.
    pub fn from_json_str(json: &str) -> WavyteResult<Self> {
        serde_json::from_str(json).map_err(|e| WavyteError::serde(e.to_string()))
    }

    /// Read and parse a composition JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> WavyteResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            WavyteError::Other(anyhow::anyhow!(
                "failed to read composition '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> WavyteResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| WavyteError::serde(e.to_string()))
    }

    /// Validate the descriptor and the whole node tree.
    pub fn validate(&self) -> WavyteResult<()> {
        self.timeline().map(|_| ())
    }

    /// Lower the declarative tree into an evaluable [`Timeline`].
    pub fn timeline(&self) -> WavyteResult<Timeline> {
        Timeline::from_composition(self)
    }
}

/// Declarative node, tagged by `kind` in JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDef {
    /// Time-shifted, optionally bounded and rescaled window.
    Sequence(SequenceDef),
    /// Repeats its children every `duration_in_frames`.
    Loop(LoopDef),
    /// Pins its children to one frame.
    Freeze(FreezeDef),
    /// Lays out `series_sequence` children back to back.
    Series(SeriesDef),
    /// One entry of a [`NodeDef::Series`]; invalid anywhere else.
    SeriesSequence(SeriesSequenceDef),
    /// Visual element rendered by the host from its local frame.
    Display(DisplayDef),
    /// Video element synchronized to the timeline.
    Video(MediaDef),
    /// Audio element synchronized to the timeline.
    Audio(MediaDef),
    /// Animated image (GIF/APNG-like) driven by the local frame.
    AnimatedImage(AnimatedImageDef),
    /// Still image that must finish loading before capture.
    Image(StillDef),
    /// Embedded document that must finish loading before capture.
    Iframe(StillDef),
}

impl NodeDef {
    /// JSON tag of this node kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Sequence(_) => "sequence",
            Self::Loop(_) => "loop",
            Self::Freeze(_) => "freeze",
            Self::Series(_) => "series",
            Self::SeriesSequence(_) => "series_sequence",
            Self::Display(_) => "display",
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
            Self::AnimatedImage(_) => "animated_image",
            Self::Image(_) => "image",
            Self::Iframe(_) => "iframe",
        }
    }
}

fn default_rate() -> f64 {
    1.0
}

fn default_volume() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Parameters of a `sequence` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
    /// Opaque identifier published on the scope.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name; part of the override path.
    #[serde(default)]
    pub name: Option<String>,
    /// Start relative to the parent scope.
    #[serde(default)]
    pub from: i64,
    /// Visible length; infinite by default.
    #[serde(default)]
    pub duration_in_frames: FrameSpan,
    /// Clock multiplier for children.
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    /// Editor track the sequence is shown on.
    #[serde(default)]
    pub track_index: u32,
    /// Frames before `from` during which children are mounted hidden.
    #[serde(default)]
    pub premount_for: u64,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

impl Default for SequenceDef {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            from: 0,
            duration_in_frames: FrameSpan::Infinite,
            playback_rate: 1.0,
            track_index: 0,
            premount_for: 0,
            children: Vec::new(),
        }
    }
}

impl SequenceDef {
    pub(crate) fn validate(&self) -> WavyteResult<()> {
        let what = self.name.as_deref().unwrap_or("sequence");
        validate_name(self.name.as_deref())?;
        if self.duration_in_frames == FrameSpan::Finite(0) {
            return Err(WavyteError::validation(format!(
                "{what} duration_in_frames must be > 0"
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(WavyteError::validation(format!(
                "{what} playback_rate must be finite and > 0"
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_name(name: Option<&str>) -> WavyteResult<()> {
    match name {
        Some(n) if n.trim().is_empty() => {
            Err(WavyteError::validation("node name must be non-empty"))
        }
        Some(n) if n.contains('/') => Err(WavyteError::validation(format!(
            "node name '{n}' must not contain '/'"
        ))),
        _ => Ok(()),
    }
}

/// Parameters of a `loop` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopDef {
    /// Display name; part of the node path.
    #[serde(default)]
    pub name: Option<String>,
    /// Period of one iteration.
    pub duration_in_frames: u64,
    /// Number of iterations; infinite by default.
    #[serde(default)]
    pub times: FrameSpan,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

impl LoopDef {
    pub(crate) fn validate(&self) -> WavyteResult<()> {
        validate_name(self.name.as_deref())?;
        if self.duration_in_frames == 0 {
            return Err(WavyteError::validation("loop duration_in_frames must be > 0"));
        }
        if self.times == FrameSpan::Finite(0) {
            return Err(WavyteError::validation("loop times must be >= 1"));
        }
        Ok(())
    }
}

/// Parameters of a `freeze` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreezeDef {
    /// Local frame the children observe, counted from the start of the enclosing scope. Under a
    /// sequence starting at absolute frame 30, `frame: 12` pins the clock to absolute frame 42.
    pub frame: i64,
    /// When `false` the real clock passes through.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

/// Parameters of a `series` node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDef {
    /// Entries; each must be a `series_sequence`.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

/// One entry of a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesSequenceDef {
    /// Opaque identifier published on the scope.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name; part of the override path.
    #[serde(default)]
    pub name: Option<String>,
    /// Length of this entry. Only the last entry may be infinite.
    pub duration_in_frames: FrameSpan,
    /// Shift relative to the end of the previous entry (negative overlaps).
    #[serde(default)]
    pub offset: i64,
    /// Frames before the entry start during which children are mounted hidden.
    #[serde(default)]
    pub premount_for: u64,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

/// Host-rendered visual leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayDef {
    /// Identifier, unique among siblings.
    pub id: String,
    /// Free-form input parameters.
    #[serde(default)]
    pub props: serde_json::Value,
}

/// What a media leaf shows after a load, decode or seek failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Show nothing.
    #[default]
    Blank,
    /// Keep showing the last frame that was successfully presented.
    KeepLastFrame,
}

/// Video or audio leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaDef {
    /// Identifier, unique among siblings.
    pub id: String,
    /// Media source.
    pub src: String,
    /// Media frame shown at local frame 0.
    #[serde(default)]
    pub start_from: i64,
    /// Exclusive media frame after which the element is hidden.
    #[serde(default)]
    pub end_at: Option<i64>,
    /// Linear volume.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Silences the element and skips audio registration.
    #[serde(default)]
    pub muted: bool,
    /// Own playback rate, multiplied with the inherited rate.
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    /// Wrap media time at the native duration.
    #[serde(default, rename = "loop")]
    pub loop_media: bool,
    /// Failure fallback.
    #[serde(default)]
    pub on_error: FailurePolicy,
    /// Interactive drift tolerance override, seconds.
    #[serde(default)]
    pub acceptable_drift_sec: Option<f64>,
}

impl MediaDef {
    /// Media leaf with default trims and playback controls.
    pub fn new(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            start_from: 0,
            end_at: None,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            loop_media: false,
            on_error: FailurePolicy::Blank,
            acceptable_drift_sec: None,
        }
    }

    pub(crate) fn validate(&self) -> WavyteResult<()> {
        if self.src.trim().is_empty() {
            return Err(WavyteError::validation(format!(
                "media '{}' src must be non-empty",
                self.id
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(WavyteError::validation(format!(
                "media '{}' volume must be finite and >= 0",
                self.id
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(WavyteError::validation(format!(
                "media '{}' playback_rate must be finite and > 0",
                self.id
            )));
        }
        if self.start_from < 0 {
            return Err(WavyteError::validation(format!(
                "media '{}' start_from must be >= 0",
                self.id
            )));
        }
        if let Some(end) = self.end_at
            && end <= self.start_from
        {
            return Err(WavyteError::validation(format!(
                "media '{}' end_at must be greater than start_from",
                self.id
            )));
        }
        if let Some(d) = self.acceptable_drift_sec
            && (!d.is_finite() || d <= 0.0)
        {
            return Err(WavyteError::validation(format!(
                "media '{}' acceptable_drift_sec must be finite and > 0",
                self.id
            )));
        }
        Ok(())
    }
}

/// Frame selection once an animated image runs past its last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatedImageLoop {
    /// Start over from the first frame.
    #[default]
    Loop,
    /// Hold the last frame.
    PauseAfterFinish,
    /// Show nothing.
    ClearAfterFinish,
}

/// Animated image leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimatedImageDef {
    /// Identifier, unique among siblings.
    pub id: String,
    /// Image source.
    pub src: String,
    /// Animation speed multiplier.
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    /// Behaviour past the final frame.
    #[serde(default)]
    pub loop_behavior: AnimatedImageLoop,
    /// Failure fallback.
    #[serde(default)]
    pub on_error: FailurePolicy,
}

impl AnimatedImageDef {
    pub(crate) fn validate(&self) -> WavyteResult<()> {
        if self.src.trim().is_empty() {
            return Err(WavyteError::validation(format!(
                "animated image '{}' src must be non-empty",
                self.id
            )));
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(WavyteError::validation(format!(
                "animated image '{}' playback_rate must be finite and > 0",
                self.id
            )));
        }
        Ok(())
    }
}

/// Still image or iframe leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StillDef {
    /// Identifier, unique among siblings.
    pub id: String,
    /// Resource source.
    pub src: String,
    /// Failure fallback.
    #[serde(default)]
    pub on_error: FailurePolicy,
}

impl StillDef {
    pub(crate) fn validate(&self) -> WavyteResult<()> {
        if self.src.trim().is_empty() {
            return Err(WavyteError::validation(format!(
                "'{}' src must be non-empty",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
