//! Frame-accurate timeline engine for programmatic video.
//!
//! A composition is a declarative tree of time-scope nodes (`sequence`, `loop`, `freeze`,
//! `series`) around renderable leaves (display, video, audio, images). For every host frame the
//! engine derives, top-down, the clock and [`TimeScope`] each subtree observes, then keeps native
//! media elements in step with it.
//!
//! # Pipeline overview
//!
//! 1. **Lower**: `Composition -> Timeline` (series laid out, parameters validated, node paths
//!    assigned)
//! 2. **Evaluate**: `Timeline + FrameClock -> EvaluatedFrame` (which leaves are mounted, with
//!    which local frame)
//! 3. **Synchronize**: one adapter per mounted leaf seeks, plays or loads its native element
//! 4. **Capture** (off-line): wait until the [`HoldRegistry`] is empty, then push a
//!    [`CapturedFrame`] into a [`FrameSink`]
//!
//! Interactive players use [`PlaybackSession`]; off-line renderers use [`RenderSession`].
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Pure evaluation**: a frame's mounted leaves depend only on the timeline, the clock and the
//!   override store.
//! - **Explicit services**: holds and audio registrations live in session-owned registries.
//! - **Absorbed media failures**: a broken source follows its failure policy; only hold timeouts
//!   and aborts end a render.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod audio;
mod composition;
mod foundation;
mod hold;
mod media;
mod session;
mod timeline;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, FrameIndex, FrameRange, FrameSpan, Vec2,
};
pub use crate::foundation::error::{WavyteError, WavyteResult};
pub use crate::foundation::time::{ManualTime, MonotonicTime, TimeSource};

pub use crate::composition::dsl::{
    CompositionBuilder, LoopBuilder, SequenceBuilder, SeriesBuilder, audio, display, freeze,
    video,
};
pub use crate::composition::model::{
    AnimatedImageDef, AnimatedImageLoop, Composition, CompositionDescriptor, DisplayDef,
    FailurePolicy, FreezeDef, LoopDef, MediaDef, NodeDef, SequenceDef, SeriesDef,
    SeriesSequenceDef, StillDef,
};
pub use crate::composition::series::layout_series;

pub use crate::timeline::clock::FrameClock;
pub use crate::timeline::evaluator::{
    EvaluatedFrame, EvaluatedLeaf, Evaluator, TimelineVisitor, walk_timeline,
};
pub use crate::timeline::mount::{MountDiff, MountTracker};
pub use crate::timeline::overrides::{
    InMemoryOverrides, NoOverrides, OverrideStore, SequenceOverride,
};
pub use crate::timeline::scope::{
    LoopLayer, LoopStack, ResolvedSequence, ScopeEnv, SequenceState, TimeScope, sequence_state,
};
pub use crate::timeline::tree::{
    FreezeNode, LeafNode, LeafSlot, LoopNode, SequenceNode, SequenceParams, Timeline,
    TimelineNode,
};

pub use crate::hold::registry::{
    DEFAULT_HOLD_TIMEOUT, HoldGuard, HoldHandle, HoldOpts, HoldRegistry,
};

pub use crate::audio::loop_offsets::loop_offsets;
pub use crate::audio::manifest::{collect_audio_assets, leaf_audio_assets};
pub use crate::audio::registry::{AudioAsset, AudioAssetKey, AudioAssetRegistry, AudioSourceKind};

pub use crate::media::adapter::LeafAdapter;
pub use crate::media::element::{
    MediaElement, MediaEvent, MediaKind, MediaResource, MediaRuntime, ResourceKind,
};
pub use crate::media::still::{AnimatedImageSync, StillSync, select_frame};
pub use crate::media::sync::{
    AdapterContext, MediaSync, Presentation, SyncConfig, SyncMode,
};
pub use crate::media::timing::{MediaTarget, media_target, render_seek_position};

pub use crate::session::playback::{PlaybackSession, PlaybackSessionOpts};
pub use crate::session::render::{RenderSession, RenderSessionOpts, RenderStats};
pub use crate::session::sink::{CapturedFrame, CapturedLayer, FrameSink, InMemorySink, SinkConfig};
