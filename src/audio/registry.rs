use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::foundation::core::FrameSpan;
use crate::foundation::error::{WavyteError, WavyteResult};

/// Element type an audio contribution comes from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AudioSourceKind {
    /// `audio` leaf.
    Audio,
    /// Audio track of a `video` leaf.
    Video,
}

/// One scheduled audio contribution, in composition frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    /// Source element type.
    pub kind: AudioSourceKind,
    /// Media source.
    pub src: String,
    /// Composition frame where playback starts.
    pub start_at_frame: i64,
    /// Length on the composition timeline.
    pub duration_in_frames: FrameSpan,
    /// Media frame played at `start_at_frame`.
    pub start_from: i64,
    /// Linear volume.
    pub volume: f64,
    /// Effective native rate.
    pub playback_rate: f64,
}

/// Content key: two assets with equal fields are the same contribution.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AudioAssetKey {
    start_at_frame: i64,
    kind: AudioSourceKind,
    src: String,
    duration_in_frames: Option<u64>,
    start_from: i64,
    volume_bits: u64,
    rate_bits: u64,
}

impl AudioAsset {
    /// Content key over every field.
    pub fn key(&self) -> AudioAssetKey {
        AudioAssetKey {
            start_at_frame: self.start_at_frame,
            kind: self.kind,
            src: self.src.clone(),
            duration_in_frames: self.duration_in_frames.finite(),
            start_from: self.start_from,
            volume_bits: self.volume.to_bits(),
            rate_bits: self.playback_rate.to_bits(),
        }
    }
}

/// Shared, content-keyed set of audio contributions collected during a render.
///
/// Registration is idempotent, so mount churn and repeated evaluation of the same frame never
/// duplicate an entry. Clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct AudioAssetRegistry {
    assets: Arc<Mutex<BTreeMap<AudioAssetKey, AudioAsset>>>,
}

impl AudioAssetRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AudioAssetKey, AudioAsset>> {
        self.assets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `asset`; returns `false` when an identical entry already exists.
    pub fn register(&self, asset: AudioAsset) -> bool {
        let key = asset.key();
        let mut assets = self.lock();
        if assets.contains_key(&key) {
            return false;
        }
        tracing::debug!(
            src = %asset.src,
            start_at_frame = asset.start_at_frame,
            "audio asset registered"
        );
        assets.insert(key, asset);
        true
    }

    /// Register every asset, returning how many were new.
    pub fn register_all(&self, assets: impl IntoIterator<Item = AudioAsset>) -> usize {
        assets.into_iter().map(|a| self.register(a)).filter(|new| *new).count()
    }

    /// Snapshot ordered by start frame.
    pub fn assets(&self) -> Vec<AudioAsset> {
        self.lock().values().cloned().collect()
    }

    /// Number of distinct contributions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget every contribution.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Pretty JSON array of the registered assets, for handing to an audio mixer.
    pub fn to_json_string(&self) -> WavyteResult<String> {
        serde_json::to_string_pretty(&self.assets()).map_err(|e| WavyteError::serde(e.to_string()))
    }
}
