use std::collections::BTreeMap;
use std::path::Path;

use kurbo::{Affine, Vec2};
use serde::{Deserialize, Serialize};

use crate::foundation::core::FrameSpan;
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::timeline::scope::ResolvedSequence;
use crate::timeline::tree::SequenceParams;

/// Editor-supplied replacement for a sequence's timing and placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceOverride {
    /// Replacement start relative to the parent.
    pub from: i64,
    /// Replacement length.
    pub duration_in_frames: FrameSpan,
    /// Replacement editor track.
    #[serde(default)]
    pub track_index: Option<u32>,
    /// Horizontal translation.
    #[serde(default)]
    pub x: Option<f64>,
    /// Vertical translation.
    #[serde(default)]
    pub y: Option<f64>,
    /// Horizontal scale.
    #[serde(default)]
    pub scale_x: Option<f64>,
    /// Vertical scale.
    #[serde(default)]
    pub scale_y: Option<f64>,
    /// Replacement clock multiplier.
    #[serde(default)]
    pub playback_rate: Option<f64>,
}

impl SequenceOverride {
    /// Override that only moves and resizes a sequence in time.
    pub fn timing(from: i64, duration_in_frames: FrameSpan) -> Self {
        Self {
            from,
            duration_in_frames,
            track_index: None,
            x: None,
            y: None,
            scale_x: None,
            scale_y: None,
            playback_rate: None,
        }
    }

    /// Reject malformed overrides; `path` names the sequence in the error.
    pub fn validate(&self, path: &str) -> WavyteResult<()> {
        if self.duration_in_frames == FrameSpan::Finite(0) {
            return Err(WavyteError::validation(format!(
                "override for '{path}': duration_in_frames must be > 0"
            )));
        }
        if let Some(rate) = self.playback_rate
            && (!rate.is_finite() || rate <= 0.0)
        {
            return Err(WavyteError::validation(format!(
                "override for '{path}': playback_rate must be finite and > 0"
            )));
        }
        for (field, v) in [
            ("x", self.x),
            ("y", self.y),
            ("scale_x", self.scale_x),
            ("scale_y", self.scale_y),
        ] {
            if let Some(v) = v
                && !v.is_finite()
            {
                return Err(WavyteError::validation(format!(
                    "override for '{path}': {field} must be finite"
                )));
            }
        }
        Ok(())
    }

    /// Placement relative to the parent: scale first, then translate.
    pub fn placement(&self) -> Affine {
        let translate = Vec2::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0));
        Affine::translate(translate)
            * Affine::scale_non_uniform(self.scale_x.unwrap_or(1.0), self.scale_y.unwrap_or(1.0))
    }
}

/// Lookup of editor overrides keyed by sequence `name_path`.
pub trait OverrideStore: Send + Sync {
    /// Override for the sequence at `name_path`, if any.
    fn lookup(&self, name_path: &str) -> Option<SequenceOverride>;
}

/// Store that never overrides anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOverrides;

impl OverrideStore for NoOverrides {
    fn lookup(&self, _name_path: &str) -> Option<SequenceOverride> {
        None
    }
}

/// Map-backed store, loadable from a JSON object of `path -> override`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryOverrides {
    entries: BTreeMap<String, SequenceOverride>,
}

impl InMemoryOverrides {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON override document.
    pub fn from_json_str(json: &str) -> WavyteResult<Self> {
        let store: Self =
            serde_json::from_str(json).map_err(|e| WavyteError::serde(e.to_string()))?;
        for (path, ov) in &store.entries {
            ov.validate(path)?;
        }
        Ok(store)
    }

    /// Read an override document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> WavyteResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            WavyteError::Other(anyhow::anyhow!(
                "failed to read overrides '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Insert or replace an override.
    pub fn insert(
        &mut self,
        name_path: impl Into<String>,
        ov: SequenceOverride,
    ) -> WavyteResult<()> {
        let name_path = name_path.into();
        ov.validate(&name_path)?;
        self.entries.insert(name_path, ov);
        Ok(())
    }

    /// Remove an override.
    pub fn remove(&mut self, name_path: &str) -> Option<SequenceOverride> {
        self.entries.remove(name_path)
    }

    /// Number of stored overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideStore for InMemoryOverrides {
    fn lookup(&self, name_path: &str) -> Option<SequenceOverride> {
        self.entries.get(name_path).cloned()
    }
}

/// Apply the override for `name_path`, if any, to declared sequence parameters.
pub(crate) fn resolve_sequence(
    params: &SequenceParams,
    name_path: &str,
    overrides: &dyn OverrideStore,
) -> WavyteResult<ResolvedSequence> {
    let mut resolved = ResolvedSequence {
        id: params.id.clone(),
        from: params.from,
        duration_in_frames: params.duration_in_frames,
        playback_rate: params.playback_rate,
        track_index: params.track_index,
        premount_for: params.premount_for,
        placement: Affine::IDENTITY,
    };
    let Some(ov) = overrides.lookup(name_path) else {
        return Ok(resolved);
    };
    ov.validate(name_path)?;
    tracing::trace!(path = name_path, from = ov.from, "applying sequence override");

    resolved.from = ov.from;
    resolved.duration_in_frames = ov.duration_in_frames;
    if let Some(track) = ov.track_index {
        resolved.track_index = track;
    }
    if let Some(rate) = ov.playback_rate {
        resolved.playback_rate = rate;
    }
    resolved.placement = ov.placement();
    Ok(resolved)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/overrides.rs"]
mod tests;
