use rayon::prelude::*;

use crate::audio::loop_offsets::loop_offsets;
use crate::audio::registry::{AudioAsset, AudioAssetRegistry, AudioSourceKind};
use crate::foundation::core::{FrameIndex, FrameRange, FrameSpan};
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::timeline::clock::FrameClock;
use crate::timeline::evaluator::{EvaluatedLeaf, Evaluator};
use crate::timeline::overrides::OverrideStore;
use crate::timeline::tree::{LeafNode, Timeline};

/// Audio contributions of one mounted leaf: one per loop repetition.
///
/// Muted and zero-volume sources, and leaves without audio, contribute nothing. Start and duration
/// are composition frames: the enclosing scope's placement on the composition timeline, clipped to
/// `end_at - start_from` media frames played at the effective rate. A contribution that would
/// start before frame 0 is trimmed to start at 0.
pub fn leaf_audio_assets(
    leaf: &EvaluatedLeaf,
    composition_duration: FrameSpan,
) -> WavyteResult<Vec<AudioAsset>> {
    let (kind, media) = match leaf.leaf.as_ref() {
        LeafNode::Audio(m) => (AudioSourceKind::Audio, m),
        LeafNode::Video(m) => (AudioSourceKind::Video, m),
        _ => return Ok(Vec::new()),
    };
    if media.muted || media.volume == 0.0 {
        return Ok(Vec::new());
    }

    let scope = &leaf.env.scope;
    let playback_rate = media.playback_rate * scope.accumulated_playback_rate;
    let mut duration = scope.composition_duration;
    if let Some(end_at) = media.end_at {
        let media_frames = (end_at - media.start_from) as f64;
        duration = duration.min(FrameSpan::Finite(
            (media_frames / playback_rate).ceil() as u64,
        ));
    }

    let starts = loop_offsets(
        scope.composition_offset.round() as i64,
        &scope.loop_stack,
        composition_duration,
    )?;
    Ok(starts
        .into_iter()
        .filter_map(|start| {
            let mut asset = AudioAsset {
                kind,
                src: media.src.clone(),
                start_at_frame: start,
                duration_in_frames: duration,
                start_from: media.start_from,
                volume: media.volume,
                playback_rate,
            };
            if start < 0 {
                let skip = start.unsigned_abs();
                asset.duration_in_frames = match duration {
                    FrameSpan::Finite(d) if d <= skip => return None,
                    FrameSpan::Finite(d) => FrameSpan::Finite(d - skip),
                    FrameSpan::Infinite => FrameSpan::Infinite,
                };
                asset.start_from += ((skip as f64) * playback_rate).round() as i64;
                asset.start_at_frame = 0;
            }
            Some(asset)
        })
        .collect())
}

/// Evaluate `range` and register the audio of every visible leaf into `registry`.
///
/// Frames are evaluated independently, so the scan fans out across the current rayon pool when
/// `parallel` is set. Returns the number of newly registered contributions.
#[tracing::instrument(skip(timeline, overrides, registry))]
pub fn collect_audio_assets(
    timeline: &Timeline,
    range: FrameRange,
    overrides: &dyn OverrideStore,
    registry: &AudioAssetRegistry,
    parallel: bool,
) -> WavyteResult<usize> {
    if range.is_empty() {
        return Err(WavyteError::validation("audio scan range must be non-empty"));
    }
    let duration = timeline.descriptor().duration_in_frames;
    if let Some(d) = duration.finite()
        && range.end.0 > d
    {
        return Err(WavyteError::validation(
            "audio scan range must be within composition duration",
        ));
    }

    let scan = |f: u64| -> WavyteResult<usize> {
        let frame = Evaluator::eval_frame(timeline, FrameClock::paused(FrameIndex(f)), overrides)?;
        let mut added = 0;
        for leaf in frame.visible() {
            added += registry.register_all(leaf_audio_assets(leaf, duration)?);
        }
        Ok(added)
    };

    let counts: Vec<usize> = if parallel {
        (range.start.0..range.end.0)
            .into_par_iter()
            .map(scan)
            .collect::<WavyteResult<_>>()?
    } else {
        (range.start.0..range.end.0)
            .map(scan)
            .collect::<WavyteResult<_>>()?
    };
    let added = counts.into_iter().sum();
    tracing::debug!(added, total = registry.len(), "audio scan finished");
    Ok(added)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/manifest.rs"]
mod tests;
