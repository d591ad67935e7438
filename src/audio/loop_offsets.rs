use crate::foundation::core::FrameSpan;
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::timeline::scope::LoopLayer;

/// Absolute start frames of every repetition of a source nested in `layers`.
///
/// `base` is the source's start frame in the first iteration of every enclosing loop. Each layer
/// contributes `{0, p, .., (iterations - 1) * p}` where `p` is its period in composition frames;
/// a combination survives only while its rounded start stays inside the composition. The result
/// is sorted and deduplicated.
pub fn loop_offsets(
    base: i64,
    layers: &[LoopLayer],
    composition_duration: FrameSpan,
) -> WavyteResult<Vec<i64>> {
    let end = composition_duration.end_after(0);
    let start = |offset: f64| base.saturating_add(offset.round() as i64);
    let inside = |offset: f64| end.is_none_or(|end| start(offset) < end);

    let mut candidates = vec![0.0_f64];
    for layer in layers {
        if layer.duration_in_frames == 0 {
            return Err(WavyteError::validation("loop layer period must be > 0"));
        }
        if !(layer.playback_rate.is_finite() && layer.playback_rate > 0.0) {
            return Err(WavyteError::validation(
                "loop layer playback rate must be finite and > 0",
            ));
        }
        let period = layer.duration_in_frames as f64 / layer.playback_rate;
        let iterations = match (layer.iterations, end) {
            (FrameSpan::Finite(n), _) => n,
            (FrameSpan::Infinite, Some(end)) => (end.max(0) as f64 / period).floor() as u64 + 1,
            (FrameSpan::Infinite, None) => {
                return Err(WavyteError::validation(
                    "cannot enumerate an infinite loop inside an infinite composition",
                ));
            }
        };

        let mut next = Vec::with_capacity(candidates.len());
        for &c in &candidates {
            for k in 0..iterations {
                let offset = c + period * k as f64;
                if !inside(offset) {
                    break;
                }
                next.push(offset);
            }
        }
        candidates = next;
    }

    let mut out: Vec<i64> = candidates
        .into_iter()
        .filter(|c| inside(*c))
        .map(start)
        .collect();
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/loop_offsets.rs"]
mod tests;
