use crate::composition::model::MediaDef;
use crate::foundation::core::Fps;

/// Where a media element should be for one local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaTarget {
    /// Past `end_at`: hidden, no seeks.
    Ended,
    /// Native time the element should show.
    Time(f64),
}

/// Map a local frame to native media time.
///
/// `media_frame = start_from + local_frame * playback_rate`, `time = media_frame / fps`, never
/// negative. With `loop` set and a known native duration, time wraps inside the trimmed window.
pub fn media_target(
    local_frame: i64,
    media: &MediaDef,
    fps: Fps,
    native_duration_sec: Option<f64>,
) -> MediaTarget {
    let media_frame = media.start_from as f64 + local_frame as f64 * media.playback_rate;
    let time = fps.frames_to_secs(media_frame).max(0.0);

    if media.loop_media {
        let start = fps.frames_to_secs(media.start_from as f64);
        let end = match (media.end_at, native_duration_sec) {
            (Some(end_at), _) => Some(fps.frames_to_secs(end_at as f64)),
            (None, Some(d)) if d.is_finite() => Some(d),
            (None, _) => None,
        };
        if let Some(end) = end
            && end > start
        {
            return MediaTarget::Time(start + (time - start).rem_euclid(end - start));
        }
        return MediaTarget::Time(time);
    }

    if let Some(end_at) = media.end_at
        && media_frame >= end_at as f64
    {
        return MediaTarget::Ended;
    }
    MediaTarget::Time(time)
}

/// Position a rendering-mode seek targets: half a frame past `time` so the decoder lands inside
/// the wanted frame.
pub fn render_seek_position(time: f64, fps: Fps) -> f64 {
    time + 0.5 * fps.frame_duration_secs()
}
