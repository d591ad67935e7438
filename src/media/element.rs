use std::time::Duration;

use crate::foundation::error::WavyteResult;

/// Native element types with a playback position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Video element (also carries an audio track).
    Video,
    /// Audio element.
    Audio,
}

impl MediaKind {
    /// Lowercase name used in hold labels and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Native resources that only need to finish loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Still image.
    Image,
    /// Embedded document.
    Iframe,
}

/// Notifications delivered by native elements and resources.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaEvent {
    /// Metadata is available; the element can seek.
    LoadedMetadata {
        /// Native duration, when known.
        duration_sec: Option<f64>,
    },
    /// Image or iframe finished loading.
    Loaded,
    /// Animated image decoded.
    Decoded {
        /// Display duration of each frame.
        frame_durations_ms: Vec<u32>,
    },
    /// The last requested seek completed.
    Seeked,
    /// The frame at the current position is on screen (video only).
    FramePresented,
    /// A `play()` request started playback.
    PlayResolved,
    /// A `play()` request was refused.
    PlayRejected(String),
    /// Load, decode or seek failure.
    Error(String),
}

/// Anything that reports readiness through [`MediaEvent`]s.
pub trait MediaResource: Send {
    /// Next queued event, if any.
    fn poll_event(&mut self) -> Option<MediaEvent>;
}

/// Native video or audio element.
pub trait MediaElement: MediaResource {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Request a seek; completion is reported with [`MediaEvent::Seeked`].
    fn seek(&mut self, time_sec: f64);
    /// Request playback; the outcome is reported with `PlayResolved`/`PlayRejected`.
    fn play(&mut self);
    /// Pause immediately.
    fn pause(&mut self);
    /// `true` while paused.
    fn is_paused(&self) -> bool;
    /// Native playback rate.
    fn set_playback_rate(&mut self, rate: f64);
    /// Linear volume.
    fn set_volume(&mut self, volume: f64);
    /// Mute flag.
    fn set_muted(&mut self, muted: bool);
}

/// Host media stack: creates native elements and runs their pending work.
pub trait MediaRuntime {
    /// Create a video or audio element for `src`.
    fn create_element(&mut self, kind: MediaKind, src: &str)
    -> WavyteResult<Box<dyn MediaElement>>;

    /// Start loading an image or iframe.
    fn create_resource(
        &mut self,
        kind: ResourceKind,
        src: &str,
    ) -> WavyteResult<Box<dyn MediaResource>>;

    /// Start decoding an animated image.
    fn create_animated_image(&mut self, src: &str) -> WavyteResult<Box<dyn MediaResource>>;

    /// Run pending native work, blocking for at most `max_wait`.
    fn pump(&mut self, max_wait: Duration);
}
