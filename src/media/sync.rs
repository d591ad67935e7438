use std::sync::Arc;
use std::time::Duration;

use crate::audio::manifest::leaf_audio_assets;
use crate::audio::registry::AudioAssetRegistry;
use crate::composition::model::{FailurePolicy, MediaDef};
use crate::foundation::core::{Fps, FrameSpan};
use crate::foundation::time::TimeSource;
use crate::hold::registry::{HoldHandle, HoldOpts, HoldRegistry};
use crate::media::element::{MediaElement, MediaEvent, MediaKind, MediaRuntime};
use crate::media::timing::{MediaTarget, media_target, render_seek_position};
use crate::timeline::evaluator::EvaluatedLeaf;

/// How adapters drive their native element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Native playback runs freely and is corrected only on large drift.
    Interactive,
    /// Native element stays paused and is seeked to every frame under a render hold.
    Rendering,
}

/// Synchronization tolerances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncConfig {
    /// Interactive drift tolerated before a corrective seek.
    pub acceptable_drift_sec: f64,
    /// Minimum interval between interactive corrective seeks.
    pub seek_cooldown: Duration,
    /// Positions closer than this are treated as equal.
    pub seek_epsilon_sec: f64,
    /// Timeout for load and seek holds; `None` uses the registry default.
    pub hold_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            acceptable_drift_sec: 0.3,
            seek_cooldown: Duration::from_millis(500),
            seek_epsilon_sec: 0.001,
            hold_timeout: None,
        }
    }
}

/// What a leaf shows at the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Presentation {
    /// Nothing.
    Hidden,
    /// Not ready yet.
    Pending,
    /// Native media position.
    MediaTime {
        /// Seconds.
        time_sec: f64,
    },
    /// Fully loaded still content (image, iframe, host-rendered display).
    Still,
    /// One decoded animation frame.
    AnimatedFrame {
        /// Frame index.
        index: usize,
    },
}

/// Session services shared by every adapter.
#[derive(Clone, Debug)]
pub struct AdapterContext {
    /// Driving mode.
    pub mode: SyncMode,
    /// Tolerances.
    pub config: SyncConfig,
    /// Composition frame rate.
    pub fps: Fps,
    /// Composition duration, bounds loop repetitions for audio registration.
    pub composition_duration: FrameSpan,
    /// Render holds.
    pub holds: HoldRegistry,
    /// Audio contributions (rendering mode only).
    pub audio: AudioAssetRegistry,
}

impl AdapterContext {
    pub(crate) fn time(&self) -> Arc<dyn TimeSource> {
        self.holds.time()
    }

    pub(crate) fn hold(&self, label: &str) -> HoldHandle {
        self.holds.hold_render(
            Some(label),
            HoldOpts {
                timeout: self.config.hold_timeout,
            },
        )
    }

    pub(crate) fn release(&self, handle: &mut Option<HoldHandle>) {
        if let Some(h) = handle.take()
            && let Err(err) = self.holds.release_render(h)
        {
            tracing::debug!(handle = h.0, %err, "hold already gone");
        }
    }
}

#[derive(Debug)]
struct PendingSeek {
    position: f64,
    hold: Option<HoldHandle>,
    seeked: bool,
    presented: bool,
}

/// Keeps one native video or audio element in step with the timeline.
pub struct MediaSync {
    path: String,
    kind: MediaKind,
    def: MediaDef,
    element: Option<Box<dyn MediaElement>>,
    metadata_loaded: bool,
    native_duration: Option<f64>,
    load_hold: Option<HoldHandle>,
    seek: Option<PendingSeek>,
    play_in_flight: bool,
    last_corrective_seek: Option<Duration>,
    last_presented: Option<f64>,
    applied_rate: Option<f64>,
    target: Option<MediaTarget>,
    playing: bool,
    visible: bool,
    failed: Option<String>,
}

impl std::fmt::Debug for MediaSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSync")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("metadata_loaded", &self.metadata_loaded)
            .field("seek", &self.seek)
            .field("play_in_flight", &self.play_in_flight)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl MediaSync {
    /// Create the native element for a newly mounted leaf.
    ///
    /// Creation failures are absorbed: the adapter starts in the failed state.
    pub fn mount(
        path: &str,
        kind: MediaKind,
        def: &MediaDef,
        runtime: &mut dyn MediaRuntime,
        ctx: &AdapterContext,
    ) -> Self {
        let mut sync = Self {
            path: path.to_owned(),
            kind,
            def: def.clone(),
            element: None,
            metadata_loaded: false,
            native_duration: None,
            load_hold: None,
            seek: None,
            play_in_flight: false,
            last_corrective_seek: None,
            last_presented: None,
            applied_rate: None,
            target: None,
            playing: false,
            visible: false,
            failed: None,
        };
        match runtime.create_element(kind, &def.src) {
            Ok(mut el) => {
                el.set_volume(def.volume);
                el.set_muted(def.muted);
                el.pause();
                sync.element = Some(el);
            }
            Err(err) => sync.fail(&err.to_string(), ctx),
        }
        sync
    }

    /// Full node path of the leaf.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `true` once the element reported a failure.
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// `true` while a rendering-mode seek is in flight.
    pub fn is_seeking(&self) -> bool {
        self.seek.is_some()
    }

    /// Apply the clock and scope of the current frame.
    pub fn update(&mut self, leaf: &EvaluatedLeaf, ctx: &AdapterContext) {
        self.visible = leaf.is_visible();
        self.playing = leaf.env.clock.playing;
        self.target = Some(media_target(
            leaf.local_frame(),
            &self.def,
            ctx.fps,
            self.native_duration,
        ));
        if self.failed.is_some() {
            return;
        }

        let rate = self.def.playback_rate * leaf.env.scope.accumulated_playback_rate;
        if self.applied_rate != Some(rate)
            && let Some(el) = self.element.as_mut()
        {
            el.set_playback_rate(rate);
            self.applied_rate = Some(rate);
        }

        if ctx.mode == SyncMode::Rendering && self.visible {
            let new = ctx.audio.register_all(
                leaf_audio_assets(leaf, ctx.composition_duration).unwrap_or_else(|err| {
                    tracing::warn!(path = %self.path, %err, "audio registration skipped");
                    Vec::new()
                }),
            );
            if new > 0 {
                tracing::debug!(path = %self.path, new, "registered audio contributions");
            }
        }

        self.apply(ctx);
    }

    /// Drain native events and react to them.
    pub fn pump(&mut self, ctx: &AdapterContext) {
        loop {
            let Some(event) = self.element.as_mut().and_then(|el| el.poll_event()) else {
                break;
            };
            self.on_event(event, ctx);
        }
    }

    fn on_event(&mut self, event: MediaEvent, ctx: &AdapterContext) {
        match event {
            MediaEvent::LoadedMetadata { duration_sec } => {
                tracing::debug!(path = %self.path, ?duration_sec, "metadata loaded");
                self.metadata_loaded = true;
                self.native_duration = duration_sec.filter(|d| d.is_finite() && *d > 0.0);
                ctx.release(&mut self.load_hold);
                self.apply(ctx);
            }
            MediaEvent::Seeked => {
                if let Some(seek) = self.seek.as_mut() {
                    seek.seeked = true;
                }
                self.finish_seek_if_done(ctx);
            }
            MediaEvent::FramePresented => {
                if let Some(seek) = self.seek.as_mut() {
                    seek.presented = true;
                }
                self.finish_seek_if_done(ctx);
            }
            MediaEvent::PlayResolved => self.play_in_flight = false,
            MediaEvent::PlayRejected(reason) => {
                self.play_in_flight = false;
                tracing::warn!(path = %self.path, %reason, "play request rejected");
            }
            MediaEvent::Error(msg) => self.fail(&msg, ctx),
            MediaEvent::Loaded | MediaEvent::Decoded { .. } => {}
        }
    }

    fn finish_seek_if_done(&mut self, ctx: &AdapterContext) {
        let done = self
            .seek
            .as_ref()
            .is_some_and(|s| s.seeked && (s.presented || self.kind == MediaKind::Audio));
        if !done {
            return;
        }
        if let Some(mut seek) = self.seek.take() {
            tracing::debug!(path = %self.path, position = seek.position, "seek settled");
            ctx.release(&mut seek.hold);
            self.last_presented = Some(seek.position);
        }
    }

    fn apply(&mut self, ctx: &AdapterContext) {
        if self.failed.is_some() {
            return;
        }
        match ctx.mode {
            SyncMode::Rendering => self.apply_rendering(ctx),
            SyncMode::Interactive => self.apply_interactive(ctx),
        }
    }

    fn apply_rendering(&mut self, ctx: &AdapterContext) {
        let Some(el) = self.element.as_mut() else {
            return;
        };
        if !el.is_paused() {
            el.pause();
        }
        // Premounted elements preload without holding the renderer.
        if !self.visible {
            ctx.release(&mut self.load_hold);
            return;
        }
        if !self.metadata_loaded {
            if self.load_hold.is_none() {
                self.load_hold = Some(ctx.hold(&format!(
                    "load {} '{}' at {}",
                    self.kind.as_str(),
                    self.def.src,
                    self.path
                )));
            }
            return;
        }

        let Some(MediaTarget::Time(time)) = self.target else {
            self.cancel_seek(ctx);
            return;
        };
        let position = render_seek_position(time, ctx.fps);
        let eps = ctx.config.seek_epsilon_sec;

        if let Some(seek) = &self.seek {
            if (seek.position - position).abs() <= eps {
                return;
            }
            tracing::debug!(path = %self.path, from = seek.position, to = position, "seek superseded");
            self.cancel_seek(ctx);
        }
        let Some(el) = self.element.as_mut() else {
            return;
        };
        if (el.current_time() - position).abs() <= eps {
            self.last_presented = Some(position);
            return;
        }

        let hold = ctx.hold(&format!("seek {} to {position:.3}s", self.path));
        el.seek(position);
        tracing::debug!(path = %self.path, position, "seek issued");
        self.seek = Some(PendingSeek {
            position,
            hold: Some(hold),
            seeked: false,
            presented: false,
        });
    }

    fn apply_interactive(&mut self, ctx: &AdapterContext) {
        let Some(el) = self.element.as_mut() else {
            return;
        };
        let target = match self.target {
            Some(MediaTarget::Time(t)) if self.visible => t,
            _ => {
                if !el.is_paused() {
                    el.pause();
                }
                return;
            }
        };
        if !self.metadata_loaded {
            return;
        }

        let eps = ctx.config.seek_epsilon_sec;
        let off_by = (el.current_time() - target).abs();

        if !self.playing {
            if !el.is_paused() {
                el.pause();
            }
            self.play_in_flight = false;
            if off_by > eps {
                el.seek(target);
            }
            return;
        }

        if self.play_in_flight {
            return;
        }
        let now = ctx.time().now();
        if el.is_paused() {
            if off_by > eps {
                el.seek(target);
            }
            el.play();
            self.play_in_flight = true;
            self.last_corrective_seek = Some(now);
            return;
        }

        let tolerance = self
            .def
            .acceptable_drift_sec
            .unwrap_or(ctx.config.acceptable_drift_sec);
        let cooled_down = self
            .last_corrective_seek
            .is_none_or(|last| now.saturating_sub(last) >= ctx.config.seek_cooldown);
        if off_by > tolerance && cooled_down {
            tracing::debug!(path = %self.path, drift = off_by, "corrective seek");
            el.seek(target);
            self.last_corrective_seek = Some(now);
        }
    }

    fn cancel_seek(&mut self, ctx: &AdapterContext) {
        if let Some(mut seek) = self.seek.take() {
            ctx.release(&mut seek.hold);
        }
    }

    fn fail(&mut self, msg: &str, ctx: &AdapterContext) {
        ctx.release(&mut self.load_hold);
        self.cancel_seek(ctx);
        tracing::warn!(
            path = %self.path,
            src = %self.def.src,
            error = %msg,
            policy = ?self.def.on_error,
            "media failed; continuing without it"
        );
        self.failed = Some(msg.to_owned());
    }

    /// What the leaf shows right now.
    pub fn presentation(&self) -> Presentation {
        if self.failed.is_some() {
            return match (self.def.on_error, self.last_presented) {
                (FailurePolicy::KeepLastFrame, Some(time_sec)) => {
                    Presentation::MediaTime { time_sec }
                }
                _ => Presentation::Hidden,
            };
        }
        if !self.visible || matches!(self.target, Some(MediaTarget::Ended) | None) {
            return Presentation::Hidden;
        }
        if !self.metadata_loaded || self.seek.is_some() {
            return Presentation::Pending;
        }
        match &self.element {
            Some(el) => Presentation::MediaTime {
                time_sec: el.current_time(),
            },
            None => Presentation::Hidden,
        }
    }

    /// Release every hold and stop the element.
    pub fn unmount(&mut self, ctx: &AdapterContext) {
        ctx.release(&mut self.load_hold);
        self.cancel_seek(ctx);
        if let Some(el) = self.element.as_mut() {
            el.pause();
        }
        self.element = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/sync.rs"]
mod tests;
