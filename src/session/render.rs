use std::sync::Arc;
use std::time::Duration;

use crate::audio::manifest::collect_audio_assets;
use crate::audio::registry::{AudioAsset, AudioAssetRegistry};
use crate::composition::model::Composition;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::foundation::time::{MonotonicTime, TimeSource};
use crate::hold::registry::HoldRegistry;
use crate::media::element::MediaRuntime;
use crate::media::sync::{AdapterContext, SyncConfig, SyncMode};
use crate::session::sink::{CapturedFrame, FrameSink, SinkConfig};
use crate::session::stage::Stage;
use crate::timeline::clock::FrameClock;
use crate::timeline::overrides::{NoOverrides, OverrideStore};

/// Options controlling [`RenderSession`] capture behavior.
#[derive(Clone, Debug)]
pub struct RenderSessionOpts {
    /// Timeout applied to every load and seek hold.
    pub hold_timeout: Duration,
    /// Upper bound on how long one frame may take to settle.
    pub frame_timeout: Duration,
    /// Longest single wait handed to the media runtime while holds are pending.
    pub poll_interval: Duration,
    /// Pre-scan the range for audio contributions before capturing.
    pub enable_audio: bool,
    /// Run the audio pre-scan on a dedicated rayon pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Seek tolerances.
    pub sync: SyncConfig,
}

impl Default for RenderSessionOpts {
    fn default() -> Self {
        Self {
            hold_timeout: Duration::from_secs(30),
            frame_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(5),
            enable_audio: true,
            parallel: false,
            threads: None,
            sync: SyncConfig::default(),
        }
    }
}

/// Range capture statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Total frames in the requested range.
    pub frames_total: u64,
    /// Frames captured and pushed to the sink.
    pub frames_captured: u64,
    /// Distinct audio contributions handed to the sink.
    pub audio_assets: usize,
}

/// Off-line frame-capture driver.
///
/// For every frame the session evaluates the timeline with a paused clock, mounts and updates
/// one adapter per leaf, then pumps the media runtime until no render hold is pending. Hold
/// timeouts and aborts are fatal; media failures are absorbed by the adapters.
pub struct RenderSession<R: MediaRuntime> {
    stage: Stage<R>,
    time: Arc<dyn TimeSource>,
    opts: RenderSessionOpts,
}

impl<R: MediaRuntime> RenderSession<R> {
    /// Construct a session driven by the wall clock.
    pub fn new(comp: &Composition, runtime: R, opts: RenderSessionOpts) -> WavyteResult<Self> {
        Self::with_time_source(comp, runtime, Arc::new(MonotonicTime::new()), opts)
    }

    /// Construct a session measuring hold deadlines against `time`.
    pub fn with_time_source(
        comp: &Composition,
        runtime: R,
        time: Arc<dyn TimeSource>,
        opts: RenderSessionOpts,
    ) -> WavyteResult<Self> {
        let timeline = comp.timeline()?;
        if !timeline.descriptor().duration_in_frames.is_finite() {
            return Err(WavyteError::validation(
                "off-line rendering requires a finite composition duration",
            ));
        }
        if opts.frame_timeout.is_zero() {
            return Err(WavyteError::validation("frame_timeout must be > 0"));
        }
        let descriptor = timeline.descriptor().clone();
        let holds = HoldRegistry::new(Arc::clone(&time))
            .with_default_timeout(Some(opts.hold_timeout));
        let ctx = AdapterContext {
            mode: SyncMode::Rendering,
            config: opts.sync,
            fps: descriptor.fps,
            composition_duration: descriptor.duration_in_frames,
            holds,
            audio: AudioAssetRegistry::new(),
        };
        Ok(Self {
            stage: Stage::new(timeline, Arc::new(NoOverrides), runtime, ctx),
            time,
            opts,
        })
    }

    /// Use `overrides` for every subsequent frame.
    pub fn with_overrides(mut self, overrides: Arc<dyn OverrideStore>) -> Self {
        self.stage.overrides = overrides;
        self
    }

    /// Hold registry shared with the adapters; hosts may add their own holds.
    pub fn holds(&self) -> &HoldRegistry {
        &self.stage.ctx.holds
    }

    /// Audio contributions registered so far.
    pub fn audio_assets(&self) -> Vec<AudioAsset> {
        self.stage.ctx.audio.assets()
    }

    /// Media runtime, for hosts that need to reach native state.
    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.stage.runtime
    }

    /// Number of leaves with a live adapter.
    pub fn mounted_count(&self) -> usize {
        self.stage.mounted_count()
    }

    /// Set the frame, wait until every hold is released, and capture.
    #[tracing::instrument(skip(self))]
    pub fn capture_frame(&mut self, frame: FrameIndex) -> WavyteResult<CapturedFrame> {
        let clock = FrameClock::paused(frame);
        self.stage.check_frame(clock.frame)?;
        let evaluated = self.stage.apply(clock)?;
        self.wait_until_settled(frame)?;
        Ok(self.stage.snapshot(&evaluated))
    }

    fn wait_until_settled(&mut self, frame: FrameIndex) -> WavyteResult<()> {
        let started = self.time.now();
        let mut iterations = 0_u64;
        loop {
            self.stage.pump_adapters();
            self.stage.ctx.holds.poll()?;
            if self.stage.ctx.holds.pending_count() == 0 {
                if iterations > 0 {
                    tracing::debug!(frame = frame.0, iterations, "frame settled");
                }
                return Ok(());
            }

            let now = self.time.now();
            let elapsed = now.saturating_sub(started);
            if elapsed >= self.opts.frame_timeout {
                let pending = self.stage.ctx.holds.pending_labels();
                tracing::error!(frame = frame.0, ?pending, "frame did not settle");
                return Err(WavyteError::FrameTimeout {
                    frame: frame.0,
                    pending,
                });
            }

            let mut wait = self
                .opts
                .poll_interval
                .min(self.opts.frame_timeout - elapsed);
            if let Some(deadline) = self.stage.ctx.holds.next_deadline() {
                wait = wait.min(deadline.saturating_sub(now));
            }
            self.stage.runtime.pump(wait);
            iterations += 1;
        }
    }

    /// Capture `range` and stream the frames into `sink` in order.
    #[tracing::instrument(skip(self, sink))]
    pub fn render_range(
        &mut self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
    ) -> WavyteResult<RenderStats> {
        if range.is_empty() {
            return Err(WavyteError::validation(
                "render_range range must be non-empty",
            ));
        }
        if let Some(d) = self.stage.timeline.descriptor().duration_in_frames.finite()
            && range.end.0 > d
        {
            return Err(WavyteError::validation(
                "render_range range must be within composition duration",
            ));
        }

        if self.opts.enable_audio {
            self.prescan_audio(range)?;
        }
        let descriptor = self.stage.timeline.descriptor();
        let cfg = SinkConfig {
            width: descriptor.canvas.width,
            height: descriptor.canvas.height,
            fps: descriptor.fps,
            audio: if self.opts.enable_audio {
                self.stage.ctx.audio.assets()
            } else {
                Vec::new()
            },
        };
        let mut stats = RenderStats {
            frames_total: range.len_frames(),
            audio_assets: cfg.audio.len(),
            ..RenderStats::default()
        };

        sink.begin(cfg)?;
        for f in range.start.0..range.end.0 {
            let captured = self.capture_frame(FrameIndex(f))?;
            sink.push_frame(&captured)?;
            stats.frames_captured += 1;
        }
        sink.end()?;
        Ok(stats)
    }

    fn prescan_audio(&self, range: FrameRange) -> WavyteResult<usize> {
        let timeline = &self.stage.timeline;
        let overrides = self.stage.overrides.as_ref();
        let registry = &self.stage.ctx.audio;
        if self.opts.parallel {
            let pool = build_thread_pool(self.opts.threads)?;
            pool.install(|| collect_audio_assets(timeline, range, overrides, registry, true))
        } else {
            collect_audio_assets(timeline, range, overrides, registry, false)
        }
    }

    /// Unmount every leaf and drop pending holds. The session stays usable.
    pub fn teardown(&mut self) {
        self.stage.teardown();
    }
}

impl<R: MediaRuntime> Drop for RenderSession<R> {
    fn drop(&mut self) {
        self.stage.teardown();
    }
}

fn build_thread_pool(threads: Option<usize>) -> WavyteResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(WavyteError::validation(
            "render_range 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| WavyteError::evaluation(format!("failed to build rayon thread pool: {e}")))
}
