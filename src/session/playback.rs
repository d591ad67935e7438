use std::sync::Arc;
use std::time::Duration;

use crate::audio::registry::AudioAssetRegistry;
use crate::composition::model::Composition;
use crate::foundation::error::WavyteResult;
use crate::foundation::time::{MonotonicTime, TimeSource};
use crate::hold::registry::HoldRegistry;
use crate::media::element::MediaRuntime;
use crate::media::sync::{AdapterContext, SyncConfig, SyncMode};
use crate::session::sink::CapturedFrame;
use crate::session::stage::Stage;
use crate::timeline::clock::FrameClock;
use crate::timeline::overrides::{NoOverrides, OverrideStore};

/// Options controlling [`PlaybackSession`].
#[derive(Clone, Copy, Debug)]
pub struct PlaybackSessionOpts {
    /// Drift tolerances.
    pub sync: SyncConfig,
    /// Time handed to the media runtime on every tick.
    pub pump_wait: Duration,
}

impl Default for PlaybackSessionOpts {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            pump_wait: Duration::ZERO,
        }
    }
}

/// Interactive player: media runs natively and is corrected only when it drifts.
///
/// Never takes render holds, so it never blocks the host.
pub struct PlaybackSession<R: MediaRuntime> {
    stage: Stage<R>,
    opts: PlaybackSessionOpts,
}

impl<R: MediaRuntime> PlaybackSession<R> {
    /// Construct a player driven by the wall clock.
    pub fn new(comp: &Composition, runtime: R, opts: PlaybackSessionOpts) -> WavyteResult<Self> {
        Self::with_time_source(comp, runtime, Arc::new(MonotonicTime::new()), opts)
    }

    /// Construct a player measuring seek cooldowns against `time`.
    pub fn with_time_source(
        comp: &Composition,
        runtime: R,
        time: Arc<dyn TimeSource>,
        opts: PlaybackSessionOpts,
    ) -> WavyteResult<Self> {
        let timeline = comp.timeline()?;
        let descriptor = timeline.descriptor().clone();
        let ctx = AdapterContext {
            mode: SyncMode::Interactive,
            config: opts.sync,
            fps: descriptor.fps,
            composition_duration: descriptor.duration_in_frames,
            holds: HoldRegistry::new(time),
            audio: AudioAssetRegistry::new(),
        };
        Ok(Self {
            stage: Stage::new(timeline, Arc::new(NoOverrides), runtime, ctx),
            opts,
        })
    }

    /// Use `overrides` from the next tick on.
    pub fn set_overrides(&mut self, overrides: Arc<dyn OverrideStore>) {
        self.stage.overrides = overrides;
    }

    /// Media runtime, for hosts that need to reach native state.
    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.stage.runtime
    }

    /// Number of leaves with a live adapter.
    pub fn mounted_count(&self) -> usize {
        self.stage.mounted_count()
    }

    /// Advance to `clock`: remount, resynchronize and report what each visible leaf shows.
    pub fn tick(&mut self, clock: FrameClock) -> WavyteResult<CapturedFrame> {
        self.stage.check_frame(clock.frame)?;
        let evaluated = self.stage.apply(clock)?;
        self.stage.runtime.pump(self.opts.pump_wait);
        self.stage.pump_adapters();
        Ok(self.stage.snapshot(&evaluated))
    }

    /// Unmount every leaf.
    pub fn stop(&mut self) {
        self.stage.teardown();
    }
}

impl<R: MediaRuntime> Drop for PlaybackSession<R> {
    fn drop(&mut self) {
        self.stage.teardown();
    }
}
