use crate::composition::model::{AnimatedImageDef, AnimatedImageLoop, FailurePolicy, StillDef};
use crate::hold::registry::HoldHandle;
use crate::media::element::{MediaEvent, MediaResource, MediaRuntime, ResourceKind};
use crate::media::sync::{AdapterContext, Presentation, SyncMode};
use crate::timeline::evaluator::EvaluatedLeaf;

/// Delay used for frames that declare none, as browsers do for GIFs.
const DEFAULT_FRAME_DELAY_MS: u32 = 100;

/// Load tracking shared by image, iframe and animated image adapters.
struct ResourceLoad {
    path: String,
    what: String,
    resource: Option<Box<dyn MediaResource>>,
    load_hold: Option<HoldHandle>,
    ready: bool,
    failed: Option<String>,
    visible: bool,
}

impl ResourceLoad {
    fn start(
        path: &str,
        what: String,
        created: crate::foundation::error::WavyteResult<Box<dyn MediaResource>>,
        policy: FailurePolicy,
        ctx: &AdapterContext,
    ) -> Self {
        let mut load = Self {
            path: path.to_owned(),
            what,
            resource: None,
            load_hold: None,
            ready: false,
            failed: None,
            visible: false,
        };
        match created {
            Ok(r) => load.resource = Some(r),
            Err(err) => load.fail(&err.to_string(), policy, ctx),
        }
        load
    }

    fn set_visible(&mut self, visible: bool, ctx: &AdapterContext) {
        self.visible = visible;
        if ctx.mode != SyncMode::Rendering || self.ready || self.failed.is_some() {
            return;
        }
        if !visible {
            ctx.release(&mut self.load_hold);
        } else if self.load_hold.is_none() {
            self.load_hold = Some(ctx.hold(&format!("load {} at {}", self.what, self.path)));
        }
    }

    fn next_event(&mut self) -> Option<MediaEvent> {
        self.resource.as_mut().and_then(|r| r.poll_event())
    }

    fn mark_ready(&mut self, ctx: &AdapterContext) {
        tracing::debug!(path = %self.path, what = %self.what, "resource ready");
        self.ready = true;
        ctx.release(&mut self.load_hold);
    }

    fn fail(&mut self, msg: &str, policy: FailurePolicy, ctx: &AdapterContext) {
        ctx.release(&mut self.load_hold);
        tracing::warn!(
            path = %self.path,
            what = %self.what,
            error = %msg,
            ?policy,
            "resource failed; continuing without it"
        );
        self.failed = Some(msg.to_owned());
    }

    fn unmount(&mut self, ctx: &AdapterContext) {
        ctx.release(&mut self.load_hold);
        self.resource = None;
    }
}

/// Image or iframe: holds the renderer until loaded.
pub struct StillSync {
    def: StillDef,
    load: ResourceLoad,
}

impl std::fmt::Debug for StillSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StillSync")
            .field("path", &self.load.path)
            .field("ready", &self.load.ready)
            .field("failed", &self.load.failed)
            .finish_non_exhaustive()
    }
}

impl StillSync {
    /// Start loading a newly mounted image or iframe.
    pub fn mount(
        path: &str,
        kind: ResourceKind,
        def: &StillDef,
        runtime: &mut dyn MediaRuntime,
        ctx: &AdapterContext,
    ) -> Self {
        let what = match kind {
            ResourceKind::Image => format!("image '{}'", def.src),
            ResourceKind::Iframe => format!("iframe '{}'", def.src),
        };
        let created = runtime.create_resource(kind, &def.src);
        Self {
            load: ResourceLoad::start(path, what, created, def.on_error, ctx),
            def: def.clone(),
        }
    }

    /// Apply the current frame.
    pub fn update(&mut self, leaf: &EvaluatedLeaf, ctx: &AdapterContext) {
        self.load.set_visible(leaf.is_visible(), ctx);
    }

    /// Drain load events.
    pub fn pump(&mut self, ctx: &AdapterContext) {
        while let Some(event) = self.load.next_event() {
            match event {
                MediaEvent::Loaded => self.load.mark_ready(ctx),
                MediaEvent::Error(msg) => self.load.fail(&msg, self.def.on_error, ctx),
                _ => {}
            }
        }
    }

    /// What the leaf shows right now.
    pub fn presentation(&self) -> Presentation {
        if self.load.failed.is_some() {
            // A still that loaded before failing keeps its content.
            return if self.def.on_error == FailurePolicy::KeepLastFrame && self.load.ready {
                Presentation::Still
            } else {
                Presentation::Hidden
            };
        }
        match (self.load.visible, self.load.ready) {
            (false, _) => Presentation::Hidden,
            (true, true) => Presentation::Still,
            (true, false) => Presentation::Pending,
        }
    }

    /// Release holds and drop the resource.
    pub fn unmount(&mut self, ctx: &AdapterContext) {
        self.load.unmount(ctx);
    }
}

/// Animated image: picks a decoded frame from the local frame.
pub struct AnimatedImageSync {
    def: AnimatedImageDef,
    load: ResourceLoad,
    frame_ends_ms: Vec<u64>,
    local_time_ms: f64,
    last_index: Option<usize>,
}

impl std::fmt::Debug for AnimatedImageSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimatedImageSync")
            .field("path", &self.load.path)
            .field("frames", &self.frame_ends_ms.len())
            .field("failed", &self.load.failed)
            .finish_non_exhaustive()
    }
}

impl AnimatedImageSync {
    /// Start decoding a newly mounted animated image.
    pub fn mount(
        path: &str,
        def: &AnimatedImageDef,
        runtime: &mut dyn MediaRuntime,
        ctx: &AdapterContext,
    ) -> Self {
        let created = runtime.create_animated_image(&def.src);
        Self {
            load: ResourceLoad::start(
                path,
                format!("animated image '{}'", def.src),
                created,
                def.on_error,
                ctx,
            ),
            def: def.clone(),
            frame_ends_ms: Vec::new(),
            local_time_ms: 0.0,
            last_index: None,
        }
    }

    /// Apply the current frame.
    pub fn update(&mut self, leaf: &EvaluatedLeaf, ctx: &AdapterContext) {
        self.local_time_ms =
            ctx.fps.frames_to_secs(leaf.local_frame() as f64) * 1000.0 * self.def.playback_rate;
        self.load.set_visible(leaf.is_visible(), ctx);
        if let Some(index) = self.frame_index() {
            self.last_index = Some(index);
        }
    }

    /// Drain decode events.
    pub fn pump(&mut self, ctx: &AdapterContext) {
        while let Some(event) = self.load.next_event() {
            match event {
                MediaEvent::Decoded { frame_durations_ms } if frame_durations_ms.is_empty() => {
                    self.load
                        .fail("animated image has no frames", self.def.on_error, ctx);
                }
                MediaEvent::Decoded { frame_durations_ms } => {
                    let mut end = 0_u64;
                    self.frame_ends_ms = frame_durations_ms
                        .iter()
                        .map(|d| {
                            let d = if *d == 0 { DEFAULT_FRAME_DELAY_MS } else { *d };
                            end += u64::from(d);
                            end
                        })
                        .collect();
                    self.load.mark_ready(ctx);
                    if let Some(index) = self.frame_index() {
                        self.last_index = Some(index);
                    }
                }
                MediaEvent::Error(msg) => self.load.fail(&msg, self.def.on_error, ctx),
                _ => {}
            }
        }
    }

    /// Decoded frame for the current local time, `None` when nothing should show.
    pub fn frame_index(&self) -> Option<usize> {
        select_frame(
            &self.frame_ends_ms,
            self.local_time_ms,
            self.def.loop_behavior,
        )
    }

    /// What the leaf shows right now.
    pub fn presentation(&self) -> Presentation {
        if self.load.failed.is_some() {
            return match (self.def.on_error, self.last_index) {
                (FailurePolicy::KeepLastFrame, Some(index)) => Presentation::AnimatedFrame { index },
                _ => Presentation::Hidden,
            };
        }
        if !self.load.visible {
            return Presentation::Hidden;
        }
        if !self.load.ready {
            return Presentation::Pending;
        }
        match self.frame_index() {
            Some(index) => Presentation::AnimatedFrame { index },
            None => Presentation::Hidden,
        }
    }

    /// Release holds and drop the resource.
    pub fn unmount(&mut self, ctx: &AdapterContext) {
        self.load.unmount(ctx);
    }
}

/// Frame whose display interval contains `time_ms`, given cumulative frame end times.
pub fn select_frame(frame_ends_ms: &[u64], time_ms: f64, behavior: AnimatedImageLoop) -> Option<usize> {
    let total = *frame_ends_ms.last()?;
    let t = time_ms.max(0.0);
    let t = if t >= total as f64 {
        match behavior {
            AnimatedImageLoop::Loop => t.rem_euclid(total as f64),
            AnimatedImageLoop::PauseAfterFinish => return Some(frame_ends_ms.len() - 1),
            AnimatedImageLoop::ClearAfterFinish => return None,
        }
    } else {
        t
    };
    Some(frame_ends_ms.partition_point(|end| (*end as f64) <= t))
}
