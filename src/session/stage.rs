use std::collections::BTreeMap;
use std::sync::Arc;

use crate::foundation::core::{FrameIndex, FrameSpan};
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::media::adapter::LeafAdapter;
use crate::media::element::MediaRuntime;
use crate::media::sync::{AdapterContext, Presentation};
use crate::session::sink::{CapturedFrame, CapturedLayer};
use crate::timeline::clock::FrameClock;
use crate::timeline::evaluator::{EvaluatedFrame, Evaluator};
use crate::timeline::mount::MountTracker;
use crate::timeline::overrides::OverrideStore;
use crate::timeline::tree::Timeline;

/// Mounted state shared by the render and playback sessions: the timeline, the media runtime and
/// one adapter per mounted leaf.
pub(crate) struct Stage<R: MediaRuntime> {
    pub(crate) timeline: Timeline,
    pub(crate) overrides: Arc<dyn OverrideStore>,
    pub(crate) runtime: R,
    pub(crate) ctx: AdapterContext,
    mounts: MountTracker,
    adapters: BTreeMap<String, LeafAdapter>,
}

impl<R: MediaRuntime> Stage<R> {
    pub(crate) fn new(
        timeline: Timeline,
        overrides: Arc<dyn OverrideStore>,
        runtime: R,
        ctx: AdapterContext,
    ) -> Self {
        Self {
            timeline,
            overrides,
            runtime,
            ctx,
            mounts: MountTracker::new(),
            adapters: BTreeMap::new(),
        }
    }

    pub(crate) fn check_frame(&self, frame: i64) -> WavyteResult<()> {
        if frame < 0 {
            return Err(WavyteError::validation(format!("frame {frame} is negative")));
        }
        if let FrameSpan::Finite(d) = self.timeline.descriptor().duration_in_frames
            && frame as u64 >= d
        {
            return Err(WavyteError::validation(format!(
                "frame {frame} must be within composition duration ({d})"
            )));
        }
        Ok(())
    }

    /// Evaluate `clock`, mount and unmount adapters, and hand each adapter its leaf.
    pub(crate) fn apply(&mut self, clock: FrameClock) -> WavyteResult<EvaluatedFrame> {
        let evaluated = Evaluator::eval_frame(&self.timeline, clock, self.overrides.as_ref())?;
        let diff = self.mounts.update(&evaluated);
        for path in &diff.exited {
            if let Some(mut adapter) = self.adapters.remove(path) {
                adapter.unmount(&self.ctx);
                tracing::debug!(path = %path, "leaf unmounted");
            }
        }
        for leaf in &evaluated.leaves {
            let adapter = self
                .adapters
                .entry(leaf.path.clone())
                .or_insert_with(|| LeafAdapter::mount(leaf, &mut self.runtime, &self.ctx));
            adapter.update(leaf, &self.ctx);
        }
        Ok(evaluated)
    }

    pub(crate) fn pump_adapters(&mut self) {
        for adapter in self.adapters.values_mut() {
            adapter.pump(&self.ctx);
        }
    }

    pub(crate) fn snapshot(&self, evaluated: &EvaluatedFrame) -> CapturedFrame {
        let layers = evaluated
            .visible()
            .map(|leaf| CapturedLayer {
                path: leaf.path.clone(),
                kind: leaf.leaf.kind_name(),
                id: leaf.leaf.id().to_owned(),
                local_frame: leaf.local_frame(),
                track_index: leaf.env.scope.track_index,
                placement: leaf.env.scope.placement,
                presentation: self
                    .adapters
                    .get(&leaf.path)
                    .map_or(Presentation::Hidden, LeafAdapter::presentation),
            })
            .collect();
        CapturedFrame {
            frame: FrameIndex(u64::try_from(evaluated.clock.frame).unwrap_or(0)),
            layers,
        }
    }

    pub(crate) fn mounted_count(&self) -> usize {
        self.adapters.len()
    }

    /// Unmount every adapter and drop every hold.
    pub(crate) fn teardown(&mut self) {
        for (_, mut adapter) in std::mem::take(&mut self.adapters) {
            adapter.unmount(&self.ctx);
        }
        self.mounts.clear();
        self.ctx.holds.reset();
    }
}
