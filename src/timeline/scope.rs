use kurbo::Affine;
use smallvec::SmallVec;

use crate::composition::model::CompositionDescriptor;
use crate::foundation::core::FrameSpan;
use crate::timeline::clock::FrameClock;

/// One enclosing loop level, outer to inner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopLayer {
    /// Period of one iteration, in the loop's clock frames.
    pub duration_in_frames: u64,
    /// Effective iteration count; infinite only when nothing bounds it.
    pub iterations: FrameSpan,
    /// Accumulated playback rate of the loop's clock. One period lasts
    /// `duration_in_frames / playback_rate` composition frames.
    pub playback_rate: f64,
}

/// Ancestor loop layers.
pub type LoopStack = SmallVec<[LoopLayer; 4]>;

/// Scope published by a time-scope node to its children.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeScope {
    /// Opaque identifier of the publishing node.
    pub id: Option<String>,
    /// Stable identity path used for override lookup and mount tracking.
    pub name_path: String,
    /// Absolute start frame of this scope.
    pub from: i64,
    /// Length of the scope in child-clock frames.
    pub duration_in_frames: FrameSpan,
    /// Accumulated offset of the parent scope.
    pub parent_offset: i64,
    /// Clock frame at which this scope's local frame zero occurs.
    pub accumulated_offset: i64,
    /// Own `from` relative to the parent.
    pub local_offset: i64,
    /// Product of every ancestor rate multiplier.
    pub accumulated_playback_rate: f64,
    /// Composition frame at which the clock reads `accumulated_offset`.
    pub composition_offset: f64,
    /// Length of the scope on the composition timeline.
    pub composition_duration: FrameSpan,
    /// Enclosing loop layers, outer to inner.
    pub loop_stack: LoopStack,
    /// Editor track of the nearest sequence.
    pub track_index: u32,
    /// Accumulated placement from sequence overrides.
    pub placement: Affine,
}

impl TimeScope {
    /// Scope covering a whole composition.
    pub fn root(descriptor: &CompositionDescriptor) -> Self {
        Self {
            id: None,
            name_path: descriptor.id.clone(),
            from: 0,
            duration_in_frames: descriptor.duration_in_frames,
            parent_offset: 0,
            accumulated_offset: 0,
            local_offset: 0,
            accumulated_playback_rate: 1.0,
            composition_offset: 0.0,
            composition_duration: descriptor.duration_in_frames,
            loop_stack: LoopStack::new(),
            track_index: 0,
            placement: Affine::IDENTITY,
        }
    }
}

/// Where a sequence stands relative to the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceState {
    /// Before the start (and before any premount window).
    NotYetVisible,
    /// Inside the premount window: mounted, hidden, frozen at local frame 0.
    Premounted,
    /// Inside `[absolute_from, absolute_from + duration)`.
    Visible,
    /// At or after the end.
    Past,
}

/// Classify `frame` against a sequence window starting at `absolute_from`.
pub fn sequence_state(
    absolute_from: i64,
    duration: FrameSpan,
    premount_for: u64,
    frame: i64,
) -> SequenceState {
    let local = frame.saturating_sub(absolute_from);
    if local < 0 {
        let premount = i64::try_from(premount_for).unwrap_or(i64::MAX);
        if local >= premount.saturating_neg() {
            return SequenceState::Premounted;
        }
        return SequenceState::NotYetVisible;
    }
    if duration.contains(local) {
        SequenceState::Visible
    } else {
        SequenceState::Past
    }
}

/// Sequence parameters after override resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSequence {
    /// Opaque identifier.
    pub id: Option<String>,
    /// Start relative to the parent.
    pub from: i64,
    /// Visible length.
    pub duration_in_frames: FrameSpan,
    /// Clock multiplier.
    pub playback_rate: f64,
    /// Editor track.
    pub track_index: u32,
    /// Premount window length.
    pub premount_for: u64,
    /// Placement relative to the parent.
    pub placement: Affine,
}

/// Read-only environment handed down the tree: the clock a subtree observes plus its scope.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeEnv {
    /// Clock observed by children.
    pub clock: FrameClock,
    /// Published scope.
    pub scope: TimeScope,
    /// Set inside a premount window; propagates to every descendant.
    pub premounted: bool,
    /// Iteration index of the innermost enclosing loop.
    pub loop_iteration: Option<u64>,
}

impl ScopeEnv {
    /// Environment at the composition root.
    pub fn root(descriptor: &CompositionDescriptor, clock: FrameClock) -> Self {
        Self {
            clock,
            scope: TimeScope::root(descriptor),
            premounted: false,
            loop_iteration: None,
        }
    }

    /// Frame relative to this scope's start.
    pub fn local_frame(&self) -> i64 {
        self.clock.frame.saturating_sub(self.scope.accumulated_offset)
    }

    /// Derive the environment of a sequence's children, or `None` when nothing is mounted.
    pub fn enter_sequence(&self, seq: &ResolvedSequence, segment: &str) -> Option<ScopeEnv> {
        let parent = &self.scope;
        let absolute_from = parent.accumulated_offset.saturating_add(seq.from);

        let (clock, premounted) = match sequence_state(
            absolute_from,
            seq.duration_in_frames,
            seq.premount_for,
            self.clock.frame,
        ) {
            SequenceState::Visible => {
                let local = self.clock.frame - absolute_from;
                (
                    self.clock
                        .with_frame(rescale_frame(absolute_from, local, seq.playback_rate)),
                    self.premounted,
                )
            }
            SequenceState::Premounted => (
                FrameClock {
                    frame: absolute_from,
                    playing: false,
                },
                true,
            ),
            SequenceState::NotYetVisible | SequenceState::Past => return None,
        };

        let remaining = match parent.duration_in_frames.end_after(parent.accumulated_offset) {
            Some(end) => FrameSpan::Finite(end.saturating_sub(absolute_from).max(0) as u64),
            None => FrameSpan::Infinite,
        };
        let visible = seq.duration_in_frames.min(remaining);
        let duration = match visible {
            FrameSpan::Finite(d) if seq.playback_rate != 1.0 => {
                FrameSpan::Finite(((d as f64) * seq.playback_rate).ceil() as u64)
            }
            other => other,
        };

        Some(ScopeEnv {
            clock,
            scope: TimeScope {
                id: seq.id.clone(),
                name_path: format!("{}/{segment}", parent.name_path),
                from: absolute_from,
                duration_in_frames: duration,
                parent_offset: parent.accumulated_offset,
                accumulated_offset: absolute_from,
                local_offset: seq.from,
                accumulated_playback_rate: parent.accumulated_playback_rate * seq.playback_rate,
                composition_offset: parent.composition_offset
                    + seq.from as f64 / parent.accumulated_playback_rate,
                composition_duration: composition_span(visible, parent.accumulated_playback_rate),
                loop_stack: parent.loop_stack.clone(),
                track_index: seq.track_index,
                placement: parent.placement * seq.placement,
            },
            premounted,
            loop_iteration: self.loop_iteration,
        })
    }

    /// Derive the environment of a loop's children, or `None` outside the loop's lifetime.
    pub fn enter_loop(
        &self,
        duration_in_frames: u64,
        times: FrameSpan,
        segment: &str,
    ) -> Option<ScopeEnv> {
        let parent = &self.scope;
        let period = i64::try_from(duration_in_frames).ok().filter(|d| *d > 0)?;
        let base = parent.accumulated_offset;
        let local = self.clock.frame.saturating_sub(base);
        if local < 0 {
            return None;
        }
        if let Some(t) = times.finite() {
            let total = u128::from(duration_in_frames) * u128::from(t);
            if (local as u128) >= total {
                return None;
            }
        }

        let iterations = match times {
            FrameSpan::Finite(t) => FrameSpan::Finite(t),
            FrameSpan::Infinite => match parent.duration_in_frames {
                FrameSpan::Finite(pd) => FrameSpan::Finite(pd.div_ceil(duration_in_frames).max(1)),
                FrameSpan::Infinite => FrameSpan::Infinite,
            },
        };
        let mut loop_stack = parent.loop_stack.clone();
        loop_stack.push(LoopLayer {
            duration_in_frames,
            iterations,
            playback_rate: parent.accumulated_playback_rate,
        });

        Some(ScopeEnv {
            clock: self.clock.with_frame(base + local.rem_euclid(period)),
            scope: TimeScope {
                id: None,
                name_path: format!("{}/{segment}", parent.name_path),
                from: base,
                duration_in_frames: FrameSpan::Finite(duration_in_frames),
                parent_offset: base,
                accumulated_offset: base,
                local_offset: 0,
                accumulated_playback_rate: parent.accumulated_playback_rate,
                composition_offset: parent.composition_offset,
                composition_duration: composition_span(
                    FrameSpan::Finite(duration_in_frames),
                    parent.accumulated_playback_rate,
                ),
                loop_stack,
                track_index: parent.track_index,
                placement: parent.placement,
            },
            premounted: self.premounted,
            loop_iteration: Some((local / period) as u64),
        })
    }

    /// Derive the environment of a freeze's children.
    ///
    /// Children observe local frame `frame`; `playing` passes through.
    pub fn enter_freeze(&self, frame: i64, active: bool, segment: &str) -> ScopeEnv {
        let mut env = self.clone();
        env.scope.name_path = format!("{}/{segment}", self.scope.name_path);
        if active {
            env.clock = self
                .clock
                .with_frame(self.scope.accumulated_offset.saturating_add(frame));
        }
        env
    }
}

/// Composition-frame length of `span` clock frames ticking at `rate`.
fn composition_span(span: FrameSpan, rate: f64) -> FrameSpan {
    match span {
        FrameSpan::Finite(d) if rate != 1.0 => {
            FrameSpan::Finite(((d as f64) / rate).ceil() as u64)
        }
        other => other,
    }
}

/// Clock frame published by a sequence with `rate`: `absolute_from + floor(local * rate)`.
pub fn rescale_frame(absolute_from: i64, local: i64, rate: f64) -> i64 {
    if rate == 1.0 {
        return absolute_from.saturating_add(local);
    }
    absolute_from.saturating_add(((local as f64) * rate).floor() as i64)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/scope.rs"]
mod tests;
