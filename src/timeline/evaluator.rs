use std::sync::Arc;

use rayon::prelude::*;

use crate::foundation::core::{FrameIndex, FrameRange, FrameSpan};
use crate::foundation::error::{WavyteError, WavyteResult};
use crate::timeline::clock::FrameClock;
use crate::timeline::overrides::{OverrideStore, resolve_sequence};
use crate::timeline::scope::ScopeEnv;
use crate::timeline::tree::{LeafNode, LeafSlot, Timeline, TimelineNode};

/// Callbacks for a depth-first walk over the mounted part of a timeline.
pub trait TimelineVisitor {
    /// Called for every mounted leaf with its full path and environment.
    fn visit_leaf(&mut self, path: &str, slot: &LeafSlot, env: &ScopeEnv) -> WavyteResult<()>;

    /// Called when a time-scope node mounts its children.
    fn enter_scope(&mut self, _env: &ScopeEnv) -> WavyteResult<()> {
        Ok(())
    }
}

/// Walk every node mounted at `clock`, deriving each scope from its parent.
///
/// Leaf paths are built from sibling-unique mount keys; overrides are looked up by the scope's
/// declared `name_path`.
pub fn walk_timeline(
    timeline: &Timeline,
    clock: FrameClock,
    overrides: &dyn OverrideStore,
    visitor: &mut dyn TimelineVisitor,
) -> WavyteResult<()> {
    let root = ScopeEnv::root(timeline.descriptor(), clock);
    let mount_path = root.scope.name_path.clone();
    walk_nodes(timeline.children(), &root, &mount_path, overrides, visitor)
}

fn walk_nodes(
    nodes: &[TimelineNode],
    env: &ScopeEnv,
    mount_path: &str,
    overrides: &dyn OverrideStore,
    visitor: &mut dyn TimelineVisitor,
) -> WavyteResult<()> {
    for node in nodes {
        let child_mount = || format!("{mount_path}/{}", node.key());
        match node {
            TimelineNode::Sequence(seq) => {
                let path = format!("{}/{}", env.scope.name_path, seq.segment);
                let resolved = resolve_sequence(&seq.params, &path, overrides)?;
                if let Some(child) = env.enter_sequence(&resolved, &seq.segment) {
                    visitor.enter_scope(&child)?;
                    walk_nodes(&seq.children, &child, &child_mount(), overrides, visitor)?;
                }
            }
            TimelineNode::Loop(lp) => {
                if let Some(child) = env.enter_loop(lp.duration_in_frames, lp.times, &lp.segment) {
                    visitor.enter_scope(&child)?;
                    walk_nodes(&lp.children, &child, &child_mount(), overrides, visitor)?;
                }
            }
            TimelineNode::Freeze(fr) => {
                let child = env.enter_freeze(fr.frame, fr.active, &fr.segment);
                visitor.enter_scope(&child)?;
                walk_nodes(&fr.children, &child, &child_mount(), overrides, visitor)?;
            }
            TimelineNode::Leaf(slot) => {
                visitor.visit_leaf(&child_mount(), slot, env)?;
            }
        }
    }
    Ok(())
}

/// Leaf mounted at one frame, with the clock and scope it observes.
#[derive(Clone, Debug)]
pub struct EvaluatedLeaf {
    /// Full mount path, stable across frames and unique within a frame.
    pub path: String,
    /// Shared leaf definition.
    pub leaf: Arc<LeafNode>,
    /// Clock and scope published by the nearest enclosing time-scope node.
    pub env: ScopeEnv,
}

impl EvaluatedLeaf {
    /// Frame relative to the enclosing scope.
    pub fn local_frame(&self) -> i64 {
        self.env.local_frame()
    }

    /// `false` while the leaf is only premounted.
    pub fn is_visible(&self) -> bool {
        !self.env.premounted
    }
}

/// Every leaf mounted at one host frame, in document order.
#[derive(Clone, Debug)]
pub struct EvaluatedFrame {
    /// Host clock.
    pub clock: FrameClock,
    /// Mounted leaves (visible and premounted).
    pub leaves: Vec<EvaluatedLeaf>,
}

impl EvaluatedFrame {
    /// Leaf at a full path.
    pub fn leaf(&self, path: &str) -> Option<&EvaluatedLeaf> {
        self.leaves.iter().find(|l| l.path == path)
    }

    /// Mounted leaves with the given id, in document order.
    pub fn leaves_with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EvaluatedLeaf> {
        self.leaves.iter().filter(move |l| l.leaf.id() == id)
    }

    /// Leaves that are visible (not premounted).
    pub fn visible(&self) -> impl Iterator<Item = &EvaluatedLeaf> {
        self.leaves.iter().filter(|l| l.is_visible())
    }
}

struct Collect {
    leaves: Vec<EvaluatedLeaf>,
}

impl TimelineVisitor for Collect {
    fn visit_leaf(&mut self, path: &str, slot: &LeafSlot, env: &ScopeEnv) -> WavyteResult<()> {
        self.leaves.push(EvaluatedLeaf {
            path: path.to_owned(),
            leaf: Arc::clone(&slot.leaf),
            env: env.clone(),
        });
        Ok(())
    }
}

/// Stateless evaluator from timeline to mounted leaves.
pub struct Evaluator;

impl Evaluator {
    /// Evaluate one host frame.
    #[tracing::instrument(skip(timeline, overrides))]
    pub fn eval_frame(
        timeline: &Timeline,
        clock: FrameClock,
        overrides: &dyn OverrideStore,
    ) -> WavyteResult<EvaluatedFrame> {
        check_bounds(timeline, clock.frame)?;
        let mut collect = Collect { leaves: Vec::new() };
        walk_timeline(timeline, clock, overrides, &mut collect)?;
        Ok(EvaluatedFrame {
            clock,
            leaves: collect.leaves,
        })
    }

    /// Evaluate a paused range of frames, optionally across the rayon pool.
    #[tracing::instrument(skip(timeline, overrides))]
    pub fn eval_range(
        timeline: &Timeline,
        range: FrameRange,
        overrides: &dyn OverrideStore,
        parallel: bool,
    ) -> WavyteResult<Vec<EvaluatedFrame>> {
        let eval = |f: u64| Self::eval_frame(timeline, FrameClock::paused(FrameIndex(f)), overrides);
        if parallel {
            (range.start.0..range.end.0)
                .into_par_iter()
                .map(eval)
                .collect()
        } else {
            (range.start.0..range.end.0).map(eval).collect()
        }
    }
}

fn check_bounds(timeline: &Timeline, frame: i64) -> WavyteResult<()> {
    if frame < 0 {
        return Err(WavyteError::evaluation(format!(
            "frame {frame} is negative"
        )));
    }
    if let FrameSpan::Finite(d) = timeline.descriptor().duration_in_frames
        && (frame as u64) >= d
    {
        return Err(WavyteError::evaluation(format!(
            "frame {frame} is out of bounds (duration {d})"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/evaluator.rs"]
mod tests;
