use std::collections::BTreeSet;

use crate::timeline::evaluator::EvaluatedFrame;

/// Leaves that started or stopped being mounted between two frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MountDiff {
    /// Newly mounted paths, sorted.
    pub entered: Vec<String>,
    /// Unmounted paths, sorted.
    pub exited: Vec<String>,
}

impl MountDiff {
    /// `true` when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Tracks which leaf paths are mounted from frame to frame.
#[derive(Clone, Debug, Default)]
pub struct MountTracker {
    mounted: BTreeSet<String>,
}

impl MountTracker {
    /// Tracker with nothing mounted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the leaves of `frame` and report the difference to the previous update.
    pub fn update(&mut self, frame: &EvaluatedFrame) -> MountDiff {
        let next: BTreeSet<String> = frame.leaves.iter().map(|l| l.path.clone()).collect();
        let diff = MountDiff {
            entered: next.difference(&self.mounted).cloned().collect(),
            exited: self.mounted.difference(&next).cloned().collect(),
        };
        self.mounted = next;
        diff
    }

    /// Unmount everything, returning what was mounted.
    pub fn clear(&mut self) -> Vec<String> {
        std::mem::take(&mut self.mounted).into_iter().collect()
    }

    /// `true` when `path` is currently mounted.
    pub fn is_mounted(&self, path: &str) -> bool {
        self.mounted.contains(path)
    }

    /// Number of mounted leaves.
    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    /// `true` when nothing is mounted.
    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }
}
