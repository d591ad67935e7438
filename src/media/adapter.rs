use crate::media::element::{MediaKind, MediaRuntime, ResourceKind};
use crate::media::still::{AnimatedImageSync, StillSync};
use crate::media::sync::{AdapterContext, MediaSync, Presentation};
use crate::timeline::evaluator::EvaluatedLeaf;
use crate::timeline::tree::LeafNode;

/// Per-leaf adapter owned by a session for as long as the leaf is mounted.
#[derive(Debug)]
pub enum LeafAdapter {
    /// Video or audio element.
    Media(MediaSync),
    /// Animated image.
    AnimatedImage(AnimatedImageSync),
    /// Image or iframe.
    Still(StillSync),
    /// Host-rendered leaf; nothing to synchronize.
    Display {
        /// Whether the leaf is visible (not premounted).
        visible: bool,
    },
}

impl LeafAdapter {
    /// Create the adapter for a newly mounted leaf.
    pub fn mount(
        leaf: &EvaluatedLeaf,
        runtime: &mut dyn MediaRuntime,
        ctx: &AdapterContext,
    ) -> Self {
        tracing::debug!(path = %leaf.path, premounted = !leaf.is_visible(), "leaf mounted");
        let path = leaf.path.as_str();
        match leaf.leaf.as_ref() {
            LeafNode::Video(m) => {
                Self::Media(MediaSync::mount(path, MediaKind::Video, m, runtime, ctx))
            }
            LeafNode::Audio(m) => {
                Self::Media(MediaSync::mount(path, MediaKind::Audio, m, runtime, ctx))
            }
            LeafNode::AnimatedImage(a) => {
                Self::AnimatedImage(AnimatedImageSync::mount(path, a, runtime, ctx))
            }
            LeafNode::Image(s) => {
                Self::Still(StillSync::mount(path, ResourceKind::Image, s, runtime, ctx))
            }
            LeafNode::Iframe(s) => {
                Self::Still(StillSync::mount(path, ResourceKind::Iframe, s, runtime, ctx))
            }
            LeafNode::Display(_) => Self::Display { visible: false },
        }
    }

    /// Apply the current frame.
    pub fn update(&mut self, leaf: &EvaluatedLeaf, ctx: &AdapterContext) {
        match self {
            Self::Media(m) => m.update(leaf, ctx),
            Self::AnimatedImage(a) => a.update(leaf, ctx),
            Self::Still(s) => s.update(leaf, ctx),
            Self::Display { visible } => *visible = leaf.is_visible(),
        }
    }

    /// Drain native events.
    pub fn pump(&mut self, ctx: &AdapterContext) {
        match self {
            Self::Media(m) => m.pump(ctx),
            Self::AnimatedImage(a) => a.pump(ctx),
            Self::Still(s) => s.pump(ctx),
            Self::Display { .. } => {}
        }
    }

    /// What the leaf shows right now.
    pub fn presentation(&self) -> Presentation {
        match self {
            Self::Media(m) => m.presentation(),
            Self::AnimatedImage(a) => a.presentation(),
            Self::Still(s) => s.presentation(),
            Self::Display { visible: true } => Presentation::Still,
            Self::Display { visible: false } => Presentation::Hidden,
        }
    }

    /// Release every hold and native resource.
    pub fn unmount(&mut self, ctx: &AdapterContext) {
        match self {
            Self::Media(m) => m.unmount(ctx),
            Self::AnimatedImage(a) => a.unmount(ctx),
            Self::Still(s) => s.unmount(ctx),
            Self::Display { .. } => {}
        }
    }
}
