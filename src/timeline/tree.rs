use std::collections::BTreeSet;
use std::sync::Arc;

use crate::composition::model::{
    AnimatedImageDef, Composition, CompositionDescriptor, DisplayDef, FreezeDef, LoopDef,
    MediaDef, NodeDef, SequenceDef, StillDef,
};
use crate::composition::series::layout_series;
use crate::foundation::core::FrameSpan;
use crate::foundation::error::{WavyteError, WavyteResult};

/// Normalized, evaluable timeline.
///
/// Series are lowered into sequences and every parameter is validated. Each node carries its
/// declared path segment, which keys overrides, and a sibling-unique key used for mounting.
#[derive(Clone, Debug)]
pub struct Timeline {
    pub(crate) descriptor: Arc<CompositionDescriptor>,
    pub(crate) children: Vec<TimelineNode>,
}

/// Lowered node.
#[derive(Clone, Debug)]
pub enum TimelineNode {
    /// Time-shifting window.
    Sequence(SequenceNode),
    /// Repeating window.
    Loop(LoopNode),
    /// Frozen clock.
    Freeze(FreezeNode),
    /// Renderable leaf.
    Leaf(LeafSlot),
}

/// Sequence parameters as declared (before overrides).
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceParams {
    /// Opaque identifier.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
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
}

/// Lowered sequence.
#[derive(Clone, Debug)]
pub struct SequenceNode {
    /// Path segment, `name@from`.
    pub segment: String,
    /// Mount key, unique among siblings.
    pub key: String,
    /// Declared parameters.
    pub params: SequenceParams,
    /// Children.
    pub children: Vec<TimelineNode>,
}

/// Lowered loop.
#[derive(Clone, Debug)]
pub struct LoopNode {
    /// Path segment.
    pub segment: String,
    /// Mount key.
    pub key: String,
    /// Period.
    pub duration_in_frames: u64,
    /// Iterations.
    pub times: FrameSpan,
    /// Children.
    pub children: Vec<TimelineNode>,
}

/// Lowered freeze.
#[derive(Clone, Debug)]
pub struct FreezeNode {
    /// Path segment.
    pub segment: String,
    /// Mount key.
    pub key: String,
    /// Frozen local frame.
    pub frame: i64,
    /// Whether the freeze applies.
    pub active: bool,
    /// Children.
    pub children: Vec<TimelineNode>,
}

/// Leaf with its path segment.
#[derive(Clone, Debug)]
pub struct LeafSlot {
    /// Path segment, `kind:id`.
    pub segment: String,
    /// Mount key; `segment` with a `#n` suffix when a sibling already claimed it.
    pub key: String,
    /// Shared leaf definition.
    pub leaf: Arc<LeafNode>,
}

/// Renderable leaf kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafNode {
    /// Host-rendered visual.
    Display(DisplayDef),
    /// Video element.
    Video(MediaDef),
    /// Audio element.
    Audio(MediaDef),
    /// Animated image.
    AnimatedImage(AnimatedImageDef),
    /// Still image.
    Image(StillDef),
    /// Embedded document.
    Iframe(StillDef),
}

impl LeafNode {
    /// Leaf identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Display(d) => &d.id,
            Self::Video(m) | Self::Audio(m) => &m.id,
            Self::AnimatedImage(a) => &a.id,
            Self::Image(s) | Self::Iframe(s) => &s.id,
        }
    }

    /// Kind tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Display(_) => "display",
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
            Self::AnimatedImage(_) => "animated_image",
            Self::Image(_) => "image",
            Self::Iframe(_) => "iframe",
        }
    }

    /// Media parameters for audio-bearing leaves.
    pub fn media(&self) -> Option<&MediaDef> {
        match self {
            Self::Video(m) | Self::Audio(m) => Some(m),
            _ => None,
        }
    }
}

impl Timeline {
    /// Normalize a composition.
    pub fn from_composition(comp: &Composition) -> WavyteResult<Self> {
        comp.descriptor.validate()?;
        let children = lower_children(&comp.children, &comp.descriptor.id)?;
        Ok(Self {
            descriptor: Arc::new(comp.descriptor.clone()),
            children,
        })
    }

    /// Composition metadata.
    pub fn descriptor(&self) -> &CompositionDescriptor {
        &self.descriptor
    }

    /// Top-level nodes.
    pub fn children(&self) -> &[TimelineNode] {
        &self.children
    }
}

fn lower_children(defs: &[NodeDef], parent_path: &str) -> WavyteResult<Vec<TimelineNode>> {
    let mut out = Vec::with_capacity(defs.len());
    for def in defs {
        match def {
            NodeDef::Series(series) => {
                for seq in layout_series(series)? {
                    out.push(lower_sequence(&seq, parent_path)?);
                }
            }
            NodeDef::SeriesSequence(_) => {
                return Err(WavyteError::validation(format!(
                    "'series_sequence' under '{parent_path}' must be a direct child of a 'series'"
                )));
            }
            other => out.push(lower_node(other, parent_path)?),
        }
    }

    // Identical siblings (layered unnamed sequences, repeated series) share their override path
    // but mount separately.
    let mut used = BTreeSet::new();
    for node in &mut out {
        let mut key = node.segment().to_owned();
        let mut n = 1;
        while used.contains(&key) {
            key = format!("{}#{n}", node.segment());
            n += 1;
        }
        used.insert(key.clone());
        node.set_key(key);
    }
    Ok(out)
}

fn lower_node(def: &NodeDef, parent_path: &str) -> WavyteResult<TimelineNode> {
    match def {
        NodeDef::Sequence(seq) => lower_sequence(seq, parent_path),
        NodeDef::Loop(lp) => lower_loop(lp, parent_path),
        NodeDef::Freeze(fr) => lower_freeze(fr, parent_path),
        NodeDef::Display(d) => leaf(LeafNode::Display(d.clone())),
        NodeDef::Video(m) => {
            m.validate()?;
            leaf(LeafNode::Video(m.clone()))
        }
        NodeDef::Audio(m) => {
            m.validate()?;
            leaf(LeafNode::Audio(m.clone()))
        }
        NodeDef::AnimatedImage(a) => {
            a.validate()?;
            leaf(LeafNode::AnimatedImage(a.clone()))
        }
        NodeDef::Image(s) => {
            s.validate()?;
            leaf(LeafNode::Image(s.clone()))
        }
        NodeDef::Iframe(s) => {
            s.validate()?;
            leaf(LeafNode::Iframe(s.clone()))
        }
        NodeDef::Series(_) | NodeDef::SeriesSequence(_) => Err(WavyteError::validation(
            "series nodes must be lowered by their parent",
        )),
    }
}

fn lower_sequence(seq: &SequenceDef, parent_path: &str) -> WavyteResult<TimelineNode> {
    seq.validate()?;
    let segment = format!("{}@{}", seq.name.as_deref().unwrap_or("sequence"), seq.from);
    let path = format!("{parent_path}/{segment}");
    Ok(TimelineNode::Sequence(SequenceNode {
        children: lower_children(&seq.children, &path)?,
        key: segment.clone(),
        segment,
        params: SequenceParams {
            id: seq.id.clone(),
            name: seq.name.clone(),
            from: seq.from,
            duration_in_frames: seq.duration_in_frames,
            playback_rate: seq.playback_rate,
            track_index: seq.track_index,
            premount_for: seq.premount_for,
        },
    }))
}

fn lower_loop(lp: &LoopDef, parent_path: &str) -> WavyteResult<TimelineNode> {
    lp.validate()?;
    let segment = format!(
        "{}:{}x{}",
        lp.name.as_deref().unwrap_or("loop"),
        lp.duration_in_frames,
        lp.times
    );
    let path = format!("{parent_path}/{segment}");
    Ok(TimelineNode::Loop(LoopNode {
        children: lower_children(&lp.children, &path)?,
        key: segment.clone(),
        segment,
        duration_in_frames: lp.duration_in_frames,
        times: lp.times,
    }))
}

fn lower_freeze(fr: &FreezeDef, parent_path: &str) -> WavyteResult<TimelineNode> {
    let segment = format!("freeze@{}", fr.frame);
    let path = format!("{parent_path}/{segment}");
    Ok(TimelineNode::Freeze(FreezeNode {
        children: lower_children(&fr.children, &path)?,
        key: segment.clone(),
        segment,
        frame: fr.frame,
        active: fr.active,
    }))
}

fn leaf(leaf: LeafNode) -> WavyteResult<TimelineNode> {
    let id = leaf.id();
    if id.trim().is_empty() {
        return Err(WavyteError::validation(format!(
            "{} leaf id must be non-empty",
            leaf.kind_name()
        )));
    }
    if id.contains('/') {
        return Err(WavyteError::validation(format!(
            "leaf id '{id}' must not contain '/'"
        )));
    }
    let segment = format!("{}:{}", leaf.kind_name(), id);
    Ok(TimelineNode::Leaf(LeafSlot {
        key: segment.clone(),
        segment,
        leaf: Arc::new(leaf),
    }))
}

impl TimelineNode {
    /// Path segment identifying this node among its siblings.
    pub fn segment(&self) -> &str {
        match self {
            Self::Sequence(s) => &s.segment,
            Self::Loop(l) => &l.segment,
            Self::Freeze(f) => &f.segment,
            Self::Leaf(l) => &l.segment,
        }
    }

    /// Key identifying this node among its siblings when mounted.
    pub fn key(&self) -> &str {
        match self {
            Self::Sequence(s) => &s.key,
            Self::Loop(l) => &l.key,
            Self::Freeze(f) => &f.key,
            Self::Leaf(l) => &l.key,
        }
    }

    fn set_key(&mut self, key: String) {
        match self {
            Self::Sequence(s) => s.key = key,
            Self::Loop(l) => l.key = key,
            Self::Freeze(f) => f.key = key,
            Self::Leaf(l) => l.key = key,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/tree.rs"]
mod tests;
