use crate::composition::model::{
    Composition, CompositionDescriptor, DisplayDef, FreezeDef, LoopDef, MediaDef, NodeDef,
    SequenceDef, SeriesDef, SeriesSequenceDef,
};
use crate::foundation::core::{Canvas, Fps, FrameSpan};
use crate::foundation::error::{WavyteError, WavyteResult};

/// Builder for [`Composition`](crate::Composition).
pub struct CompositionBuilder {
    descriptor: CompositionDescriptor,
    children: Vec<NodeDef>,
}

impl CompositionBuilder {
    /// Create a builder for a new composition.
    pub fn new(id: impl Into<String>, fps: Fps, canvas: Canvas, duration: FrameSpan) -> Self {
        Self {
            descriptor: CompositionDescriptor {
                id: id.into(),
                canvas,
                fps,
                duration_in_frames: duration,
                default_props: serde_json::Map::new(),
            },
            children: Vec::new(),
        }
    }

    /// Set one default input parameter.
    pub fn default_prop(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.descriptor.default_props.insert(key.into(), value);
        self
    }

    /// Append a top-level node.
    pub fn child(mut self, node: NodeDef) -> Self {
        self.children.push(node);
        self
    }

    /// Build and validate the final [`Composition`](crate::Composition).
    pub fn build(self) -> WavyteResult<Composition> {
        let comp = Composition {
            descriptor: self.descriptor,
            children: self.children,
        };
        comp.validate()?;
        Ok(comp)
    }
}

/// Builder for `sequence` nodes.
#[derive(Default)]
pub struct SequenceBuilder {
    def: SequenceDef,
}

impl SequenceBuilder {
    /// Sequence starting at frame 0 of its parent, unbounded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start frame relative to the parent scope.
    pub fn from(mut self, from: i64) -> Self {
        self.def.from = from;
        self
    }

    /// Bound the sequence to `frames`.
    pub fn duration(mut self, frames: u64) -> Self {
        self.def.duration_in_frames = FrameSpan::Finite(frames);
        self
    }

    /// Clock multiplier for children.
    pub fn playback_rate(mut self, rate: f64) -> Self {
        self.def.playback_rate = rate;
        self
    }

    /// Editor track index.
    pub fn track_index(mut self, index: u32) -> Self {
        self.def.track_index = index;
        self
    }

    /// Mount children hidden this many frames before the start.
    pub fn premount_for(mut self, frames: u64) -> Self {
        self.def.premount_for = frames;
        self
    }

    /// Display name, used in the override path.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.def.name = Some(name.into());
        self
    }

    /// Opaque identifier published on the scope.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.def.id = Some(id.into());
        self
    }

    /// Append a child node.
    pub fn child(mut self, node: NodeDef) -> Self {
        self.def.children.push(node);
        self
    }

    /// Build a validated `sequence` node.
    pub fn build(self) -> WavyteResult<NodeDef> {
        self.def.validate()?;
        Ok(NodeDef::Sequence(self.def))
    }
}

/// Builder for `loop` nodes.
pub struct LoopBuilder {
    def: LoopDef,
}

impl LoopBuilder {
    /// Loop with the given period, repeating forever.
    pub fn new(duration_in_frames: u64) -> Self {
        Self {
            def: LoopDef {
                name: None,
                duration_in_frames,
                times: FrameSpan::Infinite,
                children: Vec::new(),
            },
        }
    }

    /// Limit the number of iterations.
    pub fn times(mut self, times: u64) -> Self {
        self.def.times = FrameSpan::Finite(times);
        self
    }

    /// Display name, used in the node path.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.def.name = Some(name.into());
        self
    }

    /// Append a child node.
    pub fn child(mut self, node: NodeDef) -> Self {
        self.def.children.push(node);
        self
    }

    /// Build a validated `loop` node.
    pub fn build(self) -> WavyteResult<NodeDef> {
        self.def.validate()?;
        Ok(NodeDef::Loop(self.def))
    }
}

/// Builder for `series` nodes.
#[derive(Default)]
pub struct SeriesBuilder {
    children: Vec<NodeDef>,
}

impl SeriesBuilder {
    /// Empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry of `duration` frames shifted by `offset` from the previous entry's end.
    pub fn entry(mut self, duration: FrameSpan, offset: i64, children: Vec<NodeDef>) -> Self {
        self.children.push(NodeDef::SeriesSequence(SeriesSequenceDef {
            id: None,
            name: None,
            duration_in_frames: duration,
            offset,
            premount_for: 0,
            children,
        }));
        self
    }

    /// Append a fully specified entry.
    pub fn entry_def(mut self, entry: SeriesSequenceDef) -> Self {
        self.children.push(NodeDef::SeriesSequence(entry));
        self
    }

    /// Build a validated `series` node; the layout is checked eagerly.
    pub fn build(self) -> WavyteResult<NodeDef> {
        let def = SeriesDef {
            children: self.children,
        };
        if def.children.is_empty() {
            return Err(WavyteError::validation("series must have at least one entry"));
        }
        crate::composition::series::layout_series(&def)?;
        Ok(NodeDef::Series(def))
    }
}

/// `freeze` node pinning `children` to local frame `frame`.
pub fn freeze(frame: i64, children: Vec<NodeDef>) -> NodeDef {
    NodeDef::Freeze(FreezeDef {
        frame,
        active: true,
        children,
    })
}

/// `display` leaf with no props.
pub fn display(id: impl Into<String>) -> NodeDef {
    NodeDef::Display(DisplayDef {
        id: id.into(),
        props: serde_json::Value::Null,
    })
}

/// `video` leaf with default playback controls.
pub fn video(id: impl Into<String>, src: impl Into<String>) -> NodeDef {
    NodeDef::Video(MediaDef::new(id, src))
}

/// `audio` leaf with default playback controls.
pub fn audio(id: impl Into<String>, src: impl Into<String>) -> NodeDef {
    NodeDef::Audio(MediaDef::new(id, src))
}

#[cfg(test)]
#[path = "../../tests/unit/composition/dsl.rs"]
mod tests;
