pub(crate) mod playback;
pub(crate) mod render;
pub(crate) mod sink;
pub(crate) mod stage;
