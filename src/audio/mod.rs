pub(crate) mod loop_offsets;
pub(crate) mod manifest;
pub(crate) mod registry;
