pub(crate) mod adapter;
pub(crate) mod element;
pub(crate) mod still;
pub(crate) mod sync;
pub(crate) mod timing;
