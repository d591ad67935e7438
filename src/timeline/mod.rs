pub(crate) mod clock;
pub(crate) mod evaluator;
pub(crate) mod mount;
pub(crate) mod overrides;
pub(crate) mod scope;
pub(crate) mod tree;
