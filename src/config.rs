/// Compile-time knobs for an [`AvlTree`](crate::avl_tree::AvlTree).
pub trait ConfigT {
    /// Log rotations and rejected operations through `log::debug!`.
    const DEBUG: bool;
    /// Assert every invariant after each successful insert/remove.
    const CHECK_INVARIANTS: bool;
}

pub struct DefaultConfig {}
pub struct DebugConfig {}

impl ConfigT for DefaultConfig {
    const DEBUG: bool = false;
    const CHECK_INVARIANTS: bool = false;
}

impl ConfigT for DebugConfig {
    const DEBUG: bool = true;
    const CHECK_INVARIANTS: bool = true;
}
