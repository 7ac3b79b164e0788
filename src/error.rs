use thiserror::Error;

/// Failure signals of the tree's keyed operations. Neither leaves a partial mutation behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum TreeError {
    /// `insert` was given a key that is already present.
    #[error("duplicate key")]
    DuplicateKey,
    /// `remove`, `update` or `lookup` was given a key that is absent.
    #[error("key not found")]
    KeyNotFound,
}
