pub mod avl_tree;
pub mod config;
pub mod error;
pub mod traverse;

pub use avl_tree::AvlTree;
pub use config::{ConfigT, DebugConfig, DefaultConfig};
pub use error::TreeError;
pub use traverse::{NodeRef, Order};
