//! Compiled layer tree.
//!
//! The layers directory is compiled once per run into an immutable [`Tree`]
//! of groups and layers. Everything downstream (pipeline planning, execution,
//! reporting) reads from that value; nothing mutates it.

pub mod compile;
pub mod order;
mod render;
mod types;

pub use compile::{ConfigError, compile};
pub use order::{Child, resolve_order};
pub use types::{GroupNode, GroupSettings, LayerEntry, LayerInput, LayerNode, Node, Selection, Tree};
