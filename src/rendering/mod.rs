//! Rendering selected tags into the final map text.

mod tree;

pub use tree::MapRenderer;
