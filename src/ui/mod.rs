//! User interface rendering.
//!
//! - **renderer**: crossterm output of the decorated buffer, plus a plain
//!   debug dump

pub mod renderer;

pub use renderer::{style_for_tags, DebugRenderer, Renderer};
