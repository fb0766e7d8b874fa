//! termview - a read-mostly viewer for terminal output
//!
//! Mirrors a terminal emulator's screen and scrollback into an editable
//! text buffer with style decorations, stable line bookmarks, a selection
//! mode and virtual-scroll sizing.
//!
//! - **core**: buffer model, render event processing, modes and scrolling
//! - **viewer**: [`viewer::TerminalViewer`], the component hosts talk to
//! - **ui**: crossterm rendering of the decorated buffer
//! - **demo**: a scripted emulator for the demo binary and tests

pub mod config;
pub mod core;
pub mod demo;
pub mod error;
pub mod ui;
pub mod viewer;

pub use error::{Result, ViewerError};
pub use viewer::{AttachContext, TerminalViewer, ViewerEvent, ViewerHost};
