//! Core viewer components.
//!
//! This module contains the buffer model and the logic that keeps it in
//! step with the terminal emulator:
//!
//! - **attr**: Packed attribute words and their style tags
//! - **cell**: Cells and lines as delivered by the emulator
//! - **marks**: Positions that follow buffer edits
//! - **decoration**: Style runs attached to buffer text
//! - **document**: Line buffer split into scrollback and screen
//! - **bookmark**: Stable line references
//! - **emulator**: Interface to the terminal emulator
//! - **render**: Render event processing
//! - **mode**: DEFAULT / SELECTION modes and the selection cursor
//! - **scroll**: Virtual scroll sizing
//!
//! # Architecture
//!
//! ```text
//! Emulator ──RenderEvent──> RenderProcessor ──edits──> Document
//!                                 │                    ├── lines
//!                                 └── AttrDecoder      ├── DecorationIndex
//!                                                      └── MarkArena <── Bookmarks
//! ```

pub mod attr;
pub mod bookmark;
pub mod cell;
pub mod decoration;
pub mod document;
pub mod emulator;
pub mod marks;
pub mod mode;
pub mod render;
pub mod scroll;

pub use attr::{AttrDecoder, AttrFlags, CharAttr, StyleTag, StyleTags};
pub use bookmark::{BookmarkRef, Bookmarks, LineRef};
pub use cell::{line_from_str, Cell, Line};
pub use decoration::{Decoration, DecorationIndex};
pub use document::Document;
pub use emulator::{Dimensions, Emulator, MouseEventOptions, RenderEvent, RenderSink, TermSize};
pub use marks::Pos;
pub use mode::{Edge, Mode, ModeState};
pub use render::{line_to_text_styles, lines_to_text_styles, RenderProcessor};
pub use scroll::{FixedMetrics, FontMetrics, Margins, ScrollState, SetterState, VirtualScrollable};
