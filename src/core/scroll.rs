//! Virtual scrolling
//!
//! The viewer lives inside a virtual scroll container. The container asks
//! for the viewer's full ("virtual") height, hands back the height it may
//! occupy on screen plus a scroll offset, and the viewer sizes its backing
//! view and scroll position to match.

use tracing::debug;

use super::emulator::TermSize;

/// Font measurements in pixels
pub trait FontMetrics {
    /// `None` until the font has settled
    fn line_height(&self) -> Option<usize>;

    fn char_width(&self) -> Option<usize>;
}

/// Metrics that are known up front
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedMetrics {
    pub line_height: usize,
    pub char_width: usize,
}

impl FontMetrics for FixedMetrics {
    fn line_height(&self) -> Option<usize> {
        Some(self.line_height)
    }

    fn char_width(&self) -> Option<usize> {
        Some(self.char_width)
    }
}

/// Horizontal space around the text area, in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Margins {
    pub left: usize,
    pub right: usize,
}

/// Dimensions handed down by the scroll container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetterState {
    /// Height the viewer may occupy on screen
    pub height: usize,
    /// Scroll offset into the virtual height
    pub y_offset: usize,
    pub container_height: usize,
}

/// Participant in a virtual scroll container
pub trait VirtualScrollable {
    fn min_height(&self) -> usize {
        0
    }

    /// Full height of the content
    fn virtual_height(&self, container_height: usize) -> usize;

    /// Pixels at the bottom of the container the viewer leaves unused
    fn reserve_viewport_height(&self, container_height: usize) -> usize;

    fn set_dimensions_and_scroll(&mut self, state: &SetterState);

    fn height(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct ScrollState {
    use_vpad: bool,
    /// Height set by the container
    height: usize,
    /// Height of the backing view, a whole number of lines when padded
    view_height: usize,
    scroll_top: usize,
}

impl ScrollState {
    pub fn new(use_vpad: bool) -> Self {
        Self {
            use_vpad,
            ..Self::default()
        }
    }

    pub fn use_vpad(&self) -> bool {
        self.use_vpad
    }

    pub fn set_use_vpad(&mut self, use_vpad: bool) {
        self.use_vpad = use_vpad;
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn view_height(&self) -> usize {
        self.view_height
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    /// Visible lines in the backing view
    pub fn visible_lines(&self, line_height: usize) -> usize {
        if line_height == 0 {
            0
        } else {
            self.view_height / line_height
        }
    }

    pub fn reserve_viewport_height(&self, container_height: usize, line_height: usize) -> usize {
        if self.use_vpad && line_height != 0 {
            container_height % line_height
        } else {
            0
        }
    }

    /// Largest allowed scroll offset
    pub fn max_scroll(&self, virtual_height: usize, reserve: usize) -> usize {
        (virtual_height + reserve).saturating_sub(self.height)
    }

    /// Apply container dimensions. Returns false if nothing changed.
    pub fn apply(&mut self, state: &SetterState, virtual_height: usize, line_height: usize) -> bool {
        if state.height == self.height && state.y_offset == self.scroll_top {
            return false;
        }

        self.height = state.height;
        self.view_height = if self.use_vpad && line_height != 0 {
            state.height - state.height % line_height
        } else {
            state.height
        };

        let reserve = self.reserve_viewport_height(state.container_height, line_height);
        self.scroll_top = state.y_offset.min(self.max_scroll(virtual_height, reserve));
        debug!(
            "Scroll state: height={} view_height={} scroll_top={}",
            self.height, self.view_height, self.scroll_top
        );
        true
    }

    /// Scroll to `y`, clamped to the scroll range. Returns the new offset.
    pub fn scroll_to(&mut self, y: usize, virtual_height: usize, reserve: usize) -> usize {
        self.scroll_top = y.min(self.max_scroll(virtual_height, reserve));
        self.scroll_top
    }
}

/// Emulator size that fits a box of `width` by `height` pixels
pub fn box_to_term_size(
    width: usize,
    height: usize,
    line_height: usize,
    char_width: usize,
    margins: Margins,
) -> TermSize {
    let text_width = width.saturating_sub(margins.left + margins.right);
    let columns = if char_width == 0 { 0 } else { text_width / char_width };
    let rows = if line_height == 0 { 0 } else { height / line_height };
    TermSize {
        rows: rows.max(2),
        columns,
    }
}
