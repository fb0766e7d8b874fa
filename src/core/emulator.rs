//! Interface to the terminal emulator collaborator
//!
//! The emulator owns escape-sequence handling and the cell grid. The viewer
//! only sees render events, line snapshots and cursor/size information, and
//! forwards input it does not handle itself.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::mpsc::Sender;

use crossterm::event::KeyEvent;

use super::cell::Line;

/// Screen change notification produced by the emulator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderEvent {
    pub rows: usize,
    pub columns: usize,
    /// Screen rows the emulator currently guarantees are valid
    pub realized_rows: usize,
    /// Rows to re-read with [`Emulator::line_at_row`]
    pub refresh: Option<Range<usize>>,
    /// Lines that scrolled off the top of the screen, oldest first
    pub scrollback_lines: Vec<Line>,
}

/// Cursor position and screen size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub cursor_x: usize,
    pub cursor_y: usize,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TermSize {
    pub rows: usize,
    pub columns: usize,
}

/// Mouse event in emulator coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseEventOptions {
    pub left_button: bool,
    pub middle_button: bool,
    pub right_button: bool,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub meta_key: bool,
    /// Screen row; negative inside the scrollback
    pub row: i64,
    pub column: usize,
}

/// Channel end the emulator pushes render events into
pub type RenderSink = Sender<RenderEvent>;

pub trait Emulator {
    /// Register the viewer's render listener, replacing any previous one
    fn add_render_listener(&mut self, sink: RenderSink);

    fn remove_render_listener(&mut self);

    fn dimensions(&self) -> Dimensions;

    fn size(&self) -> TermSize {
        let dims = self.dimensions();
        TermSize {
            rows: dims.rows,
            columns: dims.columns,
        }
    }

    fn resize(&mut self, size: TermSize);

    fn line_at_row(&self, row: usize) -> Line;

    /// Returns true if the emulator consumed the event
    fn mouse_down(&mut self, options: &MouseEventOptions) -> bool;

    fn mouse_up(&mut self, options: &MouseEventOptions) -> bool;

    fn mouse_move(&mut self, options: &MouseEventOptions) -> bool;

    /// Returns true if the emulator consumed the key
    fn key_down(&mut self, event: &KeyEvent) -> bool;

    fn key_press(&mut self, event: &KeyEvent);

    fn focus(&mut self) {}

    fn blur(&mut self) {}
}

/// Shared emulators, so a caller can keep a handle while the viewer owns one
impl<E: Emulator> Emulator for Rc<RefCell<E>> {
    fn add_render_listener(&mut self, sink: RenderSink) {
        self.borrow_mut().add_render_listener(sink);
    }

    fn remove_render_listener(&mut self) {
        self.borrow_mut().remove_render_listener();
    }

    fn dimensions(&self) -> Dimensions {
        self.borrow().dimensions()
    }

    fn size(&self) -> TermSize {
        self.borrow().size()
    }

    fn resize(&mut self, size: TermSize) {
        self.borrow_mut().resize(size);
    }

    fn line_at_row(&self, row: usize) -> Line {
        self.borrow().line_at_row(row)
    }

    fn mouse_down(&mut self, options: &MouseEventOptions) -> bool {
        self.borrow_mut().mouse_down(options)
    }

    fn mouse_up(&mut self, options: &MouseEventOptions) -> bool {
        self.borrow_mut().mouse_up(options)
    }

    fn mouse_move(&mut self, options: &MouseEventOptions) -> bool {
        self.borrow_mut().mouse_move(options)
    }

    fn key_down(&mut self, event: &KeyEvent) -> bool {
        self.borrow_mut().key_down(event)
    }

    fn key_press(&mut self, event: &KeyEvent) {
        self.borrow_mut().key_press(event);
    }

    fn focus(&mut self) {
        self.borrow_mut().focus();
    }

    fn blur(&mut self) {
        self.borrow_mut().blur();
    }
}
