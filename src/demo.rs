//! Scripted emulator
//!
//! A small in-memory emulator that is driven programmatically instead of by
//! escape sequences. The demo binary uses it to feed the viewer and the
//! tests use it as a stand-in for a real emulator.

use std::ops::Range;

use crossterm::event::KeyEvent;
use tracing::{debug, trace};

use crate::core::attr::CharAttr;
use crate::core::cell::{line_from_str, Cell, Line};
use crate::core::emulator::{Dimensions, Emulator, MouseEventOptions, RenderEvent, RenderSink, TermSize};

pub struct DemoEmulator {
    rows: usize,
    columns: usize,
    screen: Vec<Line>,
    cursor_x: usize,
    cursor_y: usize,
    /// Rows written since the last reset
    realized_rows: usize,
    dirty: Option<Range<usize>>,
    scrollback: Vec<Line>,
    size_changed: bool,
    sink: Option<RenderSink>,
    /// Whether key and mouse input is reported as consumed
    consume_input: bool,
    pub focused: bool,
    pub keys_down: Vec<KeyEvent>,
    pub keys_pressed: Vec<KeyEvent>,
    pub mouse_events: Vec<MouseEventOptions>,
    pub resizes: Vec<TermSize>,
}

impl DemoEmulator {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            screen: vec![blank_line(columns); rows],
            cursor_x: 0,
            cursor_y: 0,
            realized_rows: 0,
            dirty: None,
            scrollback: Vec::new(),
            size_changed: true,
            sink: None,
            consume_input: true,
            focused: false,
            keys_down: Vec::new(),
            keys_pressed: Vec::new(),
            mouse_events: Vec::new(),
            resizes: Vec::new(),
        }
    }

    pub fn set_consume_input(&mut self, consume: bool) {
        self.consume_input = consume;
    }

    pub fn has_listener(&self) -> bool {
        self.sink.is_some()
    }

    /// Replace a screen row. The line is padded or cut to the screen width.
    pub fn set_line(&mut self, row: usize, mut line: Line) {
        if row >= self.rows {
            return;
        }
        line.resize(self.columns, Cell::default());
        self.screen[row] = line;
        self.realized_rows = self.realized_rows.max(row + 1);
        self.mark_dirty(row..row + 1);
    }

    pub fn write_str(&mut self, row: usize, text: &str, attr: CharAttr) {
        self.set_line(row, line_from_str(text, attr));
    }

    pub fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor_x = x.min(self.columns.saturating_sub(1));
        self.cursor_y = y.min(self.rows.saturating_sub(1));
    }

    /// Scroll the screen up, moving the top rows into the scrollback
    pub fn scroll_up(&mut self, count: usize) {
        let count = count.min(self.rows);
        let moved: Vec<Line> = self.screen.drain(..count).collect();
        self.scrollback.extend(moved);
        self.screen
            .extend(std::iter::repeat(blank_line(self.columns)).take(count));
        self.mark_dirty(0..self.realized_rows);
    }

    /// Push the pending changes to the render listener.
    /// Returns false if there was nothing to send.
    pub fn flush(&mut self) -> bool {
        if self.dirty.is_none() && self.scrollback.is_empty() && !self.size_changed {
            return false;
        }
        let event = RenderEvent {
            rows: self.rows,
            columns: self.columns,
            realized_rows: self.realized_rows,
            refresh: self.dirty.take(),
            scrollback_lines: std::mem::take(&mut self.scrollback),
        };
        self.size_changed = false;

        match &self.sink {
            Some(sink) => {
                trace!("Render event: refresh={:?}", event.refresh);
                if sink.send(event).is_err() {
                    debug!("Render listener went away");
                    self.sink = None;
                    return false;
                }
                true
            }
            None => false,
        }
    }

    fn mark_dirty(&mut self, rows: Range<usize>) {
        if rows.start >= rows.end {
            return;
        }
        self.dirty = Some(match self.dirty.take() {
            Some(dirty) => dirty.start.min(rows.start)..dirty.end.max(rows.end),
            None => rows,
        });
    }
}

fn blank_line(columns: usize) -> Line {
    vec![Cell::default(); columns]
}

impl Emulator for DemoEmulator {
    fn add_render_listener(&mut self, sink: RenderSink) {
        self.sink = Some(sink);
    }

    fn remove_render_listener(&mut self) {
        self.sink = None;
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            cursor_x: self.cursor_x,
            cursor_y: self.cursor_y,
            columns: self.columns,
            rows: self.rows,
        }
    }

    fn resize(&mut self, size: TermSize) {
        if size.rows == self.rows && size.columns == self.columns {
            return;
        }
        debug!("Demo emulator resize to {}x{}", size.columns, size.rows);
        self.resizes.push(size);
        self.rows = size.rows;
        self.columns = size.columns;
        self.screen.resize(size.rows, blank_line(size.columns));
        for line in &mut self.screen {
            line.resize(size.columns, Cell::default());
        }
        self.realized_rows = self.realized_rows.min(size.rows);
        self.set_cursor(self.cursor_x, self.cursor_y);
        self.size_changed = true;
        self.dirty = None;
        self.mark_dirty(0..self.realized_rows);
    }

    fn line_at_row(&self, row: usize) -> Line {
        self.screen
            .get(row)
            .cloned()
            .unwrap_or_else(|| blank_line(self.columns))
    }

    fn mouse_down(&mut self, options: &MouseEventOptions) -> bool {
        self.mouse_events.push(*options);
        self.consume_input
    }

    fn mouse_up(&mut self, options: &MouseEventOptions) -> bool {
        self.mouse_events.push(*options);
        self.consume_input
    }

    fn mouse_move(&mut self, options: &MouseEventOptions) -> bool {
        self.mouse_events.push(*options);
        self.consume_input
    }

    fn key_down(&mut self, event: &KeyEvent) -> bool {
        self.keys_down.push(*event);
        self.consume_input
    }

    fn key_press(&mut self, event: &KeyEvent) {
        self.keys_pressed.push(*event);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_flush_reports_dirty_rows() {
        let (tx, rx) = mpsc::channel();
        let mut emulator = DemoEmulator::new(4, 10);
        emulator.add_render_listener(tx);

        emulator.write_str(1, "hi", CharAttr::DEFAULT);
        emulator.write_str(2, "there", CharAttr::DEFAULT);
        assert!(emulator.flush());

        let event = rx.try_recv().unwrap();
        assert_eq!(event.refresh, Some(1..3));
        assert_eq!(event.realized_rows, 3);
        assert_eq!((event.rows, event.columns), (4, 10));

        assert!(!emulator.flush());
    }

    #[test]
    fn test_scroll_up_moves_rows_to_scrollback() {
        let (tx, rx) = mpsc::channel();
        let mut emulator = DemoEmulator::new(3, 5);
        emulator.add_render_listener(tx);
        emulator.write_str(0, "a", CharAttr::DEFAULT);
        emulator.write_str(1, "b", CharAttr::DEFAULT);
        emulator.flush();
        let _ = rx.try_recv();

        emulator.scroll_up(1);
        emulator.flush();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.scrollback_lines.len(), 1);
        assert_eq!(event.scrollback_lines[0][0].grapheme, "a");
        assert_eq!(emulator.line_at_row(0)[0].grapheme, "b");
    }

    #[test]
    fn test_resize_clamps_cursor() {
        let mut emulator = DemoEmulator::new(10, 10);
        emulator.set_cursor(9, 9);
        emulator.resize(TermSize { rows: 5, columns: 4 });
        let dims = emulator.dimensions();
        assert_eq!((dims.cursor_x, dims.cursor_y), (3, 4));
        assert_eq!(emulator.resizes.len(), 1);
        assert_eq!(emulator.line_at_row(4).len(), 4);
    }

    #[test]
    fn test_no_listener_means_no_events() {
        let mut emulator = DemoEmulator::new(2, 2);
        emulator.write_str(0, "x", CharAttr::DEFAULT);
        assert!(!emulator.flush());
        assert!(!emulator.has_listener());
    }
}
