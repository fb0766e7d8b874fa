//! Viewer mode and the selection cursor
//!
//! In DEFAULT mode the viewer is a read-only mirror and the cursor is
//! hidden. In SELECTION mode a local cursor (head plus anchor) can be moved
//! around the buffer and, when the viewer is editable, used to edit it.

use crate::error::Result;

use super::document::Document;
use super::marks::Pos;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Default,
    Selection,
}

/// Which end of the buffer a cursor movement ran into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

#[derive(Debug)]
pub struct ModeState {
    mode: Mode,
    editable: bool,
    read_only: bool,
    cursor_visible: bool,
    /// Moving end of the selection
    head: Pos,
    /// Fixed end of the selection
    anchor: Pos,
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ModeState {
    pub fn new(editable: bool) -> Self {
        Self {
            mode: Mode::Default,
            editable,
            read_only: true,
            cursor_visible: false,
            head: Pos::default(),
            anchor: Pos::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn head(&self) -> Pos {
        self.head
    }

    pub fn anchor(&self) -> Pos {
        self.anchor
    }

    /// Enter SELECTION with the cursor at `cursor`. Returns false if already there.
    pub fn enter_selection(&mut self, cursor: Pos) -> bool {
        if self.mode == Mode::Selection {
            return false;
        }
        self.mode = Mode::Selection;
        self.read_only = !self.editable;
        self.cursor_visible = true;
        self.head = cursor;
        self.anchor = cursor;
        true
    }

    /// Return to DEFAULT. Returns false if already there.
    pub fn exit_selection(&mut self) -> bool {
        if self.mode == Mode::Default {
            return false;
        }
        self.mode = Mode::Default;
        self.read_only = true;
        self.cursor_visible = false;
        self.anchor = self.head;
        true
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        if self.mode == Mode::Selection {
            self.read_only = !editable;
        }
    }

    /// Only hides; the cursor becomes visible again on entering SELECTION
    pub fn hide_cursor(&mut self) {
        self.cursor_visible = false;
    }

    pub fn has_selection(&self) -> bool {
        self.head != self.anchor
    }

    /// Selection bounds in document order
    pub fn selection_range(&self) -> (Pos, Pos) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    /// Move the head; the anchor follows unless `extend` is set
    pub fn set_cursor(&mut self, pos: Pos, extend: bool) {
        self.head = pos;
        if !extend {
            self.anchor = pos;
        }
    }

    pub fn collapse(&mut self) {
        self.anchor = self.head;
    }

    /// Clamp both ends after the buffer changed underneath
    pub fn clip(&mut self, doc: &Document) {
        self.head = doc.clip(self.head);
        self.anchor = doc.clip(self.anchor);
    }

    pub fn move_left(&mut self, doc: &Document, extend: bool) -> bool {
        let head = doc.clip(self.head);
        let target = if head.ch > 0 {
            Pos::new(head.line, head.ch - 1)
        } else if head.line > 0 {
            Pos::new(head.line - 1, doc.line_len(head.line - 1))
        } else {
            return false;
        };
        self.set_cursor(target, extend);
        true
    }

    pub fn move_right(&mut self, doc: &Document, extend: bool) -> bool {
        let head = doc.clip(self.head);
        let target = if head.ch < doc.line_len(head.line) {
            Pos::new(head.line, head.ch + 1)
        } else if head.line < doc.last_line() {
            Pos::new(head.line + 1, 0)
        } else {
            return false;
        };
        self.set_cursor(target, extend);
        true
    }

    /// Move up by `lines`. Returns false if the head is already on the first line.
    pub fn move_up(&mut self, doc: &Document, lines: usize, extend: bool) -> bool {
        let head = doc.clip(self.head);
        if head.line == 0 {
            return false;
        }
        let line = head.line.saturating_sub(lines);
        self.set_cursor(doc.clip(Pos::new(line, head.ch)), extend);
        true
    }

    /// Move down by `lines`. Returns false if the head is already on the last line.
    pub fn move_down(&mut self, doc: &Document, lines: usize, extend: bool) -> bool {
        let head = doc.clip(self.head);
        if head.line >= doc.last_line() {
            return false;
        }
        let line = (head.line + lines).min(doc.last_line());
        self.set_cursor(doc.clip(Pos::new(line, head.ch)), extend);
        true
    }

    pub fn line_start(&mut self, doc: &Document, extend: bool) -> bool {
        let head = doc.clip(self.head);
        self.set_cursor(Pos::new(head.line, 0), extend);
        head.ch != 0
    }

    pub fn line_end(&mut self, doc: &Document, extend: bool) -> bool {
        let head = doc.clip(self.head);
        let len = doc.line_len(head.line);
        self.set_cursor(Pos::new(head.line, len), extend);
        head.ch != len
    }

    /// Replace the selection (or insert at the cursor) with `text`
    pub fn insert_text(&mut self, doc: &mut Document, text: &str) -> Result<()> {
        let (from, to) = self.selection_range();
        let (from, to) = (doc.clip(from), doc.clip(to));
        doc.replace_range(from, to, text)?;

        let mut pieces = text.split('\n');
        let first = pieces.next().unwrap_or_default();
        let end = match pieces.last() {
            Some(last) => Pos::new(from.line + text.matches('\n').count(), last.chars().count()),
            None => Pos::new(from.line, from.ch + first.chars().count()),
        };
        self.set_cursor(end, false);
        Ok(())
    }

    /// Delete the selection, or the char before the cursor
    pub fn delete_backward(&mut self, doc: &mut Document) -> Result<bool> {
        if !self.has_selection() && !self.move_left(doc, true) {
            return Ok(false);
        }
        self.insert_text(doc, "")?;
        Ok(true)
    }

    /// Delete the selection, or the char after the cursor
    pub fn delete_forward(&mut self, doc: &mut Document) -> Result<bool> {
        if !self.has_selection() && !self.move_right(doc, true) {
            return Ok(false);
        }
        self.insert_text(doc, "")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(text: &str) -> Document {
        let mut doc = Document::new();
        doc.insert(Pos::new(0, 0), text).unwrap();
        doc
    }

    #[test]
    fn test_enter_and_exit() {
        let mut state = ModeState::new(false);
        assert_eq!(state.mode(), Mode::Default);
        assert!(state.read_only());

        assert!(state.enter_selection(Pos::new(2, 0)));
        assert!(!state.enter_selection(Pos::new(0, 0)));
        assert_eq!(state.head(), Pos::new(2, 0));
        assert!(state.cursor_visible());
        assert!(state.read_only());

        assert!(state.exit_selection());
        assert!(!state.exit_selection());
        assert!(state.read_only());
        assert!(!state.cursor_visible());
    }

    #[test]
    fn test_editable_selection_is_writable() {
        let mut state = ModeState::new(true);
        assert!(state.read_only());
        state.enter_selection(Pos::new(0, 0));
        assert!(!state.read_only());

        state.set_editable(false);
        assert!(state.read_only());
        state.set_editable(true);
        assert!(!state.read_only());

        state.exit_selection();
        assert!(state.read_only());
    }

    #[test]
    fn test_movement_wraps_lines() {
        let doc = doc_with("ab\ncd");
        let mut state = ModeState::new(false);
        state.enter_selection(Pos::new(1, 0));

        assert!(state.move_left(&doc, false));
        assert_eq!(state.head(), Pos::new(0, 2));
        assert!(state.move_right(&doc, false));
        assert_eq!(state.head(), Pos::new(1, 0));

        assert!(state.line_end(&doc, false));
        assert!(!state.move_right(&doc, false));
        assert!(!state.move_down(&doc, 1, false));
        assert!(state.move_up(&doc, 5, false));
        assert_eq!(state.head(), Pos::new(0, 2));
        assert!(!state.move_up(&doc, 1, false));
    }

    #[test]
    fn test_extend_selection() {
        let doc = doc_with("hello\nworld");
        let mut state = ModeState::new(false);
        state.enter_selection(Pos::new(0, 1));

        state.move_down(&doc, 1, true);
        state.line_end(&doc, true);
        assert!(state.has_selection());
        assert_eq!(state.selection_range(), (Pos::new(0, 1), Pos::new(1, 5)));

        state.set_cursor(Pos::new(0, 0), true);
        assert_eq!(state.selection_range(), (Pos::new(0, 0), Pos::new(0, 1)));

        state.collapse();
        assert!(!state.has_selection());
    }

    #[test]
    fn test_editing() {
        let mut doc = doc_with("abc");
        let mut state = ModeState::new(true);
        state.enter_selection(Pos::new(0, 1));

        state.insert_text(&mut doc, "X\nY").unwrap();
        assert_eq!(doc.text(), "aX\nYbc");
        assert_eq!(state.head(), Pos::new(1, 1));

        assert!(state.delete_backward(&mut doc).unwrap());
        assert_eq!(doc.text(), "aX\nbc");
        assert!(state.delete_backward(&mut doc).unwrap());
        assert_eq!(doc.text(), "aXbc");
        assert_eq!(state.head(), Pos::new(0, 2));

        assert!(state.delete_forward(&mut doc).unwrap());
        assert_eq!(doc.text(), "aXc");

        state.set_cursor(Pos::new(0, 0), false);
        assert!(!state.delete_backward(&mut doc).unwrap());
    }

    #[test]
    fn test_clip_after_shrink() {
        let mut doc = doc_with("one\ntwo\nthree");
        let mut state = ModeState::new(false);
        state.enter_selection(Pos::new(2, 4));

        doc.delete_lines(1, 2).unwrap();
        state.clip(&doc);
        assert_eq!(state.head(), Pos::new(0, 3));
    }
}
