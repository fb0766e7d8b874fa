//! Position tracking for buffer edits
//!
//! Marks are (line, ch) positions that follow the text around them as the
//! document is edited. Every edit primitive of the document reports a
//! [`Splice`] and the arena adjusts all live marks from it.

use std::collections::HashMap;

/// A position in the document. `ch` counts chars, not bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub line: usize,
    pub ch: usize,
}

impl Pos {
    pub const fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// Description of one replace operation, expressed in pre-edit coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct Splice {
    pub from: Pos,
    pub to: Pos,
    /// Char length of each inserted line. Never empty; `[0]` for a pure deletion.
    pub inserted: Vec<usize>,
}

impl Splice {
    pub fn new(from: Pos, to: Pos, text: &str) -> Self {
        Self {
            from,
            to,
            inserted: text.split('\n').map(|l| l.chars().count()).collect(),
        }
    }

    pub fn is_insert(&self) -> bool {
        self.from == self.to
    }

    /// Post-edit position of the end of the inserted text
    pub fn end(&self) -> Pos {
        let last = self.inserted.last().copied().unwrap_or(0);
        if self.inserted.len() <= 1 {
            Pos::new(self.from.line, self.from.ch + last)
        } else {
            Pos::new(self.from.line + self.inserted.len() - 1, last)
        }
    }

    /// Map a position at or after `to` into post-edit coordinates
    pub fn shift(&self, pos: Pos) -> Pos {
        let end = self.end();
        if pos.line == self.to.line {
            Pos::new(end.line, end.ch + (pos.ch - self.to.ch))
        } else {
            Pos::new(pos.line - self.to.line + end.line, pos.ch)
        }
    }
}

/// Unique identifier for a mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(pub u64);

/// Arena of tracked positions
#[derive(Debug, Default)]
pub struct MarkArena {
    marks: HashMap<MarkId, Pos>,
    next_id: u64,
}

impl MarkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, pos: Pos) -> MarkId {
        let id = MarkId(self.next_id);
        self.next_id += 1;
        self.marks.insert(id, pos);
        tracing::trace!("Created mark {:?} at {:?}", id, pos);
        id
    }

    /// Current position, or `None` once the mark has been invalidated
    pub fn get(&self, id: MarkId) -> Option<Pos> {
        self.marks.get(&id).copied()
    }

    pub fn remove(&mut self, id: MarkId) {
        self.marks.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Adjust every mark for a replace operation.
    ///
    /// Marks before the range stay put, a mark exactly at the start of a
    /// non-empty range stays put, marks strictly inside it are dropped and
    /// marks at or after its end move with the text. A pure insertion pushes
    /// marks at the insertion point to the right.
    pub fn adjust(&mut self, splice: &Splice) {
        let insert = splice.is_insert();
        self.marks.retain(|id, pos| {
            if *pos < splice.from {
                return true;
            }
            if !insert && *pos == splice.from {
                return true;
            }
            if *pos < splice.to {
                tracing::trace!("Mark {:?} at {:?} invalidated", id, pos);
                return false;
            }
            *pos = splice.shift(*pos);
            true
        });
    }

    /// Drop every mark on a line in `start..=end`
    pub fn invalidate_lines(&mut self, start: usize, end: usize) {
        self.marks.retain(|_, pos| pos.line < start || pos.line > end);
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_end() {
        let s = Splice::new(Pos::new(2, 3), Pos::new(2, 3), "abc");
        assert_eq!(s.end(), Pos::new(2, 6));

        let s = Splice::new(Pos::new(2, 3), Pos::new(4, 1), "a\nbc\n");
        assert_eq!(s.inserted, vec![1, 2, 0]);
        assert_eq!(s.end(), Pos::new(4, 0));
    }

    #[test]
    fn test_insert_lines_before_mark() {
        let mut arena = MarkArena::new();
        let id = arena.create(Pos::new(5, 0));

        arena.adjust(&Splice::new(Pos::new(1, 0), Pos::new(1, 0), "x\ny\nz\n"));
        assert_eq!(arena.get(id), Some(Pos::new(8, 0)));
    }

    #[test]
    fn test_insert_at_mark_moves_right() {
        let mut arena = MarkArena::new();
        let id = arena.create(Pos::new(3, 0));

        arena.adjust(&Splice::new(Pos::new(3, 0), Pos::new(3, 0), "new\n"));
        assert_eq!(arena.get(id), Some(Pos::new(4, 0)));
    }

    #[test]
    fn test_edit_after_mark_is_ignored() {
        let mut arena = MarkArena::new();
        let id = arena.create(Pos::new(1, 0));

        arena.adjust(&Splice::new(Pos::new(4, 2), Pos::new(9, 0), ""));
        assert_eq!(arena.get(id), Some(Pos::new(1, 0)));
    }

    #[test]
    fn test_mark_at_range_start_survives_replace() {
        let mut arena = MarkArena::new();
        let id = arena.create(Pos::new(2, 0));

        arena.adjust(&Splice::new(Pos::new(2, 0), Pos::new(2, 10), "hello"));
        assert_eq!(arena.get(id), Some(Pos::new(2, 0)));
    }

    #[test]
    fn test_mark_inside_deletion_is_invalidated() {
        let mut arena = MarkArena::new();
        let inside = arena.create(Pos::new(3, 0));
        let after = arena.create(Pos::new(6, 0));

        // Delete from end of line 2 through end of line 4
        arena.adjust(&Splice::new(Pos::new(2, 7), Pos::new(4, 3), ""));
        assert_eq!(arena.get(inside), None);
        assert_eq!(arena.get(after), Some(Pos::new(4, 0)));
    }

    #[test]
    fn test_mark_on_last_deleted_line_follows_tail() {
        let mut arena = MarkArena::new();
        let id = arena.create(Pos::new(4, 5));

        arena.adjust(&Splice::new(Pos::new(2, 1), Pos::new(4, 3), "ab"));
        assert_eq!(arena.get(id), Some(Pos::new(2, 5)));
    }

    #[test]
    fn test_invalidate_lines() {
        let mut arena = MarkArena::new();
        let a = arena.create(Pos::new(0, 0));
        let b = arena.create(Pos::new(2, 0));
        let c = arena.create(Pos::new(3, 0));

        arena.invalidate_lines(1, 2);
        assert_eq!(arena.get(a), Some(Pos::new(0, 0)));
        assert_eq!(arena.get(b), None);
        assert_eq!(arena.get(c), Some(Pos::new(3, 0)));
        assert_eq!(arena.len(), 2);
    }
}
