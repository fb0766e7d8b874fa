//! Bookmarks: stable references to document lines
//!
//! A bookmark is a back-reference to a line. It moves as lines are inserted
//! or removed above it and stops resolving once its own line is deleted.

use std::collections::HashMap;

use super::document::Document;
use super::marks::{MarkId, Pos};

/// Opaque handle returned by [`Bookmarks::bookmark_line`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BookmarkRef(u64);

impl BookmarkRef {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A line given either directly or through a bookmark
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineRef {
    Line(usize),
    Bookmark(BookmarkRef),
}

impl From<usize> for LineRef {
    fn from(line: usize) -> Self {
        LineRef::Line(line)
    }
}

impl From<BookmarkRef> for LineRef {
    fn from(bookmark: BookmarkRef) -> Self {
        LineRef::Bookmark(bookmark)
    }
}

#[derive(Debug, Default)]
pub struct Bookmarks {
    counter: u64,
    index: HashMap<BookmarkRef, MarkId>,
}

impl Bookmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark the start of `line`. Lines past the end are clamped to the last line.
    pub fn bookmark_line(&mut self, doc: &mut Document, line: usize) -> BookmarkRef {
        let pos = doc.clip(Pos::new(line, 0));
        let mark = doc.create_mark(Pos::new(pos.line, 0));
        let bookmark = BookmarkRef(self.counter);
        self.counter += 1;
        self.index.insert(bookmark, mark);
        bookmark
    }

    /// Current line of a bookmark, `None` once its line has been deleted
    pub fn resolve(&self, doc: &Document, bookmark: BookmarkRef) -> Option<usize> {
        let mark = self.index.get(&bookmark)?;
        doc.mark_pos(*mark).map(|pos| pos.line)
    }

    /// Resolve a line or bookmark argument to a line index inside the buffer
    pub fn resolve_line(&self, doc: &Document, line: LineRef) -> Option<usize> {
        let resolved = match line {
            LineRef::Line(n) => Some(n),
            LineRef::Bookmark(bookmark) => self.resolve(doc, bookmark),
        }?;
        (resolved < doc.raw_line_count()).then_some(resolved)
    }

    /// Forget a bookmark. Returns false if it was unknown.
    pub fn release(&mut self, doc: &mut Document, bookmark: BookmarkRef) -> bool {
        match self.index.remove(&bookmark) {
            Some(mark) => {
                doc.remove_mark(mark);
                true
            }
            None => false,
        }
    }

    /// Drop bookmarks whose line no longer exists
    pub fn prune(&mut self, doc: &Document) {
        self.index.retain(|_, mark| doc.mark_pos(*mark).is_some());
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_lines(n: usize) -> Document {
        let mut doc = Document::new();
        let text: Vec<String> = (0..n).map(|i| format!("line {}", i)).collect();
        doc.insert(Pos::new(0, 0), &text.join("\n")).unwrap();
        doc
    }

    #[test]
    fn test_ids_increase() {
        let mut doc = doc_with_lines(3);
        let mut bookmarks = Bookmarks::new();
        let a = bookmarks.bookmark_line(&mut doc, 0);
        let b = bookmarks.bookmark_line(&mut doc, 1);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_insert_before_shifts_bookmark() {
        let mut doc = doc_with_lines(10);
        let mut bookmarks = Bookmarks::new();
        let bookmark = bookmarks.bookmark_line(&mut doc, 5);

        for n in 1..4 {
            doc.insert(Pos::new(2, 0), "inserted\n").unwrap();
            assert_eq!(bookmarks.resolve(&doc, bookmark), Some(5 + n));
        }
    }

    #[test]
    fn test_insert_at_end_of_previous_line_shifts_bookmark() {
        let mut doc = doc_with_lines(10);
        let mut bookmarks = Bookmarks::new();
        let bookmark = bookmarks.bookmark_line(&mut doc, 5);

        let end_of_four = Pos::new(4, doc.line_len(4));
        doc.insert(end_of_four, "\na\nb").unwrap();
        assert_eq!(bookmarks.resolve(&doc, bookmark), Some(7));
    }

    #[test]
    fn test_edits_after_bookmark_do_not_move_it() {
        let mut doc = doc_with_lines(10);
        let mut bookmarks = Bookmarks::new();
        let bookmark = bookmarks.bookmark_line(&mut doc, 3);

        doc.delete_lines(6, 8).unwrap();
        doc.insert(Pos::new(5, 2), "xyz\n").unwrap();
        assert_eq!(bookmarks.resolve(&doc, bookmark), Some(3));
    }

    #[test]
    fn test_deleted_line_resolves_to_none() {
        let mut doc = doc_with_lines(10);
        let mut bookmarks = Bookmarks::new();
        let bookmark = bookmarks.bookmark_line(&mut doc, 4);

        doc.delete_lines(3, 5).unwrap();
        assert_eq!(bookmarks.resolve(&doc, bookmark), None);
        assert_eq!(bookmarks.resolve_line(&doc, bookmark.into()), None);
    }

    #[test]
    fn test_bookmark_on_first_line_deleted_from_top() {
        let mut doc = doc_with_lines(4);
        let mut bookmarks = Bookmarks::new();
        let first = bookmarks.bookmark_line(&mut doc, 0);
        let third = bookmarks.bookmark_line(&mut doc, 2);

        doc.delete_lines(0, 1).unwrap();
        assert_eq!(bookmarks.resolve(&doc, first), None);
        assert_eq!(bookmarks.resolve(&doc, third), Some(0));
    }

    #[test]
    fn test_resolve_line_checks_range() {
        let mut doc = doc_with_lines(3);
        let bookmarks = Bookmarks::new();
        assert_eq!(bookmarks.resolve_line(&doc, LineRef::Line(2)), Some(2));
        assert_eq!(bookmarks.resolve_line(&doc, LineRef::Line(3)), None);

        doc.clear();
        assert_eq!(bookmarks.resolve_line(&doc, LineRef::Line(0)), Some(0));
    }

    #[test]
    fn test_release_and_prune() {
        let mut doc = doc_with_lines(5);
        let mut bookmarks = Bookmarks::new();
        let keep = bookmarks.bookmark_line(&mut doc, 0);
        let gone = bookmarks.bookmark_line(&mut doc, 3);
        let released = bookmarks.bookmark_line(&mut doc, 4);

        assert!(bookmarks.release(&mut doc, released));
        assert!(!bookmarks.release(&mut doc, released));
        assert_eq!(doc.marks().len(), 2);

        doc.delete_lines(2, 3).unwrap();
        bookmarks.prune(&doc);
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks.resolve(&doc, keep), Some(0));
        assert_eq!(bookmarks.resolve(&doc, gone), None);
    }
}
