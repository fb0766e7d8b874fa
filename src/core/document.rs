//! Document buffer
//!
//! Ordered line storage mirroring the terminal. Lines before
//! `terminal_first_row` are scrollback, the rest is the live screen. All
//! mutation goes through [`Document::replace_range`], which keeps the
//! decoration index and the mark arena in step with the text.

use tracing::warn;

use crate::error::{Result, ViewerError};

use super::decoration::{Decoration, DecorationIndex};
use super::marks::{MarkArena, MarkId, Pos, Splice};

pub struct Document {
    /// Always holds at least one line
    lines: Vec<String>,
    /// True when the buffer holds no content, even though `lines` has one empty entry
    empty: bool,
    /// First line of the screen region
    pub terminal_first_row: usize,
    decorations: DecorationIndex,
    marks: MarkArena,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            empty: true,
            terminal_first_row: 0,
            decorations: DecorationIndex::new(),
            marks: MarkArena::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Number of lines, or 0 for an empty buffer
    pub fn line_count(&self) -> usize {
        if self.empty {
            0
        } else {
            self.lines.len()
        }
    }

    /// Number of stored lines, including the placeholder line of an empty buffer
    pub fn raw_line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, n: usize) -> Option<&str> {
        self.lines.get(n).map(String::as_str)
    }

    /// Length of line `n` in chars
    pub fn line_len(&self, n: usize) -> usize {
        self.lines.get(n).map_or(0, |l| l.chars().count())
    }

    pub fn last_line(&self) -> usize {
        self.lines.len() - 1
    }

    /// Position just past the last character of the buffer
    pub fn end_pos(&self) -> Pos {
        let last = self.last_line();
        Pos::new(last, self.line_len(last))
    }

    pub fn text(&self) -> String {
        if self.empty {
            String::new()
        } else {
            self.lines.join("\n")
        }
    }

    /// Text between two positions, lines joined with `\n`
    pub fn text_range(&self, from: Pos, to: Pos) -> Result<String> {
        self.check_range(from, to)?;
        if from.line == to.line {
            let line = &self.lines[from.line];
            return Ok(line.chars().skip(from.ch).take(to.ch - from.ch).collect());
        }
        let mut out: String = self.lines[from.line].chars().skip(from.ch).collect();
        for line in &self.lines[from.line + 1..to.line] {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        out.extend(self.lines[to.line].chars().take(to.ch));
        Ok(out)
    }

    pub fn decorations(&self) -> &DecorationIndex {
        &self.decorations
    }

    /// Attach a decoration to existing text
    pub fn decorate(&mut self, deco: &Decoration) -> bool {
        self.decorations.add(deco)
    }

    pub fn marks(&self) -> &MarkArena {
        &self.marks
    }

    pub fn create_mark(&mut self, pos: Pos) -> MarkId {
        self.marks.create(pos)
    }

    pub fn remove_mark(&mut self, id: MarkId) {
        self.marks.remove(id);
    }

    pub fn mark_pos(&self, id: MarkId) -> Option<Pos> {
        self.marks.get(id)
    }

    /// Clamp a position to the buffer
    pub fn clip(&self, pos: Pos) -> Pos {
        let line = pos.line.min(self.last_line());
        Pos::new(line, pos.ch.min(self.line_len(line)))
    }

    fn check_pos(&self, pos: Pos) -> Result<()> {
        if pos.line >= self.lines.len() || pos.ch > self.line_len(pos.line) {
            return Err(ViewerError::InvalidPosition {
                line: pos.line,
                ch: pos.ch,
            });
        }
        Ok(())
    }

    fn check_range(&self, from: Pos, to: Pos) -> Result<()> {
        self.check_pos(from)?;
        self.check_pos(to)?;
        if from > to {
            return Err(ViewerError::InvalidRange {
                start: from.line,
                end: to.line,
            });
        }
        Ok(())
    }

    /// Replace the text between `from` and `to` with `text`.
    ///
    /// An empty `text` deletes, an empty range inserts. Decorations and marks
    /// are adjusted in the same step.
    pub fn replace_range(&mut self, from: Pos, to: Pos, text: &str) -> Result<()> {
        self.check_range(from, to)?;

        let head: String = self.lines[from.line].chars().take(from.ch).collect();
        let tail: String = self.lines[to.line].chars().skip(to.ch).collect();

        let mut pieces: Vec<String> = text.split('\n').map(str::to_string).collect();
        if let Some(first) = pieces.first_mut() {
            first.insert_str(0, &head);
        }
        if let Some(last) = pieces.last_mut() {
            last.push_str(&tail);
        }

        let splice = Splice::new(from, to, text);
        self.lines.splice(from.line..=to.line, pieces);
        self.decorations.splice(&splice);
        self.marks.adjust(&splice);

        if !text.is_empty() {
            self.empty = false;
        }
        Ok(())
    }

    /// Insert text at a position
    pub fn insert(&mut self, pos: Pos, text: &str) -> Result<()> {
        self.replace_range(pos, pos, text)
    }

    /// Treat the buffer as holding content even if every line is blank
    pub fn mark_filled(&mut self) {
        self.empty = false;
    }

    /// Append `count` empty lines at the end of the buffer
    pub fn pad_lines(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let end = self.end_pos();
        let padding = "\n".repeat(count);
        if let Err(e) = self.replace_range(end, end, &padding) {
            warn!("pad_lines: {}", e);
        }
    }

    /// Delete lines `start..=end`.
    ///
    /// From the top the lines are removed outright. Anywhere else the cut
    /// starts at the end of the preceding line, which absorbs the join, so no
    /// blank line is left behind.
    pub fn delete_lines(&mut self, start: usize, end: usize) -> Result<()> {
        let last = self.last_line();
        if start > end || end > last {
            return Err(ViewerError::InvalidRange { start, end });
        }

        self.marks.invalidate_lines(start, end);

        if start == 0 {
            if end == last {
                let to = self.end_pos();
                self.replace_range(Pos::new(0, 0), to, "")?;
                self.empty = true;
            } else {
                self.replace_range(Pos::new(0, 0), Pos::new(end + 1, 0), "")?;
            }
        } else {
            let from = Pos::new(start - 1, self.line_len(start - 1));
            let to = Pos::new(end, self.line_len(end));
            self.replace_range(from, to, "")?;
        }
        Ok(())
    }

    /// Keep only the first `keep` lines
    pub fn truncate_lines(&mut self, keep: usize) {
        let last = self.last_line();
        if keep > last {
            return;
        }
        let to = self.end_pos();
        self.marks.invalidate_lines(keep, last);
        let from = match keep {
            0 => Pos::new(0, 0),
            _ => Pos::new(keep - 1, self.line_len(keep - 1)),
        };
        if let Err(e) = self.replace_range(from, to, "") {
            warn!("truncate_lines({}): {}", keep, e);
            return;
        }
        if keep == 0 {
            self.empty = true;
        }
    }

    /// Remove up to `count` lines from the top, shrinking the scrollback
    /// region first. Returns the number of lines removed.
    pub fn delete_top_lines(&mut self, count: usize) -> usize {
        let count = count.min(self.line_count());
        if count == 0 {
            return 0;
        }
        let end = (count - 1).min(self.last_line());
        if let Err(e) = self.delete_lines(0, end) {
            warn!("delete_top_lines({}): {}", count, e);
            return 0;
        }
        self.terminal_first_row = self.terminal_first_row.saturating_sub(count);
        count
    }

    /// Drop all content, marks and decorations
    pub fn clear(&mut self) {
        self.lines.clear();
        self.lines.push(String::new());
        self.empty = true;
        self.terminal_first_row = 0;
        self.decorations.reset();
        self.marks.clear();
    }
}
