//! Render event processing
//!
//! Turns emulator render events into document edits: trimming on resize,
//! rewriting refreshed screen rows and appending scrollback above the screen.

use tracing::{debug, warn};

use super::attr::{AttrDecoder, CharAttr};
use super::cell::Line;
use super::decoration::Decoration;
use super::document::Document;
use super::emulator::{Emulator, RenderEvent};
use super::marks::Pos;

/// Convert one line of cells into text plus style runs.
///
/// Trailing unstyled spaces are dropped. Columns in the returned decorations
/// count chars of the returned text.
pub fn line_to_text_styles(
    line: &Line,
    line_number: usize,
    decoder: &mut AttrDecoder,
) -> (String, Vec<Decoration>) {
    let mut len = line.len();
    while len != 0 && line[len - 1].is_blank() {
        len -= 1;
    }

    let mut text = String::new();
    let mut decorations = Vec::new();
    let mut attr = CharAttr::DEFAULT;
    let mut open: Option<Decoration> = None;
    let mut ch = 0;

    for cell in &line[..len] {
        if cell.attr != attr {
            if let Some(mut run) = open.take() {
                run.to_ch = ch;
                if run.from_ch < run.to_ch {
                    decorations.push(run);
                }
            }
            if !cell.attr.is_default() {
                let decoded = decoder.decode(cell.attr);
                if !decoded.tags.is_empty() {
                    open = Some(Decoration {
                        line: line_number,
                        from_ch: ch,
                        to_ch: ch,
                        tags: decoded.tags,
                    });
                }
            }
            attr = cell.attr;
        }
        text.push_str(&cell.grapheme);
        ch += cell.grapheme.chars().count();
    }

    if let Some(mut run) = open {
        run.to_ch = ch;
        if run.from_ch < run.to_ch {
            decorations.push(run);
        }
    }

    (text, decorations)
}

/// Convert several lines; text is joined with `\n` and decorations are
/// numbered from 0.
pub fn lines_to_text_styles(lines: &[Line], decoder: &mut AttrDecoder) -> (String, Vec<Decoration>) {
    let mut all_text = String::new();
    let mut all_decorations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let (text, decorations) = line_to_text_styles(line, i, decoder);
        if i != 0 {
            all_text.push('\n');
        }
        all_text.push_str(&text);
        all_decorations.extend(decorations);
    }
    (all_text, all_decorations)
}

/// Applies render events to a document
#[derive(Debug, Default)]
pub struct RenderProcessor {
    rows: Option<usize>,
    columns: Option<usize>,
    realized_rows: Option<usize>,
}

impl RenderProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Option<usize> {
        self.rows
    }

    pub fn columns(&self) -> Option<usize> {
        self.columns
    }

    pub fn realized_rows(&self) -> Option<usize> {
        self.realized_rows
    }

    /// Forget the realized row count, e.g. after the screen was deleted
    pub fn reset_realized_rows(&mut self) {
        self.realized_rows = None;
    }

    /// Apply one event as a single batch. Returns true if the virtual height
    /// may have changed.
    pub fn apply(
        &mut self,
        doc: &mut Document,
        emulator: &dyn Emulator,
        decoder: &mut AttrDecoder,
        event: RenderEvent,
    ) -> bool {
        let mut resized = self.handle_size(doc, event.rows, event.columns, event.realized_rows);

        if let Some(range) = event.refresh {
            if range.start < range.end {
                let lines: Vec<Line> = range.clone().map(|row| emulator.line_at_row(row)).collect();
                refresh_screen(doc, range.start, &lines, decoder);

                let current = doc.raw_line_count().saturating_sub(doc.terminal_first_row);
                if self.realized_rows != Some(current) {
                    self.realized_rows = Some(current);
                    resized = true;
                }
            }
        }

        if !event.scrollback_lines.is_empty() {
            append_scrollback(doc, &event.scrollback_lines, decoder);
            resized = true;
        }

        resized
    }

    fn handle_size(&mut self, doc: &mut Document, rows: usize, columns: usize, realized_rows: usize) -> bool {
        if self.rows == Some(rows) && self.columns == Some(columns) {
            return false;
        }

        let first_row = doc.terminal_first_row;
        let screen_lines = doc.raw_line_count().saturating_sub(first_row);
        if screen_lines > realized_rows {
            debug!(
                "Trimming screen from {} to {} lines",
                screen_lines, realized_rows
            );
            doc.truncate_lines(first_row + realized_rows);
            self.realized_rows = Some(realized_rows);
        }

        debug!("Emulator size: {}x{}", columns, rows);
        self.rows = Some(rows);
        self.columns = Some(columns);
        true
    }
}

/// Rewrite screen rows `start_row..` with `lines`, one document line at a time
fn refresh_screen(doc: &mut Document, start_row: usize, lines: &[Line], decoder: &mut AttrDecoder) {
    let first_line = doc.terminal_first_row + start_row;
    let needed = first_line + lines.len();
    if doc.raw_line_count() < needed {
        doc.pad_lines(needed - doc.raw_line_count());
    }

    for (i, line) in lines.iter().enumerate() {
        let line_number = first_line + i;
        let (text, decorations) = line_to_text_styles(line, line_number, decoder);
        let end = Pos::new(line_number, doc.line_len(line_number));
        if let Err(e) = doc.replace_range(Pos::new(line_number, 0), end, &text) {
            warn!("Failed to refresh line {}: {}", line_number, e);
            continue;
        }
        for deco in &decorations {
            doc.decorate(deco);
        }
    }
    doc.mark_filled();
}

/// Insert scrolled-off lines just above the screen region
fn append_scrollback(doc: &mut Document, lines: &[Line], decoder: &mut AttrDecoder) {
    let first_row = doc.terminal_first_row;
    if doc.raw_line_count() <= first_row {
        doc.pad_lines(first_row + 1 - doc.raw_line_count());
    }

    let (mut text, decorations) = lines_to_text_styles(lines, decoder);
    text.push('\n');
    if let Err(e) = doc.insert(Pos::new(first_row, 0), &text) {
        warn!("Failed to append scrollback: {}", e);
        return;
    }
    for deco in &decorations {
        doc.decorate(&Decoration {
            line: deco.line + first_row,
            ..deco.clone()
        });
    }
    doc.terminal_first_row = first_row + lines.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attr::{AttrFlags, StyleTag};
    use crate::core::cell::{line_from_str, Cell};
    use crate::demo::DemoEmulator;

    fn plain(text: &str) -> Line {
        line_from_str(text, CharAttr::DEFAULT)
    }

    #[test]
    fn test_default_line_has_no_decorations() {
        let mut decoder = AttrDecoder::new();
        let mut line = plain("hello world");
        line.extend(std::iter::repeat(Cell::default()).take(5));

        let (text, decorations) = line_to_text_styles(&line, 0, &mut decoder);
        assert_eq!(text, "hello world");
        assert!(decorations.is_empty());
    }

    #[test]
    fn test_styled_trailing_spaces_are_kept() {
        let mut decoder = AttrDecoder::new();
        let bg = CharAttr::new(AttrFlags::empty(), 257, 4);
        let mut line = plain("ab");
        line.push(Cell::new(bg, ' '));
        line.push(Cell::default());

        let (text, decorations) = line_to_text_styles(&line, 3, &mut decoder);
        assert_eq!(text, "ab ");
        assert_eq!(decorations.len(), 1);
        assert_eq!((decorations[0].line, decorations[0].from_ch, decorations[0].to_ch), (3, 2, 3));
        assert_eq!(&*decorations[0].tags, &[StyleTag::Background(4)]);
    }

    #[test]
    fn test_runs_split_on_attribute_change() {
        let mut decoder = AttrDecoder::new();
        let bold = CharAttr::new(AttrFlags::BOLD, 1, 256);
        let under = CharAttr::new(AttrFlags::UNDERLINE, 257, 256);

        let mut line = plain("x");
        line.extend(line_from_str("bb", bold));
        line.extend(line_from_str("uuu", under));
        line.extend(plain("z"));

        let (text, decorations) = line_to_text_styles(&line, 0, &mut decoder);
        assert_eq!(text, "xbbuuuz");
        let spans: Vec<(usize, usize)> = decorations.iter().map(|d| (d.from_ch, d.to_ch)).collect();
        assert_eq!(spans, vec![(1, 3), (3, 6)]);
        assert_eq!(&*decorations[0].tags, &[StyleTag::Bold, StyleTag::Foreground(9)]);
    }

    #[test]
    fn test_run_closed_at_line_end() {
        let mut decoder = AttrDecoder::new();
        let line = vec![Cell::new(CharAttr::DEFAULT, 'a'), Cell::new(CharAttr::CURSOR, ' ')];

        let (text, decorations) = line_to_text_styles(&line, 0, &mut decoder);
        assert_eq!(text, "a ");
        assert_eq!((decorations[0].from_ch, decorations[0].to_ch), (1, 2));
        assert_eq!(&*decorations[0].tags, &[StyleTag::ReverseVideo, StyleTag::Cursor]);
    }

    #[test]
    fn test_wide_char_continuation_does_not_shift_columns() {
        let mut decoder = AttrDecoder::new();
        let red = CharAttr::new(AttrFlags::empty(), 1, 256);
        let line = vec![
            Cell::new(CharAttr::DEFAULT, '日'),
            Cell::continuation(CharAttr::DEFAULT),
            Cell::new(red, 'x'),
        ];

        let (text, decorations) = line_to_text_styles(&line, 0, &mut decoder);
        assert_eq!(text, "日x");
        assert_eq!((decorations[0].from_ch, decorations[0].to_ch), (1, 2));
    }

    #[test]
    fn test_lines_to_text_styles_numbers_lines() {
        let mut decoder = AttrDecoder::new();
        let bold = CharAttr::new(AttrFlags::BOLD, 257, 256);
        let lines = vec![plain("a"), line_from_str("b", bold)];

        let (text, decorations) = lines_to_text_styles(&lines, &mut decoder);
        assert_eq!(text, "a\nb");
        assert_eq!(decorations[0].line, 1);
    }

    #[test]
    fn test_full_screen_refresh() {
        let mut emulator = DemoEmulator::new(24, 80);
        for row in 0..24 {
            emulator.set_line(row, plain(&"A".repeat(80)));
        }
        let mut doc = Document::new();
        let mut decoder = AttrDecoder::new();
        let mut processor = RenderProcessor::new();

        let event = RenderEvent {
            rows: 24,
            columns: 80,
            realized_rows: 24,
            refresh: Some(0..24),
            scrollback_lines: Vec::new(),
        };
        assert!(processor.apply(&mut doc, &emulator, &mut decoder, event));

        assert_eq!(doc.line_count(), 24);
        for n in 0..24 {
            assert_eq!(doc.line(n), Some("A".repeat(80).as_str()));
        }
        assert!(doc.decorations().is_empty());
        assert_eq!(doc.terminal_first_row, 0);
        assert_eq!(processor.realized_rows(), Some(24));
    }

    #[test]
    fn test_scrollback_append() {
        let emulator = DemoEmulator::new(24, 80);
        let mut doc = Document::new();
        let mut decoder = AttrDecoder::new();
        let mut processor = RenderProcessor::new();

        let event = RenderEvent {
            rows: 24,
            columns: 80,
            realized_rows: 1,
            refresh: None,
            scrollback_lines: vec![plain("XXXXX"), plain("XXXXX"), plain("XXXXX")],
        };
        assert!(processor.apply(&mut doc, &emulator, &mut decoder, event));

        assert_eq!(doc.terminal_first_row, 3);
        for n in 0..3 {
            assert_eq!(doc.line(n), Some("XXXXX"));
        }
        assert_eq!(doc.line_count(), 4);
    }

    #[test]
    fn test_scrollback_decorations_are_offset() {
        let emulator = DemoEmulator::new(4, 10);
        let mut doc = Document::new();
        doc.insert(Pos::new(0, 0), "old\nscreen").unwrap();
        doc.terminal_first_row = 1;
        let mut decoder = AttrDecoder::new();
        let mut processor = RenderProcessor::new();

        let bold = CharAttr::new(AttrFlags::BOLD, 257, 256);
        let event = RenderEvent {
            rows: 4,
            columns: 10,
            realized_rows: 1,
            refresh: None,
            scrollback_lines: vec![line_from_str("new", bold)],
        };
        processor.apply(&mut doc, &emulator, &mut decoder, event);

        assert_eq!(doc.text(), "old\nnew\nscreen");
        assert_eq!(doc.terminal_first_row, 2);
        let found = doc.decorations().decorations(0, 3);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn test_resize_trims_extra_screen_lines() {
        let emulator = DemoEmulator::new(3, 10);
        let mut doc = Document::new();
        doc.insert(Pos::new(0, 0), "s\na\nb\nc\nd").unwrap();
        doc.terminal_first_row = 1;
        let mut decoder = AttrDecoder::new();
        let mut processor = RenderProcessor::new();

        let event = RenderEvent {
            rows: 2,
            columns: 10,
            realized_rows: 2,
            refresh: None,
            scrollback_lines: Vec::new(),
        };
        assert!(processor.apply(&mut doc, &emulator, &mut decoder, event.clone()));
        assert_eq!(doc.text(), "s\na\nb");
        assert_eq!(processor.realized_rows(), Some(2));

        // Same size again is not a resize
        assert!(!processor.apply(&mut doc, &emulator, &mut decoder, event));
    }

    #[test]
    fn test_resize_trim_drops_bookmarks_on_blank_rows() {
        use crate::core::bookmark::Bookmarks;

        let emulator = DemoEmulator::new(4, 10);
        let mut doc = Document::new();
        doc.insert(Pos::new(0, 0), "a\nb\n\n").unwrap();
        let mut decoder = AttrDecoder::new();
        let mut processor = RenderProcessor::new();
        let mut bookmarks = Bookmarks::new();
        let kept = bookmarks.bookmark_line(&mut doc, 1);
        let blank = bookmarks.bookmark_line(&mut doc, 2);
        let last = bookmarks.bookmark_line(&mut doc, 3);

        let event = RenderEvent {
            rows: 2,
            columns: 10,
            realized_rows: 2,
            refresh: None,
            scrollback_lines: Vec::new(),
        };
        assert!(processor.apply(&mut doc, &emulator, &mut decoder, event));
        assert_eq!(doc.text(), "a\nb");
        assert_eq!(bookmarks.resolve(&doc, kept), Some(1));
        assert_eq!(bookmarks.resolve(&doc, blank), None);
        assert_eq!(bookmarks.resolve(&doc, last), None);
    }

    #[test]
    fn test_refresh_keeps_bookmarks_on_screen_rows() {
        use crate::core::bookmark::Bookmarks;

        let mut emulator = DemoEmulator::new(3, 10);
        let mut doc = Document::new();
        let mut decoder = AttrDecoder::new();
        let mut processor = RenderProcessor::new();
        let mut bookmarks = Bookmarks::new();

        let event = RenderEvent {
            rows: 3,
            columns: 10,
            realized_rows: 3,
            refresh: Some(0..3),
            scrollback_lines: Vec::new(),
        };
        processor.apply(&mut doc, &emulator, &mut decoder, event.clone());
        let bookmark = bookmarks.bookmark_line(&mut doc, 1);

        emulator.set_line(1, plain("changed"));
        processor.apply(&mut doc, &emulator, &mut decoder, event);
        assert_eq!(doc.line(1), Some("changed"));
        assert_eq!(bookmarks.resolve(&doc, bookmark), Some(1));
    }
}
