//! Decorated buffer renderer using crossterm
//!
//! Prints the viewer's lines with their style tags mapped to terminal
//! attributes and colors.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, ContentStyle, Print, PrintStyledContent, ResetColor, SetAttribute, StyledContent},
};

use crate::core::attr::{StyleTag, DEFAULT_BG, DEFAULT_FG};
use crate::core::decoration::Run;
use crate::core::marks::Pos;
use crate::viewer::TerminalViewer;

/// Color for an index of the 256-color palette. The default-color indices
/// only show up after inverse swapped them.
fn palette_color(index: u16) -> Color {
    match index {
        DEFAULT_BG => Color::Black,
        DEFAULT_FG => Color::Grey,
        n if n < 256 => Color::AnsiValue(n as u8),
        _ => Color::Reset,
    }
}

/// Terminal style for a set of tags
pub fn style_for_tags(tags: &[StyleTag]) -> ContentStyle {
    let mut style = ContentStyle::new();
    for tag in tags {
        match *tag {
            StyleTag::Bold => style.attributes.set(Attribute::Bold),
            StyleTag::Italic => style.attributes.set(Attribute::Italic),
            StyleTag::Underline => style.attributes.set(Attribute::Underlined),
            StyleTag::Strikethrough => style.attributes.set(Attribute::CrossedOut),
            StyleTag::Invisible => style.attributes.set(Attribute::Hidden),
            StyleTag::Blink => style.attributes.set(Attribute::SlowBlink),
            StyleTag::ReverseVideo | StyleTag::Cursor => style.attributes.set(Attribute::Reverse),
            StyleTag::Background(n) => style.background_color = Some(palette_color(n)),
            StyleTag::Foreground(n) => style.foreground_color = Some(palette_color(n)),
            StyleTag::Faint(n) => {
                style.attributes.set(Attribute::Dim);
                style.foreground_color = Some(palette_color(n));
            }
        }
    }
    style
}

/// A piece of a line with one style
#[derive(Debug, PartialEq)]
struct Segment {
    text: String,
    tags: Vec<StyleTag>,
    selected: bool,
}

/// Split a line at run and selection boundaries
fn segments(line: &str, runs: &[Run], selected: Option<(usize, usize)>) -> Vec<Segment> {
    let chars: Vec<char> = line.chars().collect();
    let mut cuts = vec![0, chars.len()];
    for run in runs {
        cuts.push(run.from_ch.min(chars.len()));
        cuts.push(run.to_ch.min(chars.len()));
    }
    if let Some((from, to)) = selected {
        cuts.push(from.min(chars.len()));
        cuts.push(to.min(chars.len()));
    }
    cuts.sort_unstable();
    cuts.dedup();

    cuts.windows(2)
        .map(|w| {
            let (from, to) = (w[0], w[1]);
            let tags = runs
                .iter()
                .find(|r| r.from_ch <= from && to <= r.to_ch)
                .map(|r| r.tags.to_vec())
                .unwrap_or_default();
            Segment {
                text: chars[from..to].iter().collect(),
                tags,
                selected: selected.map_or(false, |(s, e)| s <= from && to <= e),
            }
        })
        .collect()
}

/// Char range of `line` covered by the selection
fn selected_columns(line: usize, len: usize, selection: Option<(Pos, Pos)>) -> Option<(usize, usize)> {
    let (from, to) = selection?;
    if line < from.line || line > to.line {
        return None;
    }
    let start = if line == from.line { from.ch } else { 0 };
    // Include the line break
    let end = if line == to.line { to.ch } else { len + 1 };
    (start < end).then_some((start, end.min(len)))
}

/// Terminal renderer for a viewer's buffer
pub struct Renderer {
    /// Mark screen rows with a gutter
    pub gutter: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self { gutter: true }
    }

    /// Print every line of the buffer
    pub fn render<W: Write>(&self, out: &mut W, viewer: &TerminalViewer) -> io::Result<()> {
        let doc = viewer.document();
        let selection = viewer.selection_range();

        for n in 0..doc.line_count() {
            let text = doc.line(n).unwrap_or("");
            if self.gutter {
                let mark = if n >= doc.terminal_first_row { "│ " } else { "  " };
                queue!(out, Print(mark))?;
            }

            let selected = selected_columns(n, text.chars().count(), selection);
            for segment in segments(text, doc.decorations().runs(n), selected) {
                let mut style = style_for_tags(&segment.tags);
                if segment.selected {
                    // XOR: reversed text inside the selection shows plain
                    style.attributes.toggle(Attribute::Reverse);
                }
                queue!(out, PrintStyledContent(StyledContent::new(style, segment.text)))?;
            }

            if let Some(cursor) = viewer.visible_cursor().filter(|c| c.line == n) {
                if cursor.ch >= text.chars().count() {
                    let mut style = ContentStyle::new();
                    style.attributes.set(Attribute::Reverse);
                    queue!(out, PrintStyledContent(StyledContent::new(style, " ")))?;
                }
            }
            queue!(out, ResetColor, SetAttribute(Attribute::Reset), Print("\r\n"))?;
        }
        out.flush()
    }
}

/// Plain-text dump of a viewer, for logs and tests
pub struct DebugRenderer;

impl DebugRenderer {
    pub fn render(viewer: &TerminalViewer) -> String {
        let doc = viewer.document();
        let mut output = String::new();

        output.push_str(&format!(
            "=== {} lines, screen at {}, {:?} mode ===\n",
            doc.line_count(),
            doc.terminal_first_row,
            viewer.mode()
        ));
        for n in 0..doc.line_count() {
            let indicator = if n >= doc.terminal_first_row { '|' } else { ' ' };
            output.push(indicator);
            output.push_str(doc.line(n).unwrap_or(""));
            for run in doc.decorations().runs(n) {
                let names: Vec<String> = run.tags.iter().map(ToString::to_string).collect();
                output.push_str(&format!(" [{}..{} {}]", run.from_ch, run.to_ch, names.join(",")));
            }
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::Mode;
    use crate::viewer::DecoratedLines;
    use std::rc::Rc;

    fn run(from: usize, to: usize, tags: Vec<StyleTag>) -> Run {
        Run {
            from_ch: from,
            to_ch: to,
            tags: Rc::from(tags),
        }
    }

    #[test]
    fn test_style_for_tags() {
        let style = style_for_tags(&[StyleTag::Bold, StyleTag::Background(4), StyleTag::Foreground(9)]);
        assert!(style.attributes.has(Attribute::Bold));
        assert_eq!(style.background_color, Some(Color::AnsiValue(4)));
        assert_eq!(style.foreground_color, Some(Color::AnsiValue(9)));

        let faint = style_for_tags(&[StyleTag::Faint(2)]);
        assert!(faint.attributes.has(Attribute::Dim));
        assert_eq!(faint.foreground_color, Some(Color::AnsiValue(2)));

        let inverted = style_for_tags(&[StyleTag::Background(257), StyleTag::Foreground(256)]);
        assert_eq!(inverted.background_color, Some(Color::Grey));
        assert_eq!(inverted.foreground_color, Some(Color::Black));
    }

    #[test]
    fn test_segments_split_at_runs_and_selection() {
        let runs = vec![run(2, 5, vec![StyleTag::Underline])];
        let parts = segments("abcdefg", &runs, Some((4, 6)));
        let texts: Vec<&str> = parts.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "cd", "e", "f", "g"]);
        assert_eq!(parts[1].tags, vec![StyleTag::Underline]);
        assert!(parts[2].selected && !parts[2].tags.is_empty());
        assert!(parts[3].selected && parts[3].tags.is_empty());
        assert!(!parts[4].selected);
    }

    #[test]
    fn test_selected_columns() {
        let selection = Some((Pos::new(1, 2), Pos::new(3, 1)));
        assert_eq!(selected_columns(0, 5, selection), None);
        assert_eq!(selected_columns(1, 5, selection), Some((2, 5)));
        assert_eq!(selected_columns(2, 5, selection), Some((0, 5)));
        assert_eq!(selected_columns(3, 5, selection), Some((0, 1)));
        assert_eq!(selected_columns(1, 5, None), None);
    }

    #[test]
    fn test_debug_renderer() {
        let mut viewer = TerminalViewer::default();
        viewer
            .set_decorated_lines(&DecoratedLines {
                text: "old\nnew".to_string(),
                decorations: vec![crate::core::decoration::Decoration {
                    line: 1,
                    from_ch: 0,
                    to_ch: 3,
                    tags: Rc::from(vec![StyleTag::Bold, StyleTag::Foreground(1)]),
                }],
            })
            .unwrap();

        let dump = DebugRenderer::render(&viewer);
        assert_eq!(
            dump,
            "=== 2 lines, screen at 0, Default mode ===\n|old\n|new [0..3 bold,foreground-1]\n"
        );
    }

    #[test]
    fn test_render_writes_styled_text() {
        let mut viewer = TerminalViewer::default();
        viewer
            .set_decorated_lines(&DecoratedLines {
                text: "hello".to_string(),
                decorations: Vec::new(),
            })
            .unwrap();
        viewer.set_mode(Mode::Selection);

        let mut out = Vec::new();
        Renderer::new().render(&mut out, &viewer).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hello"));
        assert!(text.ends_with("\r\n"));
    }
}
