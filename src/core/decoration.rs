//! Decoration index
//!
//! Style runs are stored per line, in the same line order as the document,
//! and are carried along by every document splice.

use super::attr::StyleTags;
use super::marks::Splice;

/// A styled char range on one line of the document
#[derive(Clone, Debug, PartialEq)]
pub struct Decoration {
    pub line: usize,
    pub from_ch: usize,
    /// Exclusive
    pub to_ch: usize,
    pub tags: StyleTags,
}

/// A decoration without its line number, as stored in the index
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub from_ch: usize,
    pub to_ch: usize,
    pub tags: StyleTags,
}

impl Run {
    fn clipped(&self, from_ch: usize, to_ch: usize) -> Option<Run> {
        let from_ch = self.from_ch.max(from_ch);
        let to_ch = self.to_ch.min(to_ch);
        (from_ch < to_ch).then(|| Run {
            from_ch,
            to_ch,
            tags: self.tags.clone(),
        })
    }

    fn shifted(mut self, removed: usize, added: usize) -> Run {
        self.from_ch = self.from_ch - removed + added;
        self.to_ch = self.to_ch - removed + added;
        self
    }
}

#[derive(Debug)]
pub struct DecorationIndex {
    lines: Vec<Vec<Run>>,
}

impl Default for DecorationIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationIndex {
    pub fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
        }
    }

    /// Number of lines tracked; always equal to the document's line count
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn runs(&self, line: usize) -> &[Run] {
        self.lines.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of runs
    pub fn len(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Vec::is_empty)
    }

    /// Attach a decoration. Anything previously styled in the same range is
    /// replaced so runs on a line never overlap. Returns false for an empty
    /// range or a line outside the index.
    pub fn add(&mut self, deco: &Decoration) -> bool {
        if deco.from_ch >= deco.to_ch {
            return false;
        }
        let Some(runs) = self.lines.get_mut(deco.line) else {
            return false;
        };

        let mut kept: Vec<Run> = Vec::with_capacity(runs.len() + 1);
        for run in runs.drain(..) {
            if run.to_ch <= deco.from_ch || run.from_ch >= deco.to_ch {
                kept.push(run);
                continue;
            }
            kept.extend(run.clipped(0, deco.from_ch));
            kept.extend(run.clipped(deco.to_ch, usize::MAX));
        }
        let at = kept.partition_point(|r| r.from_ch < deco.from_ch);
        kept.insert(
            at,
            Run {
                from_ch: deco.from_ch,
                to_ch: deco.to_ch,
                tags: deco.tags.clone(),
            },
        );
        *runs = kept;
        true
    }

    /// Decorations on lines `start..end`, ordered by line then column
    pub fn decorations(&self, start: usize, end: usize) -> Vec<Decoration> {
        let end = end.min(self.lines.len());
        if start >= end {
            return Vec::new();
        }
        self.lines[start..end]
            .iter()
            .enumerate()
            .flat_map(|(offset, runs)| {
                runs.iter().map(move |r| Decoration {
                    line: start + offset,
                    from_ch: r.from_ch,
                    to_ch: r.to_ch,
                    tags: r.tags.clone(),
                })
            })
            .collect()
    }

    /// Carry the runs through a document replace. Inserted text is unstyled.
    pub fn splice(&mut self, splice: &Splice) {
        let first = splice.from.line;
        let last = splice.to.line.min(self.lines.len().saturating_sub(1));
        let end_ch = splice.end().ch;

        let head: Vec<Run> = self.lines[first]
            .iter()
            .filter_map(|r| r.clipped(0, splice.from.ch))
            .collect();
        let tail: Vec<Run> = self.lines[last]
            .iter()
            .filter_map(|r| r.clipped(splice.to.ch, usize::MAX))
            .map(|r| r.shifted(splice.to.ch, end_ch))
            .collect();

        let replacement: Vec<Vec<Run>> = if splice.inserted.len() <= 1 {
            let mut line = head;
            line.extend(tail);
            vec![line]
        } else {
            let mut lines = Vec::with_capacity(splice.inserted.len());
            lines.push(head);
            lines.extend((0..splice.inserted.len() - 2).map(|_| Vec::new()));
            lines.push(tail);
            lines
        };

        self.lines.splice(first..=last, replacement);
    }

    /// Back to a single undecorated line
    pub fn reset(&mut self) {
        self.lines.clear();
        self.lines.push(Vec::new());
    }
}
