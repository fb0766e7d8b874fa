//! Cells and lines as delivered by the emulator

use super::attr::CharAttr;

/// A single cell
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub attr: CharAttr,
    /// One grapheme. Empty for the right half of a wide character.
    pub grapheme: String,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            attr: CharAttr::DEFAULT,
            grapheme: " ".to_string(),
        }
    }
}

impl Cell {
    pub fn new(attr: CharAttr, ch: char) -> Self {
        Self {
            attr,
            grapheme: ch.to_string(),
        }
    }

    pub fn continuation(attr: CharAttr) -> Self {
        Self {
            attr,
            grapheme: String::new(),
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.grapheme.is_empty()
    }

    /// Default attribute and a plain space
    pub fn is_blank(&self) -> bool {
        self.attr.is_default() && self.grapheme == " "
    }
}

/// A row of cells
pub type Line = Vec<Cell>;

/// Build a line from text, every cell carrying the same attribute
pub fn line_from_str(text: &str, attr: CharAttr) -> Line {
    text.chars().map(|ch| Cell::new(attr, ch)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attr::AttrFlags;

    #[test]
    fn test_blank_cells() {
        assert!(Cell::default().is_blank());
        assert!(!Cell::new(CharAttr::DEFAULT, 'x').is_blank());
        assert!(!Cell::new(CharAttr::new(AttrFlags::BOLD, 1, 2), ' ').is_blank());
        assert!(Cell::continuation(CharAttr::DEFAULT).is_continuation());
    }

    #[test]
    fn test_line_from_str() {
        let line = line_from_str("ab", CharAttr::DEFAULT);
        assert_eq!(line.len(), 2);
        assert_eq!(line[1].grapheme, "b");
    }
}
