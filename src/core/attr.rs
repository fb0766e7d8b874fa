//! Cell attribute words and their decoding into style tags
//!
//! An attribute word packs the background index into bits 0-8, the
//! foreground index into bits 9-17 and the flag bits above that. A reserved
//! word marks the cell under the terminal cursor.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

/// Foreground index meaning "no explicit foreground"
pub const DEFAULT_FG: u16 = 257;

/// Background index meaning "no explicit background"
pub const DEFAULT_BG: u16 = 256;

const COLOR_MASK: u32 = 0x1ff;
const FG_SHIFT: u32 = 9;
const FLAGS_SHIFT: u32 = 18;

bitflags! {
    /// Flag bits stored above the colour fields of an attribute word
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0001;
        const UNDERLINE     = 0b0000_0010;
        const BLINK         = 0b0000_0100;
        const INVERSE       = 0b0000_1000;
        const INVISIBLE     = 0b0001_0000;
        const ITALIC        = 0b0010_0000;
        const STRIKETHROUGH = 0b0100_0000;
        const FAINT         = 0b1000_0000;
    }
}

/// Packed attribute word attached to every cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CharAttr(pub u32);

impl CharAttr {
    /// Default colours, no flags
    pub const DEFAULT: CharAttr = CharAttr(((DEFAULT_FG as u32) << FG_SHIFT) | DEFAULT_BG as u32);

    /// Sentinel for the cell under the cursor
    pub const CURSOR: CharAttr = CharAttr(u32::MAX);

    pub fn new(flags: AttrFlags, fg: u16, bg: u16) -> Self {
        CharAttr(
            ((flags.bits() as u32) << FLAGS_SHIFT)
                | ((fg as u32 & COLOR_MASK) << FG_SHIFT)
                | (bg as u32 & COLOR_MASK),
        )
    }

    pub fn fg(self) -> u16 {
        ((self.0 >> FG_SHIFT) & COLOR_MASK) as u16
    }

    pub fn bg(self) -> u16 {
        (self.0 & COLOR_MASK) as u16
    }

    pub fn flags(self) -> AttrFlags {
        AttrFlags::from_bits_truncate((self.0 >> FLAGS_SHIFT) as u16)
    }

    pub fn is_cursor(self) -> bool {
        self == Self::CURSOR
    }

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

impl Default for CharAttr {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One entry of the style vocabulary understood by renderers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleTag {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Invisible,
    Blink,
    ReverseVideo,
    Cursor,
    Background(u16),
    Foreground(u16),
    Faint(u16),
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleTag::Bold => f.write_str("bold"),
            StyleTag::Italic => f.write_str("italic"),
            StyleTag::Underline => f.write_str("underline"),
            StyleTag::Strikethrough => f.write_str("strikethrough"),
            StyleTag::Invisible => f.write_str("invisible"),
            StyleTag::Blink => f.write_str("blink"),
            StyleTag::ReverseVideo => f.write_str("reverse-video"),
            StyleTag::Cursor => f.write_str("cursor"),
            StyleTag::Background(n) => write!(f, "background-{}", n),
            StyleTag::Foreground(n) => write!(f, "foreground-{}", n),
            StyleTag::Faint(n) => write!(f, "faint-{}", n),
        }
    }
}

/// Shared, ordered tag set. Runs with the same attribute share one allocation.
pub type StyleTags = Rc<[StyleTag]>;

/// Result of decoding one attribute word
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub tags: StyleTags,
    pub is_cursor: bool,
}

/// Decode an attribute word into its style tags.
///
/// Bold promotes a low foreground to its bright variant before the inverse
/// swap, and promotes again after the swap if the new foreground is still
/// low. Both steps are kept as-is; colour output depends on them.
pub fn decode(attr: CharAttr) -> Decoded {
    if attr.is_cursor() {
        return Decoded {
            tags: Rc::from(vec![StyleTag::ReverseVideo, StyleTag::Cursor]),
            is_cursor: true,
        };
    }
    if attr.is_default() {
        return Decoded {
            tags: Rc::from(Vec::new()),
            is_cursor: false,
        };
    }

    let flags = attr.flags();
    let mut fg = attr.fg();
    let mut bg = attr.bg();
    let mut tags = Vec::with_capacity(4);

    let bold = flags.contains(AttrFlags::BOLD);
    if bold {
        tags.push(StyleTag::Bold);
        if fg < 8 {
            fg += 8;
        }
    }

    if flags.contains(AttrFlags::ITALIC) {
        tags.push(StyleTag::Italic);
    }
    if flags.contains(AttrFlags::UNDERLINE) {
        tags.push(StyleTag::Underline);
    }
    if flags.contains(AttrFlags::STRIKETHROUGH) {
        tags.push(StyleTag::Strikethrough);
    }
    if flags.contains(AttrFlags::INVISIBLE) {
        tags.push(StyleTag::Invisible);
    }
    if flags.contains(AttrFlags::BLINK) {
        tags.push(StyleTag::Blink);
    }

    if flags.contains(AttrFlags::INVERSE) {
        std::mem::swap(&mut fg, &mut bg);
        if bold && fg < 8 {
            fg += 8;
        }
    }

    if bg != DEFAULT_BG {
        tags.push(StyleTag::Background(bg));
    }

    if flags.contains(AttrFlags::FAINT) {
        tags.push(StyleTag::Faint(fg));
    } else if fg != DEFAULT_FG {
        tags.push(StyleTag::Foreground(fg));
    }

    Decoded {
        tags: Rc::from(tags),
        is_cursor: false,
    }
}

/// Memoizing front end for [`decode`].
///
/// Terminal screens reuse a handful of attribute combinations, so each
/// distinct word is decoded once.
#[derive(Debug, Default)]
pub struct AttrDecoder {
    cache: HashMap<CharAttr, Decoded>,
}

impl AttrDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, attr: CharAttr) -> Decoded {
        self.cache.entry(attr).or_insert_with(|| decode(attr)).clone()
    }

    /// Number of distinct words decoded so far
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
