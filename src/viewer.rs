//! Terminal viewer
//!
//! Ties the buffer model to its collaborators: the emulator feeding render
//! events, the font metrics used for pixel geometry, and the host receiving
//! notifications. Everything runs on one thread. Render events arrive over
//! an mpsc channel and are applied when [`TerminalViewer::pump_render_events`]
//! is called; work that has to wait a turn is queued and run by
//! [`TerminalViewer::tick`].

use std::sync::mpsc::{self, Receiver};

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use tracing::{debug, info, trace, warn};
use unicode_width::UnicodeWidthChar;

use crate::config::ViewerConfig;
use crate::core::attr::AttrDecoder;
use crate::core::bookmark::{BookmarkRef, Bookmarks, LineRef};
use crate::core::decoration::Decoration;
use crate::core::document::Document;
use crate::core::emulator::{Emulator, MouseEventOptions, RenderEvent, TermSize};
use crate::core::marks::Pos;
use crate::core::mode::{Edge, Mode, ModeState};
use crate::core::render::RenderProcessor;
use crate::core::scroll::{box_to_term_size, FontMetrics, Margins, ScrollState, SetterState, VirtualScrollable};
use crate::error::{Result, ViewerError};

const DEFAULT_TITLE: &str = "Terminal Command";

/// Notifications sent to the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The virtual height may have changed
    VirtualResize,
    BeforeSelectionChange { origin_mouse: bool },
    CursorMove,
    /// A vertical cursor movement ran into the top or bottom of the buffer
    CursorEdge { edge: Edge, ch: usize },
    KeyboardActivity,
    /// Text to be typed into the terminal
    TypeText(String),
    /// The viewer asks the host to switch its mode
    SetMode(Mode),
    UnhandledKey(KeyEvent),
}

/// Receiver of viewer notifications
pub trait ViewerHost {
    fn notify(&mut self, event: ViewerEvent);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisualState {
    /// Follow keyboard focus
    #[default]
    Auto,
    Focused,
    Unfocused,
}

/// Collaborators bound by [`TerminalViewer::attach`]
pub struct AttachContext {
    pub host: Box<dyn ViewerHost>,
    pub metrics: Box<dyn FontMetrics>,
    pub container_width: usize,
    pub container_height: usize,
}

/// Pixel box of the cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorPosition {
    pub left: usize,
    pub top: usize,
    pub bottom: usize,
    pub viewport_top: usize,
}

/// Text and style runs of a block of lines. Decoration lines are relative
/// to the first line of the block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecoratedLines {
    pub text: String,
    pub decorations: Vec<Decoration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    CursorEdge { edge: Edge, ch: usize },
    VirtualResize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MouseAction {
    Down,
    Up,
    Move,
}

pub struct TerminalViewer {
    doc: Document,
    bookmarks: Bookmarks,
    decoder: AttrDecoder,
    processor: RenderProcessor,
    mode: ModeState,
    scroll: ScrollState,
    margins: Margins,

    emulator: Option<Box<dyn Emulator>>,
    render_events: Option<Receiver<RenderEvent>>,
    host: Option<Box<dyn ViewerHost>>,
    metrics: Option<Box<dyn FontMetrics>>,
    container_size: (usize, usize),

    /// Waiting for the font metrics to settle
    font_poll_active: bool,
    deferred: Vec<Deferred>,
    /// Visible line count last seen in SELECTION mode
    viewport_lines: usize,

    has_focus: bool,
    visual_state: VisualState,
    pub command_line: Option<String>,
    pub return_code: Option<i32>,
}

impl Default for TerminalViewer {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

impl TerminalViewer {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            doc: Document::new(),
            bookmarks: Bookmarks::new(),
            decoder: AttrDecoder::new(),
            processor: RenderProcessor::new(),
            mode: ModeState::new(config.editable),
            scroll: ScrollState::new(config.use_vpad),
            margins: Margins {
                left: config.margins.left_px,
                right: config.margins.right_px,
            },
            emulator: None,
            render_events: None,
            host: None,
            metrics: None,
            container_size: (0, 0),
            font_poll_active: false,
            deferred: Vec::new(),
            viewport_lines: 0,
            has_focus: false,
            visual_state: VisualState::Auto,
            command_line: None,
            return_code: None,
        }
    }

    /// Reset the buffer and all derived state. Attached collaborators stay.
    pub fn init(&mut self) {
        self.doc.clear();
        self.bookmarks.clear();
        self.decoder.clear();
        self.processor = RenderProcessor::new();
        self.mode = ModeState::new(self.mode.editable());
        self.scroll = ScrollState::new(self.scroll.use_vpad());
        self.deferred.clear();
        self.viewport_lines = 0;
        self.command_line = None;
        self.return_code = None;
    }

    /// Bind the host, font metrics and container size. Starts polling the
    /// font metrics on each animation frame.
    pub fn attach(&mut self, context: AttachContext) {
        self.host = Some(context.host);
        self.metrics = Some(context.metrics);
        self.container_size = (context.container_width, context.container_height);
        self.font_poll_active = true;
        self.mode.hide_cursor();
        debug!(
            "Attached to container {}x{}",
            context.container_width, context.container_height
        );
    }

    /// Release everything bound by `attach` and the emulator listener
    pub fn detach(&mut self) {
        self.font_poll_active = false;
        self.deferred.clear();
        if let Some(mut emulator) = self.emulator.take() {
            emulator.remove_render_listener();
        }
        self.render_events = None;
        self.host = None;
        self.metrics = None;
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn line_count(&self) -> usize {
        self.doc.line_count()
    }

    pub fn terminal_first_row(&self) -> usize {
        self.doc.terminal_first_row
    }

    fn notify(&mut self, event: ViewerEvent) {
        match self.host.as_mut() {
            Some(host) => host.notify(event),
            None => trace!("No host for {:?}", event),
        }
    }

    fn line_height(&self) -> Option<usize> {
        self.metrics.as_ref().and_then(|m| m.line_height())
    }

    fn char_width(&self) -> Option<usize> {
        self.metrics.as_ref().and_then(|m| m.char_width())
    }

    // Emulator wiring

    /// Replace the emulator. The old one loses its render listener.
    pub fn set_emulator(&mut self, emulator: Option<Box<dyn Emulator>>) {
        if let Some(mut old) = self.emulator.take() {
            old.remove_render_listener();
        }
        self.render_events = None;

        if let Some(mut emulator) = emulator {
            let (tx, rx) = mpsc::channel();
            emulator.add_render_listener(tx);
            self.render_events = Some(rx);
            self.emulator = Some(emulator);
        }
    }

    pub fn has_emulator(&self) -> bool {
        self.emulator.is_some()
    }

    pub fn emulator_mut(&mut self) -> Option<&mut (dyn Emulator + 'static)> {
        self.emulator.as_deref_mut()
    }

    /// Apply every pending render event. Returns how many were applied.
    pub fn pump_render_events(&mut self) -> usize {
        let pending: Vec<RenderEvent> = match &self.render_events {
            Some(rx) => rx.try_iter().collect(),
            None => return 0,
        };
        let count = pending.len();
        for event in pending {
            if let Err(e) = self.handle_render_event(event) {
                warn!("Dropped render event: {}", e);
            }
        }
        count
    }

    /// Apply one render event as a single batch, then notify the host
    pub fn handle_render_event(&mut self, event: RenderEvent) -> Result<()> {
        let Some(emulator) = self.emulator.as_deref() else {
            return Err(ViewerError::NoEmulator);
        };
        let resized = self
            .processor
            .apply(&mut self.doc, emulator, &mut self.decoder, event);
        self.mode.clip(&self.doc);
        self.after_change(resized);
        Ok(())
    }

    fn after_change(&mut self, resized: bool) {
        let virtual_height = self.virtual_height(self.scroll.height());
        let reserve = self.reserve_viewport_height(self.scroll.height());
        let top = self.scroll.scroll_top();
        self.scroll.scroll_to(top, virtual_height, reserve);

        if resized {
            self.notify(ViewerEvent::VirtualResize);
        }
        if self.mode.mode() == Mode::Selection {
            self.check_viewport();
        }
    }

    /// Queue a virtual-resize if the number of visible lines changed
    fn check_viewport(&mut self) {
        let capacity = self.line_height().map_or(0, |lh| self.scroll.visible_lines(lh));
        let visible = self.doc.line_count().min(capacity);
        if visible != self.viewport_lines {
            self.viewport_lines = visible;
            self.deferred.push(Deferred::VirtualResize);
        }
    }

    // Scheduling

    /// Run work queued for the next tick
    pub fn tick(&mut self) {
        for work in std::mem::take(&mut self.deferred) {
            match work {
                Deferred::CursorEdge { edge, ch } => self.notify(ViewerEvent::CursorEdge { edge, ch }),
                Deferred::VirtualResize => self.notify(ViewerEvent::VirtualResize),
            }
        }
    }

    /// Poll the font metrics. Once they settle the emulator is sized to the
    /// container, exactly once. Returns true on that frame.
    pub fn animation_frame(&mut self) -> bool {
        if !self.font_poll_active || self.line_height().is_none() || self.char_width().is_none() {
            return false;
        }
        self.font_poll_active = false;

        let (width, height) = self.container_size;
        let size = self.resize_to_box(width, height);
        info!("Font ready, terminal size {}x{}", size.columns, size.rows);
        self.notify(ViewerEvent::VirtualResize);
        true
    }

    /// Resize the emulator to fit a pixel box. Returns the current size
    /// unchanged while the font metrics have not settled.
    pub fn resize_to_box(&mut self, width: usize, height: usize) -> TermSize {
        let current = match self.emulator.as_deref() {
            Some(emulator) => emulator.size(),
            None => TermSize {
                rows: self.processor.rows().unwrap_or(0),
                columns: self.processor.columns().unwrap_or(0),
            },
        };
        let (Some(line_height), Some(char_width)) = (self.line_height(), self.char_width()) else {
            return current;
        };

        let size = box_to_term_size(width, height, line_height, char_width, self.margins);
        if size != current {
            debug!(
                "resize_to_box: {}x{} -> {}x{}",
                current.columns, current.rows, size.columns, size.rows
            );
            if let Some(emulator) = self.emulator.as_mut() {
                emulator.resize(size);
            }
        }
        size
    }

    // Buffer operations

    /// Delete whole lines from the top covering `pixels`. Returns the number
    /// of lines removed.
    pub fn delete_top_pixels(&mut self, pixels: usize) -> usize {
        let Some(line_height) = self.line_height().filter(|lh| *lh != 0) else {
            warn!("delete_top_pixels called before font metrics are known");
            return 0;
        };
        let removed = self.doc.delete_top_lines(pixels / line_height);
        self.mode.clip(&self.doc);
        self.notify(ViewerEvent::VirtualResize);
        removed
    }

    /// Delete lines `start..=end`; without `end` to the end of the buffer
    pub fn delete_lines(&mut self, start: LineRef, end: Option<LineRef>) -> Result<()> {
        let start_line = self.bookmarks.resolve_line(&self.doc, start);
        let end_line = match end {
            Some(end) => self.bookmarks.resolve_line(&self.doc, end),
            None => Some(self.doc.last_line()),
        };
        let (Some(start_line), Some(end_line)) = (start_line, end_line) else {
            warn!(
                "Invalid arguments to delete_lines. Resolved start={:?}, end={:?}",
                start_line, end_line
            );
            return Err(ViewerError::UnresolvedLine(format!("{:?}..{:?}", start, end)));
        };

        if let Err(e) = self.doc.delete_lines(start_line, end_line) {
            warn!("Invalid arguments to delete_lines: {}", e);
            return Err(e);
        }

        let first_row = self.doc.terminal_first_row;
        let above_screen = (end_line + 1).min(first_row).saturating_sub(start_line);
        self.doc.terminal_first_row = first_row - above_screen;

        self.mode.clip(&self.doc);
        self.notify(ViewerEvent::VirtualResize);
        Ok(())
    }

    /// Delete the screen region, keeping the scrollback
    pub fn delete_screen(&mut self) {
        self.processor.reset_realized_rows();
        if self.doc.is_empty() {
            return;
        }
        let first_row = self.doc.terminal_first_row;
        let last = self.doc.last_line();
        if first_row <= last {
            if let Err(e) = self.doc.delete_lines(first_row, last) {
                warn!("delete_screen: {}", e);
            }
            self.mode.clip(&self.doc);
        }
    }

    /// Text and decorations from `start` to the end of the buffer
    pub fn get_decorated_lines(&self, start: LineRef) -> Result<DecoratedLines> {
        let Some(start_line) = self.bookmarks.resolve_line(&self.doc, start) else {
            warn!("get_decorated_lines: unresolved line {:?}", start);
            return Err(ViewerError::UnresolvedLine(format!("{:?}", start)));
        };

        let text = self
            .doc
            .text_range(Pos::new(start_line, 0), self.doc.end_pos())?;
        let decorations = self
            .doc
            .decorations()
            .decorations(start_line, self.doc.raw_line_count())
            .into_iter()
            .map(|d| Decoration {
                line: d.line - start_line,
                ..d
            })
            .collect();
        Ok(DecoratedLines { text, decorations })
    }

    /// Insert decorated text at the top of the buffer
    pub fn set_decorated_lines(&mut self, lines: &DecoratedLines) -> Result<()> {
        self.doc.insert(Pos::new(0, 0), &lines.text)?;
        for deco in &lines.decorations {
            if !self.doc.decorate(deco) {
                debug!("Skipped decoration outside the text: {:?}", deco);
            }
        }
        self.doc.mark_filled();
        self.mode.clip(&self.doc);
        self.notify(ViewerEvent::VirtualResize);
        Ok(())
    }

    pub fn bookmark_line(&mut self, line: usize) -> BookmarkRef {
        self.bookmarks.bookmark_line(&mut self.doc, line)
    }

    pub fn resolve_bookmark(&self, bookmark: BookmarkRef) -> Option<usize> {
        self.bookmarks.resolve(&self.doc, bookmark)
    }

    pub fn release_bookmark(&mut self, bookmark: BookmarkRef) -> bool {
        self.bookmarks.release(&mut self.doc, bookmark)
    }

    // Mode and properties

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode.mode() {
            return;
        }
        match mode {
            Mode::Selection => {
                let cursor = self.emulator_cursor();
                self.mode.enter_selection(cursor);
                self.viewport_lines = self.visible_line_count();
                debug!("Entered selection mode at {:?}", cursor);
            }
            Mode::Default => {
                self.mode.exit_selection();
                debug!("Left selection mode");
            }
        }
    }

    fn visible_line_count(&self) -> usize {
        let capacity = self.line_height().map_or(0, |lh| self.scroll.visible_lines(lh));
        self.doc.line_count().min(capacity)
    }

    /// Emulator cursor in buffer coordinates, or the start of the last line
    fn emulator_cursor(&self) -> Pos {
        match self.emulator.as_deref() {
            Some(emulator) => {
                let dims = emulator.dimensions();
                let line = dims.cursor_y + self.doc.terminal_first_row;
                let ch = cell_to_char(self.doc.line(line).unwrap_or(""), dims.cursor_x);
                self.doc.clip(Pos::new(line, ch))
            }
            None => Pos::new(self.doc.last_line(), 0),
        }
    }

    pub fn editable(&self) -> bool {
        self.mode.editable()
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.mode.set_editable(editable);
    }

    pub fn read_only(&self) -> bool {
        self.mode.read_only()
    }

    pub fn cursor_visible(&self) -> bool {
        self.mode.cursor_visible()
    }

    pub fn use_vpad(&self) -> bool {
        self.scroll.use_vpad()
    }

    pub fn set_use_vpad(&mut self, use_vpad: bool) {
        self.scroll.set_use_vpad(use_vpad);
    }

    pub fn visual_state(&self) -> VisualState {
        self.visual_state
    }

    pub fn set_visual_state(&mut self, state: VisualState) {
        self.visual_state = state;
    }

    /// Whether the viewer should be drawn as focused
    pub fn shows_focused(&self) -> bool {
        match self.visual_state {
            VisualState::Auto => self.has_focus,
            VisualState::Focused => true,
            VisualState::Unfocused => false,
        }
    }

    pub fn title(&self) -> &str {
        self.command_line.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn focus(&mut self) {
        self.has_focus = true;
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.focus();
        }
    }

    pub fn blur(&mut self) {
        self.has_focus = false;
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.blur();
        }
    }

    // Selection

    pub fn selection_text(&self) -> String {
        if !self.mode.has_selection() {
            return String::new();
        }
        let (from, to) = self.mode.selection_range();
        self.doc
            .text_range(self.doc.clip(from), self.doc.clip(to))
            .unwrap_or_default()
    }

    /// Selection bounds in document order, if anything is selected
    pub fn selection_range(&self) -> Option<(Pos, Pos)> {
        self.mode.has_selection().then(|| self.mode.selection_range())
    }

    /// Cursor position while the cursor is shown
    pub fn visible_cursor(&self) -> Option<Pos> {
        self.mode.cursor_visible().then(|| self.doc.clip(self.mode.head()))
    }

    pub fn clear_selection(&mut self) {
        self.mode.collapse();
    }

    pub fn set_cursor_position_top(&mut self, ch: usize) -> bool {
        let pos = self.doc.clip(Pos::new(0, ch));
        self.mode.set_cursor(pos, false);
        true
    }

    pub fn set_cursor_position_bottom(&mut self, ch: usize) -> bool {
        let pos = self.doc.clip(Pos::new(self.doc.last_line(), ch));
        self.mode.set_cursor(pos, false);
        true
    }

    /// Pixel box of the cursor, `None` until font metrics are known
    pub fn cursor_position(&self) -> Option<CursorPosition> {
        let line_height = self.line_height()?;
        let char_width = self.char_width()?;
        let head = self.doc.clip(self.mode.head());
        let cells = char_to_cell(self.doc.line(head.line).unwrap_or(""), head.ch);
        let top = head.line * line_height;
        Some(CursorPosition {
            left: self.margins.left + cells * char_width,
            top,
            bottom: top + line_height,
            viewport_top: self.scroll.scroll_top(),
        })
    }

    /// Send the selection to the host as typed text. With `execute` a
    /// newline is added and the host is asked to return to DEFAULT mode.
    pub fn type_selection(&mut self, execute: bool) -> bool {
        let text = self.selection_text();
        if text.is_empty() {
            return false;
        }
        if execute {
            self.notify(ViewerEvent::SetMode(Mode::Default));
            self.notify(ViewerEvent::TypeText(text + "\n"));
        } else {
            self.notify(ViewerEvent::TypeText(text));
        }
        true
    }

    /// Editor-initiated scroll, clamped to the scroll range
    pub fn scroll_to(&mut self, y: usize) -> usize {
        let virtual_height = self.virtual_height(self.scroll.height());
        let reserve = self.reserve_viewport_height(self.scroll.height());
        self.scroll.scroll_to(y, virtual_height, reserve)
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll.scroll_top()
    }

    // Keyboard

    /// Route a key-down. Returns true if the viewer or the emulator handled it.
    pub fn key_down(&mut self, event: &KeyEvent) -> bool {
        if event.kind == KeyEventKind::Release {
            return false;
        }
        if is_host_key(event) {
            self.notify(ViewerEvent::UnhandledKey(*event));
            return false;
        }

        match self.mode.mode() {
            Mode::Default => {
                let consumed = match self.emulator.as_mut() {
                    Some(emulator) => emulator.key_down(event),
                    None => false,
                };
                if consumed {
                    self.notify(ViewerEvent::KeyboardActivity);
                } else {
                    self.notify(ViewerEvent::UnhandledKey(*event));
                }
                consumed
            }
            Mode::Selection => {
                let handled = self.selection_key(event);
                if !handled {
                    self.notify(ViewerEvent::UnhandledKey(*event));
                }
                handled
            }
        }
    }

    /// Route a key-press. Only DEFAULT mode forwards to the emulator.
    pub fn key_press(&mut self, event: &KeyEvent) {
        if self.mode.mode() != Mode::Default {
            return;
        }
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.key_press(event);
        }
        self.notify(ViewerEvent::KeyboardActivity);
    }

    fn selection_key(&mut self, event: &KeyEvent) -> bool {
        let extend = event.modifiers.contains(KeyModifiers::SHIFT);
        match event.code {
            KeyCode::Left
            | KeyCode::Right
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Home
            | KeyCode::End
            | KeyCode::PageUp
            | KeyCode::PageDown => {
                self.navigate(event.code, extend);
                true
            }
            _ if self.mode.read_only() => false,
            KeyCode::Char(c) if !event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit(|mode, doc| mode.insert_text(doc, c.encode_utf8(&mut [0; 4])).map(|_| true))
            }
            KeyCode::Enter => self.edit(|mode, doc| mode.insert_text(doc, "\n").map(|_| true)),
            KeyCode::Backspace => self.edit(|mode, doc| mode.delete_backward(doc)),
            KeyCode::Delete => self.edit(|mode, doc| mode.delete_forward(doc)),
            _ => false,
        }
    }

    fn navigate(&mut self, code: KeyCode, extend: bool) {
        let head = self.mode.head();
        let anchor = self.mode.anchor();
        let page = self
            .line_height()
            .map_or(0, |lh| self.scroll.visible_lines(lh))
            .max(1);

        if extend {
            self.notify(ViewerEvent::BeforeSelectionChange { origin_mouse: false });
        }
        let doc = &self.doc;
        let moved = match code {
            KeyCode::Left => self.mode.move_left(doc, extend),
            KeyCode::Right => self.mode.move_right(doc, extend),
            KeyCode::Up => self.mode.move_up(doc, 1, extend),
            KeyCode::Down => self.mode.move_down(doc, 1, extend),
            KeyCode::PageUp => self.mode.move_up(doc, page, extend),
            KeyCode::PageDown => self.mode.move_down(doc, page, extend),
            KeyCode::Home => self.mode.line_start(doc, extend),
            KeyCode::End => self.mode.line_end(doc, extend),
            _ => false,
        };

        let edge = match code {
            KeyCode::Up | KeyCode::PageUp => Some(Edge::Top),
            KeyCode::Down | KeyCode::PageDown => Some(Edge::Bottom),
            _ => None,
        };
        if let Some(edge) = edge {
            let collapsed = head == anchor && !self.mode.has_selection();
            if collapsed && self.mode.head().line == head.line {
                self.deferred.push(Deferred::CursorEdge { edge, ch: anchor.ch });
            }
        }

        if moved {
            self.notify(ViewerEvent::CursorMove);
        }
    }

    fn edit<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut ModeState, &mut Document) -> Result<bool>,
    {
        match f(&mut self.mode, &mut self.doc) {
            Ok(changed) => {
                if changed {
                    self.notify(ViewerEvent::CursorMove);
                    self.check_viewport();
                }
                true
            }
            Err(e) => {
                warn!("Edit failed: {}", e);
                false
            }
        }
    }

    // Mouse

    pub fn mouse_down(&mut self, event: &MouseEvent) -> bool {
        if !self.has_focus {
            self.focus();
        }
        self.route_mouse(event, MouseAction::Down)
    }

    pub fn mouse_up(&mut self, event: &MouseEvent) -> bool {
        self.route_mouse(event, MouseAction::Up)
    }

    pub fn mouse_move(&mut self, event: &MouseEvent) -> bool {
        self.route_mouse(event, MouseAction::Move)
    }

    /// Dispatch a crossterm mouse event by kind
    pub fn handle_mouse(&mut self, event: &MouseEvent) -> bool {
        match event.kind {
            MouseEventKind::Down(_) => self.mouse_down(event),
            MouseEventKind::Up(_) => self.mouse_up(event),
            MouseEventKind::Drag(_) | MouseEventKind::Moved => self.mouse_move(event),
            _ => false,
        }
    }

    fn route_mouse(&mut self, event: &MouseEvent, action: MouseAction) -> bool {
        // Ctrl keeps the mouse away from the application
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        let line = self.mouse_line(event.row as usize);

        if let Some(emulator) = self.emulator.as_mut() {
            let button = match event.kind {
                MouseEventKind::Down(b) | MouseEventKind::Up(b) | MouseEventKind::Drag(b) => Some(b),
                _ => None,
            };
            let options = MouseEventOptions {
                left_button: button == Some(MouseButton::Left),
                middle_button: button == Some(MouseButton::Middle),
                right_button: button == Some(MouseButton::Right),
                ctrl_key: false,
                shift_key: event.modifiers.contains(KeyModifiers::SHIFT),
                meta_key: event.modifiers.contains(KeyModifiers::META),
                row: line as i64 - self.doc.terminal_first_row as i64,
                column: event.column as usize,
            };
            let consumed = match action {
                MouseAction::Down => emulator.mouse_down(&options),
                MouseAction::Up => emulator.mouse_up(&options),
                MouseAction::Move => emulator.mouse_move(&options),
            };
            if consumed {
                return true;
            }
        }

        if self.mode.mode() != Mode::Selection {
            return false;
        }
        let ch = cell_to_char(self.doc.line(line).unwrap_or(""), event.column as usize);
        let pos = self.doc.clip(Pos::new(line, ch));
        let extend = match (action, event.kind) {
            (MouseAction::Down, MouseEventKind::Down(MouseButton::Left)) => {
                event.modifiers.contains(KeyModifiers::SHIFT)
            }
            (MouseAction::Move, MouseEventKind::Drag(MouseButton::Left)) => true,
            _ => return false,
        };
        if extend {
            self.notify(ViewerEvent::BeforeSelectionChange { origin_mouse: true });
        }
        self.mode.set_cursor(pos, extend);
        self.notify(ViewerEvent::CursorMove);
        true
    }

    /// Buffer line under a viewport row
    fn mouse_line(&self, row: usize) -> usize {
        let first_visible = match self.line_height() {
            Some(lh) if lh != 0 => self.scroll.scroll_top() / lh,
            _ => 0,
        };
        (first_visible + row).min(self.doc.last_line())
    }
}

impl VirtualScrollable for TerminalViewer {
    fn virtual_height(&self, _container_height: usize) -> usize {
        if self.doc.is_empty() {
            return 0;
        }
        self.doc.line_count() * self.line_height().unwrap_or(0)
    }

    fn reserve_viewport_height(&self, container_height: usize) -> usize {
        self.scroll
            .reserve_viewport_height(container_height, self.line_height().unwrap_or(0))
    }

    fn set_dimensions_and_scroll(&mut self, state: &SetterState) {
        let line_height = self.line_height().unwrap_or(0);
        let virtual_height = self.virtual_height(state.container_height);
        if self.scroll.apply(state, virtual_height, line_height) && self.mode.mode() == Mode::Selection {
            self.check_viewport();
        }
    }

    fn height(&self) -> usize {
        self.scroll.height()
    }
}

impl Drop for TerminalViewer {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Keys the host always sees first
fn is_host_key(event: &KeyEvent) -> bool {
    if event.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::META) {
        return true;
    }
    let ctrl_shift = KeyModifiers::CONTROL | KeyModifiers::SHIFT;
    event.modifiers.contains(ctrl_shift) && matches!(event.code, KeyCode::Char(c) if c.is_ascii_alphabetic())
}

/// Char index of the character covering cell `column`
fn cell_to_char(text: &str, column: usize) -> usize {
    let mut cells = 0;
    for (i, c) in text.chars().enumerate() {
        let width = c.width().unwrap_or(0);
        if cells + width > column {
            return i;
        }
        cells += width;
    }
    text.chars().count()
}

/// Cell column where char `ch` starts
fn char_to_cell(text: &str, ch: usize) -> usize {
    text.chars().take(ch).map(|c| c.width().unwrap_or(0)).sum()
}
