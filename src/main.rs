//! termview - terminal output viewer demo
//!
//! Drives a [`TerminalViewer`] with a scripted emulator and prints the
//! resulting decorated buffer: scrollback above, the live screen below.
//!
//! # Quick Start
//!
//! ```text
//! termview                 # Default 12x60 screen
//! termview --rows 6        # Smaller screen, more scrollback
//! termview --select        # Also enter selection mode and select a line
//! ```

use std::cell::RefCell;
use std::env;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use termview::config::ViewerConfig;
use termview::core::attr::{AttrFlags, CharAttr};
use termview::core::bookmark::LineRef;
use termview::core::cell::{line_from_str, Line};
use termview::core::emulator::Emulator;
use termview::core::mode::Mode;
use termview::core::scroll::{FixedMetrics, SetterState, VirtualScrollable};
use termview::demo::DemoEmulator;
use termview::ui::{DebugRenderer, Renderer};
use termview::viewer::{AttachContext, TerminalViewer, ViewerEvent, ViewerHost};

/// Command line options
#[derive(Debug, Default)]
struct Args {
    rows: Option<usize>,
    columns: Option<usize>,
    config: Option<PathBuf>,
    select: bool,
    verbose: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    eprintln!("termview {} - terminal output viewer demo", VERSION);
    eprintln!();
    eprintln!("Usage: termview [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rows <N>            Screen rows (default from config)");
    eprintln!("  --cols <N>            Screen columns (default from config)");
    eprintln!("  --config <PATH>       Config file (default ~/.termview/config.toml)");
    eprintln!("  --select              Enter selection mode and select a line");
    eprintln!("  -v, --verbose         Debug logging and a plain dump of the buffer");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Log file: ~/.termview/termview.log");
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--rows" => parsed.rows = Some(parse_number(&arg, args.next())?),
            "--cols" => parsed.columns = Some(parse_number(&arg, args.next())?),
            "--config" => {
                let path = args.next().ok_or_else(|| "Missing argument for --config".to_string())?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--select" => parsed.select = true,
            "-v" | "--verbose" => parsed.verbose = true,
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
    }
    Ok(parsed)
}

fn parse_number(flag: &str, value: Option<String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("Missing argument for {}", flag))?;
    match value.parse::<usize>() {
        Ok(n) if n >= 2 => Ok(n),
        _ => Err(format!("Invalid value for {}: {}", flag, value)),
    }
}

fn init_logging(level: &str) {
    let log_path = ViewerConfig::config_dir()
        .map(|dir| dir.join("termview.log"))
        .unwrap_or_else(|| PathBuf::from("termview.log"));

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Host that logs notifications and keeps typed text
#[derive(Clone, Default)]
struct DemoHost {
    typed: Rc<RefCell<String>>,
}

impl ViewerHost for DemoHost {
    fn notify(&mut self, event: ViewerEvent) {
        debug!("Viewer event: {:?}", event);
        if let ViewerEvent::TypeText(text) = event {
            self.typed.borrow_mut().push_str(&text);
        }
    }
}

fn styled(parts: &[(&str, CharAttr)]) -> Line {
    parts
        .iter()
        .flat_map(|(text, attr)| line_from_str(text, *attr))
        .collect()
}

/// Write one line at the bottom of the screen, scrolling when full
fn print_line(emulator: &Rc<RefCell<DemoEmulator>>, row: &mut usize, line: Line) {
    let mut emu = emulator.borrow_mut();
    let rows = emu.dimensions().rows;
    if *row >= rows {
        emu.scroll_up(1);
        *row = rows - 1;
    }
    emu.set_line(*row, line);
    emu.set_cursor(0, (*row + 1).min(rows - 1));
    *row += 1;
}

fn run_script(viewer: &mut TerminalViewer, emulator: &Rc<RefCell<DemoEmulator>>) {
    let plain = CharAttr::DEFAULT;
    let prompt = CharAttr::new(AttrFlags::BOLD, 2, 256);
    let dir = CharAttr::new(AttrFlags::empty(), 4, 256);
    let error = CharAttr::new(AttrFlags::BOLD | AttrFlags::UNDERLINE, 1, 256);
    let faint = CharAttr::new(AttrFlags::FAINT, 7, 256);
    let banner = CharAttr::new(AttrFlags::INVERSE, 257, 256);
    let fancy = CharAttr::new(AttrFlags::ITALIC | AttrFlags::STRIKETHROUGH | AttrFlags::BLINK, 257, 3);
    let hidden = CharAttr::new(AttrFlags::INVISIBLE, 257, 256);

    let mut row = 0;
    print_line(emulator, &mut row, styled(&[(" termview demo ", banner)]));
    print_line(emulator, &mut row, styled(&[("$ ", prompt), ("ls --color", plain)]));
    emulator.borrow_mut().flush();
    viewer.pump_render_events();
    let command = viewer.bookmark_line(viewer.terminal_first_row() + row - 1);

    for i in 0..20 {
        let name = format!("dir{:02}/", i);
        print_line(emulator, &mut row, styled(&[(&name, dir), ("  file.txt", plain)]));
        if i % 4 == 3 {
            emulator.borrow_mut().flush();
            viewer.pump_render_events();
        }
    }
    print_line(emulator, &mut row, styled(&[("ls: cannot open 'secret'", error)]));
    print_line(emulator, &mut row, styled(&[("(took 3ms)", faint), ("password", hidden)]));
    print_line(emulator, &mut row, styled(&[("old", fancy), (" news", plain)]));
    print_line(emulator, &mut row, styled(&[("$ ", prompt), (" ", CharAttr::CURSOR)]));
    emulator.borrow_mut().flush();
    viewer.pump_render_events();

    match viewer.resolve_bookmark(command) {
        Some(line) => info!("Command line is now at buffer line {}", line),
        None => info!("Command line was deleted"),
    }
    if let Ok(block) = viewer.get_decorated_lines(LineRef::Bookmark(command)) {
        debug!(
            "Command output: {} lines, {} decorations",
            block.text.lines().count(),
            block.decorations.len()
        );
    }
}

/// Select the line above the cursor and type it back
fn run_selection(viewer: &mut TerminalViewer) {
    viewer.set_mode(Mode::Selection);
    let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
    let home = KeyEvent::new(KeyCode::Home, KeyModifiers::NONE);
    let select_end = KeyEvent::new(KeyCode::End, KeyModifiers::SHIFT);
    for event in [up, home, select_end] {
        viewer.key_down(&event);
    }
    viewer.tick();
    if let Some(position) = viewer.cursor_position() {
        debug!("Cursor at {:?}", position);
    }
    viewer.type_selection(false);
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_from(path),
        None => ViewerConfig::load(),
    };
    if let Some(rows) = args.rows {
        config.demo.rows = rows;
    }
    if let Some(columns) = args.columns {
        config.demo.columns = columns;
    }

    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    init_logging(level);
    info!("termview {} starting...", VERSION);

    let mut viewer = TerminalViewer::new(&config);
    let emulator = Rc::new(RefCell::new(DemoEmulator::new(2, 2)));
    let host = DemoHost::default();
    let (width, height) = config.container_size();

    viewer.set_emulator(Some(Box::new(emulator.clone())));
    viewer.attach(AttachContext {
        host: Box::new(host.clone()),
        metrics: Box::new(FixedMetrics {
            line_height: config.font.line_height_px,
            char_width: config.font.char_width_px,
        }),
        container_width: width,
        container_height: height,
    });
    viewer.animation_frame();
    viewer.set_dimensions_and_scroll(&SetterState {
        height,
        y_offset: 0,
        container_height: height,
    });
    viewer.command_line = Some("ls --color".to_string());

    run_script(&mut viewer, &emulator);
    let scroll_bottom = viewer.virtual_height(height);
    viewer.scroll_to(scroll_bottom);

    if args.select {
        run_selection(&mut viewer);
    }
    viewer.tick();

    let mut stdout = io::stdout();
    println!(
        "{}: {} lines, {} of scrollback",
        viewer.title(),
        viewer.line_count(),
        viewer.terminal_first_row()
    );
    Renderer::new()
        .render(&mut stdout, &viewer)
        .context("Failed to render buffer")?;

    if args.select {
        println!("Selected: {:?}", host.typed.borrow());
    }
    if args.verbose {
        print!("{}", DebugRenderer::render(&viewer));
    }

    viewer.detach();
    info!("termview exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--rows", "6", "--cols", "40", "--select", "-v"]).unwrap();
        assert_eq!(parsed.rows, Some(6));
        assert_eq!(parsed.columns, Some(40));
        assert!(parsed.select);
        assert!(parsed.verbose);
        assert!(parsed.config.is_none());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["--rows"]).is_err());
        assert!(args(&["--rows", "1"]).is_err());
        assert!(args(&["--cols", "wide"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }

    #[test]
    fn test_script_builds_scrollback() {
        let mut config = ViewerConfig::default();
        config.demo.rows = 6;
        config.demo.columns = 30;
        let (width, height) = config.container_size();

        let mut viewer = TerminalViewer::new(&config);
        let emulator = Rc::new(RefCell::new(DemoEmulator::new(2, 2)));
        viewer.set_emulator(Some(Box::new(emulator.clone())));
        viewer.attach(AttachContext {
            host: Box::new(DemoHost::default()),
            metrics: Box::new(FixedMetrics {
                line_height: config.font.line_height_px,
                char_width: config.font.char_width_px,
            }),
            container_width: width,
            container_height: height,
        });
        assert!(viewer.animation_frame());

        run_script(&mut viewer, &emulator);
        assert_eq!(viewer.line_count() - viewer.terminal_first_row(), 6);
        assert_eq!(viewer.terminal_first_row(), 20);
        assert_eq!(viewer.document().line(1), Some("$ ls --color"));
    }
}
