//! romnav - Browse mounted folders for ROMs from the terminal.
//!
//! Usage:
//!   romnav --mount sd=DIR [--mount usb=DIR ...] [options]
//!
//! Examples:
//!   romnav --mount sd=~/roms                          # Interactive browser
//!   romnav --mount sd=~/roms --out /tmp/emu           # Write loaded images to /tmp/emu
//!   romnav --mount sd=~/roms --auto sd:/nes --name zelda   # Load the first match and exit
//!
//! Keys: Up/Down move, PageUp/PageDown page, Enter opens or loads,
//! Backspace goes up, q quits.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    queue,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use log::{debug, error, info, LevelFilter, Log, Metadata, Record};
use tokio::sync::mpsc as tokio_mpsc;

use romnav_core::entry::PAGE_SIZE;
use romnav_core::{
    Activation, Browser, BrowserError, BrowserOptions, DeviceId, LocalHost, NavState, Platform,
    SessionConfig,
};

/// Terminal ROM browser
#[derive(Parser, Debug)]
#[command(name = "romnav")]
#[command(about = "Browse storage devices for ROMs")]
struct Args {
    /// Serve a device from a host directory (e.g. sd=/media/card)
    #[arg(short, long = "mount", value_name = "DEV=DIR", value_parser = parse_mount)]
    mounts: Vec<(DeviceId, PathBuf)>,

    /// Session configuration file
    #[arg(short, long, default_value = "romnav.json")]
    config: PathBuf,

    /// Device family offered when no folder is open
    #[arg(long, value_enum, default_value_t = PlatformArg::SdUsb)]
    platform: PlatformArg,

    /// Extensions browsed as archive folders (default: 7z)
    #[arg(long = "archive-ext", value_name = "EXT")]
    archive_ext: Vec<String>,

    /// Directory loaded images are written to
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Folder to load from without browsing (e.g. sd:/nes)
    #[arg(long, requires = "name")]
    auto: Option<String>,

    /// Part of the file name to load with --auto
    #[arg(long, requires = "auto")]
    name: Option<String>,

    /// More log output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlatformArg {
    SdUsb,
    CardSlots,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::SdUsb => Platform::SdUsb,
            PlatformArg::CardSlots => Platform::CardSlots,
        }
    }
}

fn parse_mount(s: &str) -> Result<(DeviceId, PathBuf), String> {
    let (name, dir) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DEV=DIR, got {}", s))?;
    let device = DeviceId::from_name(name).ok_or_else(|| format!("unknown device: {}", name))?;
    Ok((device, PathBuf::from(dir)))
}

/// Log records to stderr. Lines end in CRLF so they stay readable in raw mode.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprint!("[{}] {}\r\n", record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

/// Browser commands read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Up,
    Down,
    PageUp,
    PageDown,
    Open,
    Back,
    Quit,
}

/// Translate crossterm key events to browser commands.
fn translate_key(code: KeyCode, modifiers: KeyModifiers) -> Option<Command> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }

    match code {
        KeyCode::Up | KeyCode::Char('k') => Some(Command::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Command::Down),
        KeyCode::PageUp => Some(Command::PageUp),
        KeyCode::PageDown => Some(Command::PageDown),
        KeyCode::Enter | KeyCode::Right => Some(Command::Open),
        KeyCode::Backspace | KeyCode::Left => Some(Command::Back),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

fn build_host(args: &Args) -> LocalHost {
    let mut host = LocalHost::new();
    for (device, dir) in &args.mounts {
        info!("Mounting {} at {}", device, dir.display());
        host.mount(*device, dir);
    }
    if let Some(out) = &args.out {
        host.set_output_dir(out);
    }
    host
}

fn build_options(args: &Args) -> BrowserOptions {
    let mut options = BrowserOptions {
        platform: args.platform.into(),
        ..BrowserOptions::default()
    };
    if !args.archive_ext.is_empty() {
        options.archive_extensions = args
            .archive_ext
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
    }
    options
}

/// Write the configuration back if the browser changed it.
fn persist(browser: &mut Browser<LocalHost>, path: &Path) {
    if browser.take_config_changed() {
        match browser.config().save(path) {
            Ok(()) => debug!("Saved {}", path.display()),
            Err(e) => error!("Failed to save {}: {}", path.display(), e),
        }
    }
}

fn render(browser: &Browser<LocalHost>, status: &str) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    let title = match browser.nav_state() {
        NavState::DeviceSelect => "Select a device".to_string(),
        _ => browser.current_directory().to_string(),
    };
    write!(out, "{}\r\n\r\n", title)?;

    let page = browser.page_index();
    let selected = browser.selected_index();
    let listing_devices = browser.nav_state() == NavState::DeviceSelect;
    for (i, entry) in browser.entries().iter().enumerate().skip(page).take(PAGE_SIZE) {
        let marker = if i == selected { '>' } else { ' ' };
        let suffix = if entry.is_directory && !entry.is_dot_entry() && !listing_devices {
            "/"
        } else {
            ""
        };
        write!(out, "{} {}{}\r\n", marker, entry.display_name, suffix)?;
    }
    if browser.entries().is_empty() {
        write!(out, "  (empty)\r\n")?;
    }

    write!(
        out,
        "\r\n{}/{}  {}\r\n",
        selected + 1,
        browser.entries().len(),
        status
    )?;
    out.flush()
}

/// Run one command. Returns false to quit.
fn handle(browser: &mut Browser<LocalHost>, command: Command, status: &mut String) -> bool {
    let result = match command {
        Command::Up => {
            browser.move_selection(-1);
            Ok(())
        }
        Command::Down => {
            browser.move_selection(1);
            Ok(())
        }
        Command::PageUp => {
            browser.move_selection(-(PAGE_SIZE as isize));
            Ok(())
        }
        Command::PageDown => {
            browser.move_selection(PAGE_SIZE as isize);
            Ok(())
        }
        Command::Back => browser.go_up().map(|_| ()),
        Command::Open => match browser.activate() {
            Ok(Activation::Loaded(rom)) => {
                *status = format!("Loaded {} ({} bytes)", rom.name, rom.size);
                // Back to the folder the ROM came from.
                browser.open_game_list();
                Ok(())
            }
            Ok(Activation::Listed(_)) => Ok(()),
            Err(e) => Err(e),
        },
        Command::Quit => return false,
    };

    if let Err(e) = result {
        *status = e.to_string();
    }
    if let Some(message) = browser.host_mut().take_status() {
        *status = message;
    }
    true
}

fn run_interactive(
    mut browser: Browser<LocalHost>,
    key_rx: mpsc::Receiver<Command>,
    config_path: PathBuf,
) -> std::io::Result<()> {
    let mut status = String::new();
    browser.open_game_list();
    persist(&mut browser, &config_path);
    if let Some(message) = browser.host_mut().take_status() {
        status = message;
    }
    render(&browser, &status)?;

    while let Ok(command) = key_rx.recv() {
        status.clear();
        let running = handle(&mut browser, command, &mut status);
        persist(&mut browser, &config_path);
        if !running {
            break;
        }
        render(&browser, &status)?;
    }
    Ok(())
}

fn run_auto(
    mut browser: Browser<LocalHost>,
    path: &str,
    name: &str,
    config_path: &Path,
) -> Result<(), BrowserError> {
    let result = browser.auto_load(path, name);
    persist(&mut browser, config_path);
    let rom = result?;
    eprintln!("Loaded {} ({} bytes)", rom.name, rom.size);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.mounts.is_empty() {
        eprintln!("No devices mounted (use --mount sd=DIR)");
        return Err("Nothing to browse".into());
    }

    let config = match SessionConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read {}: {}", args.config.display(), e);
            return Err(e.into());
        }
    };
    let browser = Browser::new(build_host(&args), build_options(&args), config);
    let config_path = args.config.clone();

    if let (Some(path), Some(name)) = (args.auto.clone(), args.name.clone()) {
        let result = tokio::task::spawn_blocking(move || {
            run_auto(browser, &path, &name, &config_path)
        })
        .await?;
        return result.map_err(Into::into);
    }

    // Create channel for browser commands
    let (key_tx, key_rx) = mpsc::channel::<Command>();

    // Create shutdown signal
    let (shutdown_tx, mut shutdown_rx) = tokio_mpsc::channel::<()>(1);

    // Enable raw mode (gracefully handle non-TTY)
    let raw_mode_enabled = enable_raw_mode().is_ok();

    // Run the browser in a blocking task
    let browser_handle =
        tokio::task::spawn_blocking(move || run_interactive(browser, key_rx, config_path));

    // Spawn terminal input reader
    let input_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    break;
                }
                _ = tokio::time::sleep(Duration::from_millis(10)) => {
                    if event::poll(Duration::from_millis(0)).unwrap_or(false) {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            if key_event.kind != KeyEventKind::Press {
                                continue;
                            }
                            let command = translate_key(key_event.code, key_event.modifiers);
                            if let Some(command) = command {
                                if key_tx.send(command).is_err() {
                                    break; // Browser finished
                                }
                            }
                        }
                    }
                }
            }
        }
    });

    // Wait for the browser to finish
    let result = browser_handle.await?;

    // Signal input handler to stop
    let _ = shutdown_tx.send(()).await;
    let _ = input_handle.await;

    if raw_mode_enabled {
        let _ = disable_raw_mode();
    }

    if let Err(e) = result {
        eprintln!("\nError: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mount() {
        let (device, dir) = parse_mount("usb=/media/stick").unwrap();
        assert_eq!(device, DeviceId::Usb);
        assert_eq!(dir, PathBuf::from("/media/stick"));

        assert_eq!(parse_mount("sd:=/tmp").unwrap().0, DeviceId::Sd);
        assert!(parse_mount("floppy=/tmp").is_err());
        assert!(parse_mount("/tmp").is_err());
    }

    #[test]
    fn test_translate_key() {
        assert_eq!(translate_key(KeyCode::Enter, KeyModifiers::NONE), Some(Command::Open));
        assert_eq!(translate_key(KeyCode::Backspace, KeyModifiers::NONE), Some(Command::Back));
        assert_eq!(
            translate_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Command::Quit)
        );
        assert_eq!(translate_key(KeyCode::Char('x'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_build_options() {
        let args = Args::parse_from([
            "romnav",
            "--mount",
            "sd=/tmp",
            "--platform",
            "card-slots",
            "--archive-ext",
            ".RAR",
        ]);
        let options = build_options(&args);
        assert_eq!(options.platform, Platform::CardSlots);
        assert_eq!(options.archive_extensions, vec!["rar".to_string()]);
        assert_eq!(args.mounts, vec![(DeviceId::Sd, PathBuf::from("/tmp"))]);
    }
}
