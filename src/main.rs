mod config;
mod daemon;
mod error;
mod models;
mod reporter;
mod tracker;


use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::settings::{Settings, split_list};
use crate::daemon::watch::Watcher;
use crate::models::window::DescriptorMode;
use crate::reporter::ActiveWindowReporter;
use crate::tracker::monitor::WindowMonitor;
use crate::tracker::parser::parse_descriptor;

const LOG_FILE: &str = "active-window.log";

/// A writer that flushes after every write so log lines show up immediately
struct FlushingWriter {
    inner: Arc<Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut std::fs::File) -> std::io::Result<T>) -> std::io::Result<T> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.with_file(|file| {
            let written = file.write(buf)?;
            file.flush()?;
            Ok(written)
        })
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

fn cli() -> Command {
    Command::new("active-window-reporter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Print a semicolon-delimited descriptor of the active window")
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Descriptor layout: full (<class>;<caption>;<pid>) or name-caption (<name>;<caption>)"),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .value_name("SOURCE")
                .help("Window source: auto, kwin, gnome, native or snapshot"),
        )
        .arg(
            Arg::new("snapshot")
                .long("snapshot")
                .value_name("PATH")
                .help("Read the window list from a JSON snapshot file ('-' for stdin)"),
        )
        .arg(
            Arg::new("watch")
                .long("watch")
                .help("Keep running and print a line whenever the active window changes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("poll-ms")
                .long("poll-ms")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
                .help("Polling interval in watch mode"),
        )
        .arg(
            Arg::new("accept-ms")
                .long("accept-ms")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
                .help("How long a new active window must stay focused before it is reported"),
        )
        .arg(
            Arg::new("ignore")
                .long("ignore")
                .value_name("CLASS")
                .action(ArgAction::Append)
                .help("Resource class or name to skip in watch mode (repeatable, comma-separated)"),
        )
        .arg(
            Arg::new("parse")
                .long("parse")
                .value_name("LINE")
                .conflicts_with("watch")
                .help("Parse a descriptor line and print its fields as JSON"),
        )
}

/// Applies command-line overrides on top of the environment settings.
fn apply_overrides(settings: &mut Settings, matches: &ArgMatches) -> Result<()> {
    if let Some(mode) = matches.get_one::<String>("mode") {
        settings.mode = mode.parse()?;
    }
    if let Some(source) = matches.get_one::<String>("source") {
        settings.source = source.parse()?;
    }
    if let Some(ms) = matches.get_one::<u64>("poll-ms") {
        settings.poll_interval = Duration::from_millis(*ms);
    }
    if let Some(ms) = matches.get_one::<u64>("accept-ms") {
        settings.accept_time = Duration::from_millis(*ms);
    }
    if let Some(values) = matches.get_many::<String>("ignore") {
        settings.ignore = values.flat_map(|v| split_list(v)).collect();
    }
    Ok(())
}

/// Rejects flag combinations that cannot work together.
fn check_watch_input(matches: &ArgMatches) -> Result<()> {
    let stdin_snapshot = matches
        .get_one::<String>("snapshot")
        .is_some_and(|path| path == "-");
    if matches.get_flag("watch") && stdin_snapshot {
        anyhow::bail!("--watch cannot read the snapshot from stdin; pass a file path to --snapshot");
    }
    Ok(())
}

fn init_logging(debug_enabled: bool) -> Result<()> {
    if debug_enabled {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)
            .with_context(|| format!("Failed to open {}", LOG_FILE))?;

        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("active_window_reporter=debug"),
        )
        .target(env_logger::Target::Pipe(Box::new(FlushingWriter::new(log_file))))
        .init();

        log::info!("=== DEBUG LOGGING ENABLED ===");
        log::info!("Writing logs to {}", LOG_FILE);
    } else {
        // Quiet by default; RUST_LOG still applies
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off"))
            .target(env_logger::Target::Stderr)
            .init();
    }
    Ok(())
}

fn print_parsed(line: &str, mode: DescriptorMode) -> Result<()> {
    let parsed = parse_descriptor(line, mode)?;
    println!("{}", serde_json::to_string(&parsed)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    check_watch_input(&matches)?;

    let mut settings = Settings::new()?;
    apply_overrides(&mut settings, &matches)?;
    init_logging(settings.debug_logs)?;
    log::debug!("Settings: {:?}", settings);

    if let Some(line) = matches.get_one::<String>("parse") {
        return print_parsed(line, settings.mode);
    }

    let snapshot_path = matches.get_one::<String>("snapshot").map(PathBuf::from);
    let monitor = WindowMonitor::new(settings.source, snapshot_path)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if matches.get_flag("watch") {
        let mut watcher = Watcher::new(monitor, &settings);
        return watcher.run(&mut out).await;
    }

    let snapshot = monitor
        .snapshot()
        .await
        .with_context(|| format!("Failed to read windows from {}", monitor.name()))?;
    let printed = ActiveWindowReporter::new(settings.mode).report(&snapshot, &mut out)?;
    log::info!("Reported {} active window(s)", printed);

    Ok(())
}
