use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time;

use crate::config::settings::Settings;
use crate::models::window::{DescriptorMode, WindowSnapshot};
use crate::reporter::ActiveWindowReporter;
use crate::tracker::monitor::WindowMonitor;
use crate::tracker::parser::parse_descriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A new descriptor was accepted and should be printed.
    Changed(String),
    /// The previously reported window is gone and nothing replaced it.
    Lost,
}

/// Debounces descriptor changes: a new value is accepted only once it has
/// been observed unchanged for `accept_time`.
#[derive(Debug)]
pub struct ChangeTracker {
    accept_time: Duration,
    pending: Option<String>,
    stable_for: Duration,
    reported: Option<String>,
}

impl ChangeTracker {
    pub fn new(accept_time: Duration) -> Self {
        Self {
            accept_time,
            pending: None,
            stable_for: Duration::ZERO,
            reported: None,
        }
    }

    #[cfg(test)]
    pub fn reported(&self) -> Option<&str> {
        self.reported.as_deref()
    }

    /// Feeds one poll result; `step` is the time since the previous poll.
    ///
    /// Losing the active window is reported on the first empty poll, only
    /// new descriptors wait out `accept_time`.
    pub fn observe(&mut self, current: Option<String>, step: Duration) -> Option<WatchEvent> {
        if current.is_none() {
            self.pending = None;
            self.stable_for = Duration::ZERO;
            return self.reported.take().map(|_| WatchEvent::Lost);
        }

        if current != self.pending {
            self.pending = current;
            self.stable_for = Duration::ZERO;
        } else {
            self.stable_for = self.stable_for.saturating_add(step);
        }

        if self.stable_for < self.accept_time || self.pending == self.reported {
            return None;
        }

        self.reported = self.pending.clone();
        self.reported.clone().map(WatchEvent::Changed)
    }
}

pub struct Watcher {
    monitor: WindowMonitor,
    reporter: ActiveWindowReporter,
    poll_interval: Duration,
    ignore: Vec<String>,
    tracker: ChangeTracker,
}

impl Watcher {
    pub fn new(monitor: WindowMonitor, settings: &Settings) -> Self {
        Self {
            monitor,
            reporter: ActiveWindowReporter::new(settings.mode),
            poll_interval: settings.poll_interval,
            ignore: settings.ignore.clone(),
            tracker: ChangeTracker::new(settings.accept_time),
        }
    }

    pub async fn run<W: Write>(&mut self, out: &mut W) -> Result<()> {
        log::info!(
            "Watching active window via {} (poll {:?}, accept {:?})",
            self.monitor.name(),
            self.poll_interval,
            self.tracker.accept_time
        );

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown_flag))?;
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown_flag))?;

        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                log::info!("Received shutdown signal, exiting...");
                break;
            }

            if let Err(e) = self.poll_once(out).await {
                log::warn!("Failed retrieving active window: {:#}", e);
            }

            time::sleep(self.poll_interval).await;
        }

        Ok(())
    }

    /// Takes one snapshot, prints the descriptor if an accepted change
    /// happened, and returns that change.
    pub async fn poll_once<W: Write>(&mut self, out: &mut W) -> Result<Option<WatchEvent>> {
        let snapshot = self.monitor.snapshot().await?;

        if self.is_ignored(&snapshot) {
            log::debug!("Active window is on the ignore list, keeping previous report");
            return Ok(None);
        }

        let lines = self.reporter.describe(&snapshot);
        let current = if lines.is_empty() { None } else { Some(lines.join("\n")) };

        let event = self.tracker.observe(current, self.poll_interval);
        match &event {
            Some(WatchEvent::Changed(descriptor)) => {
                self.log_change(descriptor);
                writeln!(out, "{}", descriptor)?;
                out.flush()?;
            }
            Some(WatchEvent::Lost) => log::info!("No active window"),
            None => {}
        }
        Ok(event)
    }

    fn is_ignored(&self, snapshot: &WindowSnapshot) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        snapshot.active_windows().any(|window| {
            [window.class(), window.name()]
                .into_iter()
                .flatten()
                .any(|value| self.ignore.iter().any(|ignored| ignored.eq_ignore_ascii_case(value)))
        })
    }

    fn log_change(&self, descriptor: &str) {
        let mode = self.reporter.mode();
        for line in descriptor.lines() {
            match parse_descriptor(line, mode) {
                Ok(parsed) if mode == DescriptorMode::Full => log::info!(
                    "Active app changed: \"{}\" (key \"{}\"), title: \"{}\", pid: {:?}",
                    parsed.app_name,
                    parsed.app_key(),
                    parsed.title,
                    parsed.pid
                ),
                Ok(parsed) => log::info!(
                    "Active app changed: \"{}\" (key \"{}\"), title: \"{}\"",
                    parsed.app_name,
                    parsed.app_key(),
                    parsed.title
                ),
                Err(e) => log::debug!("Could not read back descriptor: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::snapshot::SnapshotSource;
    use std::path::PathBuf;

    const STEP: Duration = Duration::from_millis(100);

    #[test]
    fn test_tracker_accepts_after_stable_period() {
        let mut tracker = ChangeTracker::new(Duration::from_millis(300));
        let firefox = Some("firefox;Page;42".to_string());

        assert_eq!(tracker.observe(firefox.clone(), STEP), None);
        assert_eq!(tracker.observe(firefox.clone(), STEP), None);
        assert_eq!(tracker.observe(firefox.clone(), STEP), None);
        assert_eq!(
            tracker.observe(firefox.clone(), STEP),
            Some(WatchEvent::Changed("firefox;Page;42".to_string()))
        );
        // Reported once per change
        assert_eq!(tracker.observe(firefox, STEP), None);
        assert_eq!(tracker.reported(), Some("firefox;Page;42"));
    }

    #[test]
    fn test_tracker_ignores_flicker() {
        let mut tracker = ChangeTracker::new(Duration::from_millis(200));
        let a = Some("a;;1".to_string());
        let b = Some("b;;2".to_string());

        tracker.observe(a.clone(), STEP);
        tracker.observe(a.clone(), STEP);
        assert!(tracker.observe(a.clone(), STEP).is_some());

        // b shows up for a single poll only
        assert_eq!(tracker.observe(b, STEP), None);
        assert_eq!(tracker.observe(a.clone(), STEP), None);
        assert_eq!(tracker.observe(a.clone(), STEP), None);
        assert_eq!(tracker.observe(a, STEP), None);
        assert_eq!(tracker.reported(), Some("a;;1"));
    }

    #[test]
    fn test_tracker_zero_accept_time_is_immediate() {
        let mut tracker = ChangeTracker::new(Duration::ZERO);
        assert_eq!(
            tracker.observe(Some("term;bash".to_string()), STEP),
            Some(WatchEvent::Changed("term;bash".to_string()))
        );
        assert_eq!(tracker.observe(None, STEP), Some(WatchEvent::Lost));
        assert_eq!(tracker.observe(None, STEP), None);
    }

    #[test]
    fn test_tracker_lost_skips_accept_time() {
        let mut tracker = ChangeTracker::new(Duration::from_millis(300));
        let kate = Some("kate;notes;5".to_string());

        for _ in 0..3 {
            tracker.observe(kate.clone(), STEP);
        }
        assert!(tracker.observe(kate.clone(), STEP).is_some());

        assert_eq!(tracker.observe(None, STEP), Some(WatchEvent::Lost));
        assert_eq!(tracker.reported(), None);
        assert_eq!(tracker.observe(None, STEP), None);

        // Coming back is debounced like any other change
        assert_eq!(tracker.observe(kate.clone(), STEP), None);
        assert_eq!(tracker.observe(kate.clone(), STEP), None);
        assert_eq!(tracker.observe(kate.clone(), STEP), None);
        assert_eq!(
            tracker.observe(kate, STEP),
            Some(WatchEvent::Changed("kate;notes;5".to_string()))
        );
    }

    #[test]
    fn test_tracker_no_lost_before_first_report() {
        let mut tracker = ChangeTracker::new(Duration::ZERO);
        assert_eq!(tracker.observe(None, STEP), None);
        assert_eq!(tracker.observe(None, STEP), None);
    }

    fn temp_snapshot(name: &str, json: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("awr-watch-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, json).unwrap();
        path
    }

    fn watcher_for(path: &PathBuf, ignore: Vec<String>) -> Watcher {
        let settings = Settings {
            accept_time: Duration::ZERO,
            ignore,
            ..Settings::default()
        };
        let monitor = WindowMonitor::Snapshot(SnapshotSource::new(path));
        Watcher::new(monitor, &settings)
    }

    #[tokio::test]
    async fn test_poll_once_prints_each_change_once() {
        let path = temp_snapshot(
            "print",
            r#"{ "active": "1", "windows": [ { "id": "1", "resourceClass": "kitty", "caption": "~", "pid": 7 } ] }"#,
        );
        let mut watcher = watcher_for(&path, Vec::new());
        let mut out = Vec::new();

        let first = watcher.poll_once(&mut out).await.unwrap();
        let second = watcher.poll_once(&mut out).await.unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(first, Some(WatchEvent::Changed("kitty;~;7".to_string())));
        assert_eq!(second, None);
        assert_eq!(String::from_utf8(out).unwrap(), "kitty;~;7\n");
    }

    #[tokio::test]
    async fn test_poll_once_skips_ignored_window() {
        let path = temp_snapshot(
            "ignore",
            r#"{ "active": "1", "windows": [ { "id": "1", "resourceClass": "PolyHost", "caption": "PolyHost" } ] }"#,
        );
        let mut watcher = watcher_for(&path, vec!["polyhost".to_string()]);
        let mut out = Vec::new();

        let event = watcher.poll_once(&mut out).await.unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(event, None);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_poll_once_propagates_source_errors() {
        let mut watcher = watcher_for(&PathBuf::from("/nonexistent/awr/watch.json"), Vec::new());
        let mut out = Vec::new();
        assert!(watcher.poll_once(&mut out).await.is_err());
    }
}
