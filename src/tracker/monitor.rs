use anyhow::{Result, anyhow};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SourceError;
use crate::models::window::WindowSnapshot;
use crate::tracker::gnome::GnomeSource;
use crate::tracker::kwin::KwinSource;
use crate::tracker::native::NativeSource;
use crate::tracker::snapshot::SnapshotSource;

/// Which host to ask for the window list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Auto,
    Kwin,
    Gnome,
    Native,
    Snapshot,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Auto => "auto",
            SourceKind::Kwin => "kwin",
            SourceKind::Gnome => "gnome",
            SourceKind::Native => "native",
            SourceKind::Snapshot => "snapshot",
        }
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SourceKind::Auto),
            "kwin" | "kde" | "plasma" => Ok(SourceKind::Kwin),
            "gnome" => Ok(SourceKind::Gnome),
            "native" => Ok(SourceKind::Native),
            "snapshot" | "json" => Ok(SourceKind::Snapshot),
            other => Err(anyhow!(
                "Unknown window source '{}', expected one of auto, kwin, gnome, native, snapshot",
                other
            )),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub enum WindowMonitor {
    Kwin(KwinSource),
    Gnome(GnomeSource),
    Native(NativeSource),
    Snapshot(SnapshotSource),
}

impl WindowMonitor {
    pub fn new(kind: SourceKind, snapshot_path: Option<PathBuf>) -> Result<Self> {
        Self::with_env(kind, snapshot_path, |key| std::env::var(key).ok())
    }

    pub fn with_env(
        kind: SourceKind,
        snapshot_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        #[cfg(target_os = "macos")]
        log::info!("=== PLATFORM: macOS ===");

        #[cfg(target_os = "windows")]
        log::info!("=== PLATFORM: Windows ===");

        #[cfg(target_os = "linux")]
        log::info!("=== PLATFORM: Linux ===");

        // An explicit snapshot path wins over any configured source
        if let Some(path) = snapshot_path {
            if !matches!(kind, SourceKind::Auto | SourceKind::Snapshot) {
                log::info!("Snapshot path given, ignoring configured {} source", kind);
            }
            let monitor = WindowMonitor::Snapshot(SnapshotSource::new(path));
            log::info!("Using {} window source", monitor.name());
            return Ok(monitor);
        }

        let monitor = match kind {
            SourceKind::Auto => Self::detect(&env),
            SourceKind::Kwin => WindowMonitor::Kwin(KwinSource::new()),
            SourceKind::Gnome => WindowMonitor::Gnome(GnomeSource::new()),
            SourceKind::Native => WindowMonitor::Native(NativeSource::new()),
            SourceKind::Snapshot => return Err(SourceError::Unavailable("snapshot").into()),
        };

        log::info!("Using {} window source", monitor.name());
        Ok(monitor)
    }

    /// Picks a source from the session environment: KWin, then GNOME on Wayland, then native.
    pub fn detect(env: impl Fn(&str) -> Option<String>) -> Self {
        if KwinSource::is_available(&env) {
            WindowMonitor::Kwin(KwinSource::new())
        } else if GnomeSource::is_available(&env) {
            WindowMonitor::Gnome(GnomeSource::new())
        } else {
            WindowMonitor::Native(NativeSource::new())
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowMonitor::Kwin(_) => "KWin",
            WindowMonitor::Gnome(_) => "GNOME Shell",
            WindowMonitor::Native(_) => "native",
            WindowMonitor::Snapshot(_) => "snapshot",
        }
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        match self {
            WindowMonitor::Kwin(source) => source.snapshot().await,
            WindowMonitor::Gnome(source) => source.snapshot().await,
            WindowMonitor::Native(source) => source.snapshot().await,
            WindowMonitor::Snapshot(source) => source.snapshot().await,
        }
    }
}
