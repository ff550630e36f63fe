//! KDE KWin window source using the D-Bus scripting interface.
//!
//! KWin only exposes its window list to scripts running inside the
//! compositor, so each snapshot loads a small script, runs it, and reads
//! what it printed back from the journal.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::process::Command;

use crate::error::SourceError;
use crate::models::window::WindowSnapshot;
use crate::tracker::snapshot::{SnapshotDocument, SnapshotWindow};

const KWIN_SERVICE: &str = "org.kde.KWin";
const SCRIPTING_PATH: &str = "/Scripting";
const SCRIPTING_INTERFACE: &str = "org.kde.kwin.Scripting";
const SCRIPT_INTERFACE: &str = "org.kde.kwin.Script";
const SCRIPT_TEMPLATE: &str = include_str!("kwin_script.js");
const END_PAYLOAD: &str = "END";

const JOURNAL_ATTEMPTS: u32 = 5;
const JOURNAL_RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct KwinSource {
    plugin_name: String,
}

impl Default for KwinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KwinSource {
    pub fn new() -> Self {
        Self {
            plugin_name: format!("active-window-reporter-{}", std::process::id()),
        }
    }

    /// True when the session looks like a Plasma session.
    pub fn is_available(env: impl Fn(&str) -> Option<String>) -> bool {
        env("KDE_SESSION_VERSION").is_some()
            || env("XDG_CURRENT_DESKTOP")
                .map(|d| d.to_uppercase().contains("KDE"))
                .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        let marker = new_marker();
        let script_path = self.write_script(&marker).await?;
        let since = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let connection = zbus::Connection::session()
            .await
            .map_err(SourceError::DbusError)?;
        let run_result = self.run_script(&connection, &script_path).await;

        if let Err(e) = self.unload_script(&connection).await {
            log::warn!("Failed to unload KWin script {}: {}", self.plugin_name, e);
        }
        if let Err(e) = tokio::fs::remove_file(&script_path).await {
            log::debug!("Failed to remove {:?}: {}", script_path, e);
        }
        run_result?;

        let lines = read_script_output(&since, &marker).await?;
        let snapshot = parse_script_output(&lines, &marker)?;
        log::debug!(
            "KWin reported {} windows, active: {:?}",
            snapshot.windows.len(),
            snapshot.active
        );
        Ok(snapshot)
    }

    async fn write_script(&self, marker: &str) -> Result<PathBuf> {
        let path = std::env::temp_dir().join(format!("{}.js", self.plugin_name));
        let script = SCRIPT_TEMPLATE.replace("__MARKER__", marker);
        tokio::fs::write(&path, script)
            .await
            .with_context(|| format!("Failed to write KWin script to {:?}", path))?;
        Ok(path)
    }

    async fn run_script(&self, connection: &zbus::Connection, script_path: &Path) -> Result<()> {
        let path = script_path.to_string_lossy().to_string();
        let reply = connection
            .call_method(
                Some(KWIN_SERVICE),
                SCRIPTING_PATH,
                Some(SCRIPTING_INTERFACE),
                "loadScript",
                &(path.as_str(), self.plugin_name.as_str()),
            )
            .await
            .map_err(SourceError::DbusError)?;

        let script_number: i32 = reply
            .body()
            .deserialize()
            .map_err(|e| SourceError::ScriptNotRegistered(e.to_string()))?;
        if script_number < 0 {
            return Err(SourceError::ScriptNotRegistered(script_number.to_string()).into());
        }
        log::debug!("Loaded KWin script {} as number {}", self.plugin_name, script_number);

        let object_path = format!("/Scripting/Script{}", script_number);
        for method in ["run", "stop"] {
            connection
                .call_method(Some(KWIN_SERVICE), object_path.as_str(), Some(SCRIPT_INTERFACE), method, &())
                .await
                .map_err(SourceError::DbusError)?;
        }
        Ok(())
    }

    async fn unload_script(&self, connection: &zbus::Connection) -> Result<bool> {
        let reply = connection
            .call_method(
                Some(KWIN_SERVICE),
                SCRIPTING_PATH,
                Some(SCRIPTING_INTERFACE),
                "unloadScript",
                &(self.plugin_name.as_str(),),
            )
            .await
            .map_err(SourceError::DbusError)?;
        Ok(reply.body().deserialize()?)
    }
}

fn new_marker() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("awr-{}-{}", std::process::id(), nanos)
}

/// Reads KWin's journal output since `since`, retrying briefly until the
/// script's end marker shows up.
async fn read_script_output(since: &str, marker: &str) -> Result<Vec<String>> {
    let end_line = format!("{} {}", marker, END_PAYLOAD);

    for attempt in 1..=JOURNAL_ATTEMPTS {
        let output = Command::new("journalctl")
            .args(["_COMM=kwin_wayland", "_COMM=kwin_x11", "-o", "cat", "--since", since])
            .output()
            .await
            .map_err(|e| SourceError::JournalFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(SourceError::JournalFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )
            .into());
        }

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.strip_prefix("js: ").unwrap_or(line).to_string())
            .filter(|line| line.starts_with(marker))
            .collect();

        if lines.iter().any(|line| *line == end_line) {
            return Ok(lines);
        }
        log::debug!("KWin script output incomplete (attempt {})", attempt);
        tokio::time::sleep(JOURNAL_RETRY_DELAY).await;
    }

    Err(SourceError::NoOutput("KWin script").into())
}

/// Turns the marker-prefixed JSON lines printed by the script into a snapshot.
pub fn parse_script_output(lines: &[String], marker: &str) -> Result<WindowSnapshot> {
    let mut document = SnapshotDocument::default();
    let mut finished = false;

    for line in lines {
        let Some(payload) = line.strip_prefix(marker).map(str::trim) else {
            continue;
        };
        if payload == END_PAYLOAD {
            finished = true;
            continue;
        }
        match serde_json::from_str::<SnapshotWindow>(payload) {
            Ok(window) => document.windows.push(window),
            Err(e) => log::debug!("Skipping unreadable KWin line '{}': {}", payload, e),
        }
    }

    if !finished {
        return Err(SourceError::NoOutput("KWin script").into());
    }
    Ok(document.into_snapshot())
}
