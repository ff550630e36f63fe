use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

use crate::models::window::{WindowHandle, WindowId, WindowSnapshot};

/// JSON document describing a window list, as written by hand or dumped by
/// a window-manager script.
#[derive(Deserialize, Debug, Default)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub active: Option<WindowId>,
    #[serde(default)]
    pub windows: Vec<SnapshotWindow>,
}

#[derive(Deserialize, Debug)]
pub struct SnapshotWindow {
    #[serde(flatten)]
    pub handle: WindowHandle,
    #[serde(default)]
    pub active: bool,
}

impl SnapshotDocument {
    pub fn into_snapshot(self) -> WindowSnapshot {
        let active = self.active.or_else(|| {
            self.windows
                .iter()
                .find(|w| w.active)
                .map(|w| w.handle.id.clone())
        });
        let windows = self.windows.into_iter().map(|w| w.handle).collect();
        WindowSnapshot::new(windows, active)
    }
}

pub fn parse_snapshot(json: &str) -> Result<WindowSnapshot> {
    let document: SnapshotDocument =
        serde_json::from_str(json).context("Failed to parse window snapshot JSON")?;
    Ok(document.into_snapshot())
}

/// Reads a snapshot from a file, or from stdin when the path is `-`.
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        let json = if self.path.as_os_str() == "-" {
            tokio::task::spawn_blocking(|| {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).map(|_| buf)
            })
            .await?
            .context("Failed to read snapshot from stdin")?
        } else {
            tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("Failed to read snapshot file {:?}", self.path))?
        };
        log::debug!("Read {} bytes of snapshot from {:?}", json.len(), self.path);
        parse_snapshot(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_top_level_active() {
        let json = r#"{
            "active": "0x2a",
            "windows": [
                { "id": "0x01", "resourceClass": "dolphin", "caption": "Home" },
                { "id": "0x2a", "resourceClass": "firefox", "resourceName": "Navigator", "caption": "Page", "pid": 42 }
            ]
        }"#;

        let snapshot = parse_snapshot(json).unwrap();
        assert_eq!(snapshot.active, Some(WindowId::new("0x2a")));
        assert_eq!(snapshot.windows.len(), 2);
        assert_eq!(snapshot.windows[1].pid, Some(42));
        assert_eq!(snapshot.windows[1].name(), Some("Navigator"));
        assert_eq!(snapshot.windows[0].pid, None);
    }

    #[test]
    fn test_parse_with_window_flag() {
        let json = r#"{
            "windows": [
                { "id": "a", "resourceName": "term" },
                { "id": "b", "resourceName": "editor", "active": true }
            ]
        }"#;

        let snapshot = parse_snapshot(json).unwrap();
        assert_eq!(snapshot.active, Some(WindowId::new("b")));
    }

    #[test]
    fn test_parse_nulls_and_empty() {
        let snapshot = parse_snapshot(r#"{ "windows": [ { "id": "x", "caption": null } ] }"#).unwrap();
        assert_eq!(snapshot.active, None);
        assert_eq!(snapshot.windows[0].caption, None);

        let snapshot = parse_snapshot("{}").unwrap();
        assert_eq!(snapshot, WindowSnapshot::empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_snapshot("not json").is_err());
        assert!(parse_snapshot(r#"{ "windows": [ { "caption": "no id" } ] }"#).is_err());
    }

    #[tokio::test]
    async fn test_snapshot_from_file() {
        let path = std::env::temp_dir().join(format!("awr-snapshot-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"{ "active": "1", "windows": [ { "id": "1", "resourceClass": "kitty" } ] }"#)
            .await
            .unwrap();

        let snapshot = SnapshotSource::new(&path).snapshot().await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(snapshot.windows[0].class(), Some("kitty"));
        assert_eq!(snapshot.active, Some(WindowId::new("1")));
    }

    #[tokio::test]
    async fn test_snapshot_missing_file() {
        let source = SnapshotSource::new("/nonexistent/awr/snapshot.json");
        assert!(source.snapshot().await.is_err());
    }
}
