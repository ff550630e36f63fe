use active_win_pos_rs::{ActiveWindow, get_active_window};
use anyhow::Result;

use crate::models::window::{WindowHandle, WindowId, WindowSnapshot};

/// Cross-platform fallback (X11, macOS, Windows) through `active-win-pos-rs`.
///
/// Only the active window is visible this way, so snapshots hold at most one entry.
pub struct NativeSource;

impl NativeSource {
    pub fn new() -> Self {
        Self
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        // The platform query blocks, keep it off the runtime's worker threads
        match tokio::task::spawn_blocking(get_active_window).await? {
            Ok(active_window) => Ok(snapshot_from_active(active_window)),
            Err(()) => {
                log::warn!("No active window detected. Make sure you're in a desktop environment with GUI windows.");
                Ok(WindowSnapshot::empty())
            }
        }
    }
}

impl Default for NativeSource {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot_from_active(active_window: ActiveWindow) -> WindowSnapshot {
    let process_name = active_window
        .process_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string());

    let handle = WindowHandle {
        id: WindowId::new(active_window.window_id),
        resource_class: Some(active_window.app_name),
        resource_name: process_name,
        caption: Some(active_window.title),
        pid: u32::try_from(active_window.process_id).ok(),
    };
    let active = Some(handle.id.clone());
    WindowSnapshot::new(vec![handle], active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use active_win_pos_rs::WindowPosition;
    use std::path::PathBuf;

    #[test]
    fn test_snapshot_from_active() {
        let active_window = ActiveWindow {
            title: "Page".to_string(),
            process_path: PathBuf::from("/usr/lib/firefox/firefox-bin"),
            app_name: "Firefox".to_string(),
            window_id: "12345".to_string(),
            process_id: 42,
            position: WindowPosition {
                x: 0.0,
                y: 0.0,
                width: 800.0,
                height: 600.0,
            },
        };

        let snapshot = snapshot_from_active(active_window);
        let active: Vec<_> = snapshot.active_windows().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].class(), Some("Firefox"));
        assert_eq!(active[0].name(), Some("firefox-bin"));
        assert_eq!(active[0].caption(), Some("Page"));
        assert_eq!(active[0].pid, Some(42));
    }
}
