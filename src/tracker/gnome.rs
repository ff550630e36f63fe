use anyhow::Result;
use serde::Deserialize;

use crate::error::SourceError;
use crate::models::window::{WindowHandle, WindowId, WindowSnapshot};

/// Entry of the JSON list returned by the "Window Calls" GNOME Shell extension.
#[derive(Deserialize, Debug)]
struct GnomeWindow {
    id: serde_json::Value,
    #[serde(default)]
    wm_class: Option<String>,
    #[serde(default)]
    wm_class_instance: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    pid: Option<u32>,
    #[serde(default)]
    focus: bool,
}

impl GnomeWindow {
    fn window_id(&self) -> WindowId {
        match &self.id {
            serde_json::Value::String(s) => WindowId::new(s.clone()),
            other => WindowId::new(other.to_string()),
        }
    }
}

pub struct GnomeSource;

impl GnomeSource {
    pub fn new() -> Self {
        Self
    }

    pub fn is_available(env: impl Fn(&str) -> Option<String>) -> bool {
        let wayland = env("WAYLAND_DISPLAY").is_some()
            || env("XDG_SESSION_TYPE").map(|s| s == "wayland").unwrap_or(false);
        let gnome = env("XDG_CURRENT_DESKTOP")
            .map(|d| d.to_uppercase().contains("GNOME"))
            .unwrap_or(false);
        wayland && gnome
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        let connection = zbus::Connection::session()
            .await
            .map_err(SourceError::DbusError)?;

        let response = connection
            .call_method(
                Some("org.gnome.Shell"),
                "/org/gnome/Shell/Extensions/Windows",
                Some("org.gnome.Shell.Extensions.Windows"),
                "List",
                &(),
            )
            .await
            .map_err(SourceError::DbusError)?;

        // The reply is a single JSON string, not a structured D-Bus value
        let json_str: String = response.body().deserialize()?;
        Ok(parse_window_list(&json_str)?)
    }
}

impl Default for GnomeSource {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_window_list(json: &str) -> Result<WindowSnapshot, SourceError> {
    let windows: Vec<GnomeWindow> = serde_json::from_str(json)?;

    let active = windows.iter().find(|w| w.focus).map(GnomeWindow::window_id);
    let handles = windows
        .into_iter()
        .map(|w| WindowHandle {
            id: w.window_id(),
            resource_class: w.wm_class,
            resource_name: w.wm_class_instance,
            caption: w.title,
            pid: w.pid,
        })
        .collect();

    Ok(WindowSnapshot::new(handles, active))
}
