use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque window identity as handed out by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowHandle {
    pub id: WindowId,
    #[serde(default)]
    pub resource_class: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
}

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: WindowId::new(id),
            ..Default::default()
        }
    }

    // Empty strings count as absent, the same way the window manager's
    // scripting host treats them as falsy.
    pub fn class(&self) -> Option<&str> {
        non_empty(&self.resource_class)
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.resource_name)
    }

    pub fn caption(&self) -> Option<&str> {
        non_empty(&self.caption)
    }

    /// Process id, with `0` treated as unknown.
    pub fn process_id(&self) -> Option<u32> {
        self.pid.filter(|pid| *pid != 0)
    }

    /// Class, falling back to name.
    pub fn app_name(&self) -> Option<&str> {
        self.class().or_else(|| self.name())
    }
}

#[cfg(test)]
impl WindowHandle {
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.resource_class = Some(class.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Window list plus the host's notion of the active window, captured at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    pub windows: Vec<WindowHandle>,
    pub active: Option<WindowId>,
}

impl WindowSnapshot {
    pub fn new(windows: Vec<WindowHandle>, active: Option<WindowId>) -> Self {
        Self { windows, active }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Every window whose identity equals the active reference, in list order.
    pub fn active_windows(&self) -> impl Iterator<Item = &WindowHandle> {
        self.windows
            .iter()
            .filter(move |w| self.active.as_ref() == Some(&w.id))
    }
}

/// Which descriptor layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorMode {
    /// `<class_or_name>;<caption>;<pid>`
    #[default]
    Full,
    /// `<name>;<caption>`
    NameCaption,
}

impl DescriptorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorMode::Full => "full",
            DescriptorMode::NameCaption => "name-caption",
        }
    }
}

impl FromStr for DescriptorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "a" => Ok(DescriptorMode::Full),
            "name-caption" | "name_caption" | "b" => Ok(DescriptorMode::NameCaption),
            other => Err(anyhow::anyhow!(
                "Unknown descriptor mode '{}', expected 'full' or 'name-caption'",
                other
            )),
        }
    }
}

impl fmt::Display for DescriptorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_absent() {
        let window = WindowHandle::new("1")
            .with_class("")
            .with_name("konsole")
            .with_caption("")
            .with_pid(0);

        assert_eq!(window.class(), None);
        assert_eq!(window.name(), Some("konsole"));
        assert_eq!(window.caption(), None);
        assert_eq!(window.process_id(), None);
        assert_eq!(window.app_name(), Some("konsole"));
    }

    #[test]
    fn test_active_windows_follows_identity() {
        let snapshot = WindowSnapshot::new(
            vec![
                WindowHandle::new("a").with_class("one"),
                WindowHandle::new("b").with_class("two"),
                WindowHandle::new("b").with_class("three"),
            ],
            Some(WindowId::new("b")),
        );

        let classes: Vec<_> = snapshot.active_windows().filter_map(|w| w.class()).collect();
        assert_eq!(classes, vec!["two", "three"]);

        let none = WindowSnapshot::new(snapshot.windows.clone(), None);
        assert_eq!(none.active_windows().count(), 0);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("full".parse::<DescriptorMode>().unwrap(), DescriptorMode::Full);
        assert_eq!("Name-Caption".parse::<DescriptorMode>().unwrap(), DescriptorMode::NameCaption);
        assert!("three".parse::<DescriptorMode>().is_err());
    }
}
