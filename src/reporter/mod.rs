pub mod descriptor;

use anyhow::Result;
use std::io::Write;

use crate::models::window::{DescriptorMode, WindowSnapshot};

pub use descriptor::descriptor;

/// Finds the active window in a snapshot and turns it into descriptor lines.
///
/// The host is expected to flag exactly one window as active. That is not
/// enforced here: every entry equal to the active reference yields a line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveWindowReporter {
    mode: DescriptorMode,
}

impl ActiveWindowReporter {
    pub fn new(mode: DescriptorMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DescriptorMode {
        self.mode
    }

    pub fn describe(&self, snapshot: &WindowSnapshot) -> Vec<String> {
        snapshot
            .active_windows()
            .map(|window| descriptor(window, self.mode))
            .collect()
    }

    /// Writes one line per active window and returns how many were written.
    pub fn report<W: Write>(&self, snapshot: &WindowSnapshot, out: &mut W) -> Result<usize> {
        let lines = self.describe(snapshot);
        if lines.is_empty() {
            log::debug!(
                "No active window among {} windows (active: {:?})",
                snapshot.windows.len(),
                snapshot.active
            );
        }
        for line in &lines {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(lines.len())
    }
}
