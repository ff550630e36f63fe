use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;
use crate::models::window::DescriptorMode;

/// A descriptor line read back into its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParsedDescriptor {
    pub app_name: String,
    pub title: String,
    pub pid: Option<u32>,
}

impl ParsedDescriptor {
    /// Lowercased first dot-separated segment of the app name, used as a lookup key.
    pub fn app_key(&self) -> String {
        self.app_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Parses a descriptor line produced in `mode`.
///
/// Captions may themselves contain `;`, so the app name ends at the first
/// separator and, in full mode, the pid starts after the last one.
pub fn parse_descriptor(line: &str, mode: DescriptorMode) -> Result<ParsedDescriptor, DescriptorError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let Some((app_name, rest)) = line.split_once(';') else {
        return Err(DescriptorError::UnexpectedFormat(line.to_string()));
    };

    match mode {
        DescriptorMode::NameCaption => Ok(ParsedDescriptor {
            app_name: app_name.to_string(),
            title: rest.to_string(),
            pid: None,
        }),
        DescriptorMode::Full => {
            let Some((title, pid)) = rest.rsplit_once(';') else {
                return Err(DescriptorError::UnexpectedFormat(line.to_string()));
            };
            let pid = if pid.is_empty() {
                None
            } else {
                Some(pid.parse::<u32>().map_err(|_| DescriptorError::InvalidPid {
                    pid: pid.to_string(),
                    line: line.to_string(),
                })?)
            };
            Ok(ParsedDescriptor {
                app_name: app_name.to_string(),
                title: title.to_string(),
                pid,
            })
        }
    }
}
