//! Console configuration.
//!
//! Loaded once at console creation; the buffer capacity and debounce delay
//! never change afterwards. Missing file means defaults. These values are
//! consumed, not owned, by the pipeline: there is no ambient global state
//! queried mid-operation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration inputs for one console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Whether the deferred buffer evicts old content past a size limit.
    /// Disabled means unbounded (non-interactive / batch consoles).
    pub cycle_buffer_enabled: bool,
    /// Cyclic buffer size in KiB of characters.
    pub cycle_buffer_size_kb: u32,
    /// Debounce delay for normal flushes, in milliseconds.
    pub flush_delay_ms: u64,
    /// Interpret a lone `\r` as "erase the current line" instead of
    /// keeping it as a literal character.
    pub emulate_carriage_return: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            cycle_buffer_enabled: true,
            cycle_buffer_size_kb: Self::DEFAULT_CYCLE_BUFFER_KB,
            flush_delay_ms: Self::DEFAULT_FLUSH_DELAY_MS,
            emulate_carriage_return: true,
        }
    }
}

impl ConsoleConfig {
    const DEFAULT_CYCLE_BUFFER_KB: u32 = 1024;
    const DEFAULT_FLUSH_DELAY_MS: u64 = 200;

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(ConsoleConfig::default())
        }
    }

    /// Resolved cyclic capacity in characters; `None` means unbounded.
    pub fn cycle_buffer_capacity(&self) -> Option<usize> {
        if self.cycle_buffer_enabled && self.cycle_buffer_size_kb > 0 {
            Some(self.cycle_buffer_size_kb as usize * 1024)
        } else {
            None
        }
    }

    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConsoleConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert!(config.cycle_buffer_enabled);
        assert_eq!(config.flush_delay_ms, 200);
        assert!(config.emulate_carriage_return);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cycle_buffer_size_kb = 4").unwrap();
        let config = ConsoleConfig::load_from(file.path()).unwrap();
        assert_eq!(config.cycle_buffer_capacity(), Some(4 * 1024));
        assert_eq!(config.flush_delay_ms, 200);
    }

    #[test]
    fn disabled_buffer_is_unbounded() {
        let config = ConsoleConfig {
            cycle_buffer_enabled: false,
            ..ConsoleConfig::default()
        };
        assert_eq!(config.cycle_buffer_capacity(), None);

        let zero = ConsoleConfig {
            cycle_buffer_size_kb: 0,
            ..ConsoleConfig::default()
        };
        assert_eq!(zero.cycle_buffer_capacity(), None);
    }

    #[test]
    fn malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cycle_buffer_size_kb = \"lots\"").unwrap();
        assert!(ConsoleConfig::load_from(file.path()).is_err());
    }
}
