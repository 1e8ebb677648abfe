//! Client configuration read from the process environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use runtime::RuntimeConfig;

/// Configuration required to bootstrap a clicker session.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub session_id: Option<String>,
    /// Directory holding `config.toml`, `effects.ron` and `skills.ron`.
    pub content_dir: PathBuf,
    /// Snapshot file used by `save` and `load` when no path is given.
    pub save_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub tick_interval: Duration,
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            content_dir: default_content_dir(),
            save_path: None,
            seed: None,
            tick_interval: Duration::from_millis(50),
            command_buffer: 32,
            event_buffer: 256,
        }
    }
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CLICKER_SESSION_ID` - Session identifier for logs (default: auto-generated)
    /// - `CLICKER_CONTENT_DIR` - Content data directory (default: bundled data)
    /// - `CLICKER_SAVE_PATH` - Default snapshot file (default: platform data dir)
    /// - `CLICKER_SEED` - RNG seed (default: derived from the clock)
    /// - `CLICKER_TICK_MS` - Timer dispatch interval (default: 50)
    /// - `CLICKER_COMMAND_BUFFER` - Command queue size (default: 32)
    /// - `CLICKER_EVENT_BUFFER` - Per-topic event capacity (default: 256)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.session_id = env::var("CLICKER_SESSION_ID").ok();
        if let Ok(dir) = env::var("CLICKER_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }
        config.save_path = env::var("CLICKER_SAVE_PATH").ok().map(PathBuf::from);
        config.seed = read_env::<u64>("CLICKER_SEED");

        if let Some(ms) = read_env::<u64>("CLICKER_TICK_MS") {
            config.tick_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(capacity) = read_env::<usize>("CLICKER_COMMAND_BUFFER") {
            config.command_buffer = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("CLICKER_EVENT_BUFFER") {
            config.event_buffer = capacity.max(1);
        }

        config
    }

    pub fn runtime_config(&self, seed: u64) -> RuntimeConfig {
        RuntimeConfig {
            event_buffer_size: self.event_buffer,
            command_buffer_size: self.command_buffer,
            tick_interval: self.tick_interval,
            seed,
        }
    }

    /// Snapshot file for `save`/`load` without an explicit path.
    pub fn default_save_path(&self) -> PathBuf {
        self.save_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "clicker")
                .map(|dirs| dirs.data_dir().join("session.bin"))
                .unwrap_or_else(|| PathBuf::from("session.bin"))
        })
    }
}

fn default_content_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../game/content/data")
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_config_carries_buffers_and_seed() {
        let config = ClientConfig {
            command_buffer: 4,
            event_buffer: 16,
            ..ClientConfig::default()
        };
        let runtime = config.runtime_config(7);
        assert_eq!(runtime.command_buffer_size, 4);
        assert_eq!(runtime.event_buffer_size, 16);
        assert_eq!(runtime.seed, 7);
    }

    #[test]
    fn explicit_save_path_wins() {
        let config = ClientConfig {
            save_path: Some(PathBuf::from("/tmp/clicker.bin")),
            ..ClientConfig::default()
        };
        assert_eq!(config.default_save_path(), PathBuf::from("/tmp/clicker.bin"));
    }
}
