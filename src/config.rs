//! Runtime configuration
//!
//! Everything is read from the environment with a default; a malformed value
//! is logged and falls back to the default rather than failing startup.

use std::time::Duration;

use tracing::warn;

/// Default SQLite database path
pub const DEFAULT_DATABASE_PATH: &str = "retainer-data.sqlite";

/// RetainerTrack configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database path.
    pub database_path: String,
    /// Maximum database connections.
    pub max_connections: u32,
    /// How long shutdown waits for in-flight ingestion.
    pub drain_timeout: Duration,
    /// Explicit identity-mapping opcode, overriding the per-version table.
    pub content_id_opcode: Option<u16>,
    /// Marketplace offerings opcode, supplied by the host's opcode data.
    pub market_board_opcode: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            max_connections: 4,
            drain_timeout: Duration::from_millis(5000),
            content_id_opcode: None,
            market_board_opcode: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let database_path =
            lookup("RETAINER_TRACK_DATABASE").unwrap_or(defaults.database_path);

        let max_connections = parsed_var(&lookup, "RETAINER_TRACK_MAX_CONNECTIONS", |v| {
            v.parse::<u32>().ok().filter(|&n| n > 0)
        })
        .unwrap_or(defaults.max_connections);

        let drain_timeout = parsed_var(&lookup, "RETAINER_TRACK_DRAIN_TIMEOUT_MS", |v| {
            v.parse().ok().map(Duration::from_millis)
        })
        .unwrap_or(defaults.drain_timeout);

        let content_id_opcode =
            parsed_var(&lookup, "RETAINER_TRACK_CONTENT_ID_OPCODE", parse_opcode);
        let market_board_opcode =
            parsed_var(&lookup, "RETAINER_TRACK_MARKET_BOARD_OPCODE", parse_opcode);

        Self {
            database_path,
            max_connections,
            drain_timeout,
            content_id_opcode,
            market_board_opcode,
        }
    }
}

/// Read and parse one variable; a value that does not parse is logged and dropped
fn parsed_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let value = parse(raw.trim());
    if value.is_none() {
        warn!(variable = key, value = %raw, "Ignoring malformed configuration value");
    }
    value
}

/// Parse an opcode written as hex (`0x01C4`) or decimal (`452`)
pub fn parse_opcode(value: &str) -> Option<u16> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
