//! User configuration — job teardown budgets and scan/match tuning.
//!
//! Stored as a simple key-value text file at
//! `$XDG_CONFIG_HOME/chart-shelf/config.toml` (default
//! `~/.config/chart-shelf/config.toml`).

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
///
/// The teardown budgets bound the forced-cancellation wait per job kind:
/// search matching is cheap and gives up quickly, a rating computation is
/// expensive and gets a long grace period before being abandoned.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bounded wait when cancelling an in-flight search pass.
    pub search_teardown_ms: u64,
    /// Bounded wait when cancelling an in-flight rating computation.
    pub rating_teardown_ms: u64,
    /// How many sets the rating cursor advances past per idle tick.
    pub sets_per_tick: usize,
    /// When `true`, a single chart must satisfy the whole query instead of
    /// the expression and literal passes matching independently.
    pub strict_match: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_teardown_ms: 2_000,
            rating_teardown_ms: 20_000,
            sets_per_tick: 1,
            strict_match: false,
        }
    }
}

impl AppConfig {
    pub fn search_teardown(&self) -> Duration {
        Duration::from_millis(self.search_teardown_ms)
    }

    pub fn rating_teardown(&self) -> Duration {
        Duration::from_millis(self.rating_teardown_ms)
    }

    // ── persistence ─────────────────────────────────────────────

    /// Load config from disk, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                return Self::parse_config(&contents);
            }
        }
        Self::default()
    }

    /// Persist current config to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.serialise())?;
        Ok(())
    }

    fn parse_config(s: &str) -> Self {
        let mut config = Self::default();

        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "search_teardown_ms" => {
                    if let Ok(v) = value.parse::<u64>() {
                        // Keep the interactive stall bounded and visible.
                        config.search_teardown_ms = v.clamp(100, 10_000);
                    }
                }
                "rating_teardown_ms" => {
                    if let Ok(v) = value.parse::<u64>() {
                        config.rating_teardown_ms = v.clamp(1_000, 60_000);
                    }
                }
                "sets_per_tick" => {
                    if let Ok(v) = value.parse::<usize>() {
                        config.sets_per_tick = v.clamp(1, 64);
                    }
                }
                "strict_match" => {
                    config.strict_match = value == "true";
                }
                _ => {}
            }
        }

        config
    }

    fn serialise(&self) -> String {
        let lines = vec![
            "# chart-shelf configuration".to_string(),
            String::new(),
            "# Forced-cancellation budgets (ms) per background job kind".to_string(),
            format!("search_teardown_ms = {}", self.search_teardown_ms),
            format!("rating_teardown_ms = {}", self.rating_teardown_ms),
            String::new(),
            "# Rating-scan cursor advance per idle tick".to_string(),
            format!("sets_per_tick = {}", self.sets_per_tick),
            String::new(),
            "# Require one chart to satisfy the whole query".to_string(),
            format!("strict_match = {}", self.strict_match),
            String::new(),
        ];
        lines.join("\n")
    }
}

/// Return the config file path (`$XDG_CONFIG_HOME/chart-shelf/config.toml`).
fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
    config_dir.join("chart-shelf").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clamps_out_of_range_values() {
        let config = AppConfig::parse_config(
            "search_teardown_ms = 5\nrating_teardown_ms = 999999\nsets_per_tick = 0\n",
        );
        assert_eq!(config.search_teardown_ms, 100);
        assert_eq!(config.rating_teardown_ms, 60_000);
        assert_eq!(config.sets_per_tick, 1);
    }

    #[test]
    fn test_parse_ignores_comments_and_unknown_keys() {
        let config =
            AppConfig::parse_config("# comment\n[section]\nmystery = 12\nstrict_match = true\n");
        assert!(config.strict_match);
        assert_eq!(config.search_teardown_ms, 2_000);
    }

    #[test]
    fn test_serialise_round_trips() {
        let config = AppConfig {
            sets_per_tick: 4,
            strict_match: true,
            ..AppConfig::default()
        };
        let parsed = AppConfig::parse_config(&config.serialise());
        assert_eq!(parsed.sets_per_tick, 4);
        assert!(parsed.strict_match);
        assert_eq!(parsed.rating_teardown_ms, config.rating_teardown_ms);
    }
}
