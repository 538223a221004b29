//! Session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one [`Session`](crate::Session).
///
/// Deserializes from partial JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Descend into nodes that failed to match.
    pub show_failures: bool,
    /// Interpreter steps allowed per body invocation.
    pub gas_limit: u64,
    /// Labels longer than this that contain a space are truncated.
    pub label_max_len: usize,
    pub save_delay_ms: u64,
    pub select_delay_ms: u64,
    pub zoom_delay_ms: u64,
    pub exit_zoom_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            show_failures: false,
            gas_limit: semviz_eval::DEFAULT_GAS_LIMIT,
            label_max_len: 20,
            save_delay_ms: 250,
            select_delay_ms: 250,
            zoom_delay_ms: 0,
            exit_zoom_delay_ms: 100,
        }
    }
}

impl SessionConfig {
    pub fn with_show_failures(mut self, show: bool) -> Self {
        self.show_failures = show;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_label_max_len(mut self, len: usize) -> Self {
        self.label_max_len = len;
        self
    }

    pub fn with_save_delay_ms(mut self, ms: u64) -> Self {
        self.save_delay_ms = ms;
        self
    }

    pub fn with_select_delay_ms(mut self, ms: u64) -> Self {
        self.select_delay_ms = ms;
        self
    }

    pub fn with_zoom_delay_ms(mut self, ms: u64) -> Self {
        self.zoom_delay_ms = ms;
        self
    }

    pub fn with_exit_zoom_delay_ms(mut self, ms: u64) -> Self {
        self.exit_zoom_delay_ms = ms;
        self
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn select_delay(&self) -> Duration {
        Duration::from_millis(self.select_delay_ms)
    }

    pub fn zoom_delay(&self) -> Duration {
        Duration::from_millis(self.zoom_delay_ms)
    }

    pub fn exit_zoom_delay(&self) -> Duration {
        Duration::from_millis(self.exit_zoom_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.gas_limit, 100_000);
        assert_eq!(config.label_max_len, 20);
        assert_eq!(config.save_delay(), Duration::from_millis(250));
        assert_eq!(config.exit_zoom_delay(), Duration::from_millis(100));
        assert!(!config.show_failures);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"show_failures": true, "gas_limit": 50}"#).unwrap();
        assert!(config.show_failures);
        assert_eq!(config.gas_limit, 50);
        assert_eq!(config.select_delay_ms, 250);
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_zoom_delay_ms(5)
            .with_label_max_len(8);
        assert_eq!(config.zoom_delay(), Duration::from_millis(5));
        assert_eq!(config.label_max_len, 8);
    }
}
