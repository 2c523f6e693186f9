//! Detector configuration.
//!
//! The host owns parsing and delivery; the detector receives the finished
//! struct at construction and validates it once. All fields have working
//! defaults so an embedding host can start with `DetectorConfig::default()`.

use serde::Deserialize;
use thiserror::Error;

/// Largest accepted report-dedup window.
const MAX_DEDUP_WINDOW: usize = 1 << 20;

/// Parameters the host passes at init.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Size of the `(pc, pc')` race-dedup window; 0 disables dedup.
    pub report_dedup_window: usize,
    /// Glob patterns (`?`/`*`) matched against report kind names;
    /// matching reports are dropped.
    pub suppressions: Vec<String>,
    /// Emit a thread-leak report per still-running thread at finalize.
    pub report_thread_leaks: bool,
    /// Emit reports for destroy-of-locked and mismatched lock/unlock.
    pub report_mutex_misuse: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            report_dedup_window: 4096,
            suppressions: Vec::new(),
            report_thread_leaks: true,
            report_mutex_misuse: true,
        }
    }
}

/// Rejected configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("report_dedup_window {0} exceeds the maximum {MAX_DEDUP_WINDOW}")]
    DedupWindowTooLarge(usize),
    #[error("suppression pattern {0} is empty")]
    EmptySuppression(usize),
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_dedup_window > MAX_DEDUP_WINDOW {
            return Err(ConfigError::DedupWindowTooLarge(self.report_dedup_window));
        }
        if let Some(idx) = self.suppressions.iter().position(|s| s.is_empty()) {
            return Err(ConfigError::EmptySuppression(idx));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(DetectorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn oversized_window_rejected() {
        let cfg = DetectorConfig {
            report_dedup_window: MAX_DEDUP_WINDOW + 1,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DedupWindowTooLarge(_))
        ));
    }

    #[test]
    fn empty_suppression_rejected() {
        let cfg = DetectorConfig {
            suppressions: vec!["data-race".into(), String::new()],
            ..DetectorConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptySuppression(1)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: DetectorConfig = serde_json::from_str(r#"{"suppressions":["thread-*"]}"#).unwrap();
        assert_eq!(cfg.report_dedup_window, 4096);
        assert_eq!(cfg.suppressions, vec!["thread-*".to_string()]);
        assert!(cfg.report_thread_leaks);
    }
}
