//! Process-wide tunables, persisted as TOML (spec.md §5, §9: "a single
//! context value initialized at startup").

use std::time::Duration;

use ddc_core::context::IoStrategy;
use ddc_core::retry::{RetryClass, RetryMaxima};
use ddc_core::sleep::{SleepPhase, SleepTable};
use serde::{Deserialize, Serialize};

/// Which I/O strategy the config file names. Kept separate from
/// [`IoStrategy`] so the on-disk representation (`"file-io"` / `"ioctl"`)
/// doesn't depend on `ddc-core`'s enum layout.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum IoStrategyConfig {
    FileIo,
    Ioctl,
}

impl From<IoStrategyConfig> for IoStrategy {
    fn from(value: IoStrategyConfig) -> Self {
        match value {
            IoStrategyConfig::FileIo => IoStrategy::FileIo,
            IoStrategyConfig::Ioctl => IoStrategy::Ioctl,
        }
    }
}

/// Per-class retry maxima, as they appear in `ddcset.toml`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    pub write_only: Option<usize>,
    pub write_read: Option<usize>,
    pub multi_part: Option<usize>,
}

/// Process-wide settings, loadable from an optional `ddcset.toml` in the
/// XDG config directory and overridable from the CLI.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub io_strategy: Option<IoStrategyConfig>,
    pub retry: RetryConfig,
    /// Sleep-phase overrides, in milliseconds, keyed by phase name
    /// (`"write-to-read"`, `"post-read"`, etc.) -- transport-specific
    /// overrides are not exposed at the config-file level, only the
    /// transport-default-based [`SleepTable`] API is.
    pub sleep_ms: std::collections::HashMap<String, u64>,
    pub verify_on_set: bool,
}

impl Settings {
    /// Parse `ddcset.toml` contents.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Serialize back to TOML, e.g. to write out a default config file.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Build a [`RetryMaxima`] from the configured overrides, falling back
    /// to [`RetryMaxima`]'s own literature defaults for unset classes.
    pub fn retry_maxima(&self) -> RetryMaxima {
        let mut maxima = RetryMaxima::new();
        if let Some(n) = self.retry.write_only {
            maxima.set(RetryClass::WriteOnly, n);
        }
        if let Some(n) = self.retry.write_read {
            maxima.set(RetryClass::WriteRead, n);
        }
        if let Some(n) = self.retry.multi_part {
            maxima.set(RetryClass::MultiPart, n);
        }
        maxima
    }

    /// Build a [`SleepTable`] applying any `sleep_ms` overrides uniformly
    /// across transports (a config-file override is meant to be a coarse
    /// global knob; per-transport tuning stays a programmatic API).
    pub fn sleep_table(&self) -> SleepTable {
        let mut table = SleepTable::new();
        for (name, ms) in &self.sleep_ms {
            if let Some(phase) = parse_phase(name) {
                for transport in [
                    ddc_core::transport::TransportKind::I2c,
                    ddc_core::transport::TransportKind::Adapter,
                    ddc_core::transport::TransportKind::Usb,
                ] {
                    table.set(phase, transport, Duration::from_millis(*ms));
                }
            }
        }
        table
    }
}

fn parse_phase(name: &str) -> Option<SleepPhase> {
    match name {
        "post-open" => Some(SleepPhase::PostOpen),
        "write-to-read" => Some(SleepPhase::WriteToRead),
        "post-read" => Some(SleepPhase::PostRead),
        "post-write" => Some(SleepPhase::PostWrite),
        "capabilities-retry" => Some(SleepPhase::CapabilitiesRetry),
        "table-retry" => Some(SleepPhase::TableRetry),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let mut settings = Settings::default();
        settings.io_strategy = Some(IoStrategyConfig::Ioctl);
        settings.retry.write_read = Some(6);
        settings.sleep_ms.insert("post-read".into(), 25);
        settings.verify_on_set = true;

        let text = settings.to_toml().unwrap();
        let parsed = Settings::from_toml(&text).unwrap();
        assert_eq!(parsed.io_strategy, Some(IoStrategyConfig::Ioctl));
        assert_eq!(parsed.retry.write_read, Some(6));
        assert!(parsed.verify_on_set);
    }

    #[test]
    fn missing_fields_default() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.io_strategy, None);
        assert!(!settings.verify_on_set);
    }

    #[test]
    fn retry_maxima_only_overrides_configured_classes() {
        let mut settings = Settings::default();
        settings.retry.multi_part = Some(20);
        let maxima = settings.retry_maxima();
        assert_eq!(maxima.get(RetryClass::MultiPart), 16); // clamped to ABSOLUTE_MAX_TRIES
        assert_eq!(maxima.get(RetryClass::WriteOnly), 4);
    }
}
