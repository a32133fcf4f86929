//! Log subscriber setup.
//!
//! Logs go to stderr. `RUST_LOG` wins when set; otherwise the `[logging]`
//! config section picks level and format, and `-v` / `--json-logs` override it.

use album_core::Config;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

/// Level and format after config and CLI flags are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LogSettings {
    level: Level,
    format: LogFormat,
}

impl LogSettings {
    fn resolve(config: &Config, verbose: bool, json_logs: bool) -> Self {
        let configured = config.logging.level.parse().unwrap_or(Level::INFO);
        // -v means at least debug; a configured trace stays trace.
        let level = if verbose {
            configured.max(Level::DEBUG)
        } else {
            configured
        };
        let format = if json_logs || config.logging.format == "json" {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        Self { level, format }
    }

    fn install(self) {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy();
        let registry = tracing_subscriber::registry().with(filter);

        match self.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init(),
        }
    }
}

/// Install the global subscriber from the `[logging]` section and CLI flags.
pub fn init_from_config(config: &Config, verbose: bool, json_logs: bool) {
    LogSettings::resolve(config, verbose, json_logs).install();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_level(level: &str) -> Config {
        let mut config = Config::default();
        config.logging.level = level.to_string();
        config
    }

    #[test]
    fn test_configured_level_is_used() {
        for (name, level) in [
            ("error", Level::ERROR),
            ("warn", Level::WARN),
            ("info", Level::INFO),
            ("debug", Level::DEBUG),
            ("trace", Level::TRACE),
        ] {
            let settings = LogSettings::resolve(&with_level(name), false, false);
            assert_eq!(settings.level, level, "{name}");
        }
    }

    #[test]
    fn test_verbose_raises_to_debug_only() {
        assert_eq!(
            LogSettings::resolve(&with_level("warn"), true, false).level,
            Level::DEBUG
        );
        assert_eq!(
            LogSettings::resolve(&with_level("trace"), true, false).level,
            Level::TRACE
        );
    }

    #[test]
    fn test_json_from_config_or_flag() {
        let mut config = Config::default();
        assert_eq!(
            LogSettings::resolve(&config, false, false).format,
            LogFormat::Pretty
        );
        assert_eq!(
            LogSettings::resolve(&config, false, true).format,
            LogFormat::Json
        );
        config.logging.format = "json".to_string();
        assert_eq!(
            LogSettings::resolve(&config, false, false).format,
            LogFormat::Json
        );
    }
}
