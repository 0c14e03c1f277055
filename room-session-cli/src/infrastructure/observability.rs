use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infrastructure::{CliError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub default_level: tracing::Level,
    pub json_format: bool,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: tracing::Level::INFO,
            json_format: false,
            show_thread_ids: false,
            show_targets: true,
            show_logs: true,
        }
    }
}

impl LogConfig {
    /// Development configuration (verbose, human-readable)
    pub fn dev() -> Self {
        Self {
            default_level: tracing::Level::DEBUG,
            show_thread_ids: true,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.default_level = level;
        self
    }

    /// One JSON object per log line
    pub fn with_json(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Hide logs (keeps stdout clean for piping)
    pub fn without_logs(mut self) -> Self {
        self.show_logs = false;
        self
    }

    /// Directives used when `RUST_LOG` is not set
    pub fn default_directives(&self) -> String {
        let level = self.default_level.to_string().to_lowercase();
        format!(
            "{}={level},room_session={level},room_session_core={level}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
        )
    }

    /// Install the global subscriber. Logs go to stderr so stdout carries
    /// only channel output.
    pub fn init(self) -> Result<()> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.default_directives())
                .map_err(|e| CliError::Logging(e.to_string()))?,
        };

        if !self.show_logs {
            return tracing_subscriber::registry()
                .with(env_filter)
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()));
        }

        if self.json_format {
            let json_layer = fmt::layer()
                .json()
                .with_target(self.show_targets)
                .with_thread_ids(self.show_thread_ids)
                .with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()))
        } else {
            let fmt_layer = fmt::layer()
                .with_target(self.show_targets)
                .with_thread_ids(self.show_thread_ids)
                .with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, tracing::Level::INFO);
        assert!(!config.json_format);
        assert!(config.show_logs);
    }

    #[test]
    fn test_dev_config() {
        let config = LogConfig::dev();
        assert_eq!(config.default_level, tracing::Level::DEBUG);
        assert!(config.show_thread_ids);
        assert!(config.show_logs);
    }

    #[test]
    fn test_with_json() {
        let config = LogConfig::default().with_json();
        assert!(config.json_format);
    }

    #[test]
    fn test_without_logs() {
        let config = LogConfig::default().without_logs();
        assert!(!config.show_logs);
    }

    #[test]
    fn test_default_directives_cover_core() {
        let config = LogConfig::default().with_level(tracing::Level::WARN);
        let directives = config.default_directives();

        assert!(directives.contains("room_session_cli=warn"));
        assert!(directives.contains("room_session_core=warn"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
