use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

/// `RUST_LOG`, если задана, иначе директива из конфигурации.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let directive = config.build_filter_directive();

    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => match EnvFilter::try_new(&directive) {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!("Invalid log filter directive from config ('{directive}'): {e}; falling back to 'info'");
                EnvFilter::new("info")
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;
    use crate::logging::formatter::tests::BufferWriter;

    /// Тест проверяет: при уровне "warn" info отбрасывается, warn проходит.
    #[test]
    #[serial]
    fn test_config_directive_filters_levels() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "warn".into(),
            ..Default::default()
        };

        let writer = BufferWriter::default();
        let layer = fmt::layer()
            .with_writer(writer.clone())
            .with_filter(build_filter(&config));
        let _guard = tracing::subscriber::set_default(Registry::default().with(layer));

        tracing::info!("info message that should be filtered out");
        tracing::warn!("warn message that should pass");

        let out = writer.contents();
        assert!(out.contains("warn message that should pass"));
        assert!(!out.contains("info message that should be filtered out"));
    }

    /// Тест проверяет приоритет RUST_LOG над конфигурацией.
    #[test]
    #[serial]
    fn test_env_overrides_config() {
        env::set_var("RUST_LOG", "error");
        let config = LoggingConfig {
            level: "debug".into(),
            ..Default::default()
        };

        let writer = BufferWriter::default();
        let layer = fmt::layer()
            .with_writer(writer.clone())
            .with_filter(build_filter(&config));
        let _guard = tracing::subscriber::set_default(Registry::default().with(layer));
        env::remove_var("RUST_LOG");

        tracing::warn!("dropped by env filter");
        tracing::error!("kept by env filter");

        let out = writer.contents();
        assert!(out.contains("kept by env filter"));
        assert!(!out.contains("dropped by env filter"));
    }

    #[test]
    #[serial]
    fn test_invalid_directive_falls_back() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "widgetbus=notalevel".into(),
            ..Default::default()
        };
        let filter = build_filter(&config);
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing::level_filters::LevelFilter::INFO)
        );
    }
}
