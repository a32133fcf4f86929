//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.workers must be > 0".into(),
            ));
        }
        if self.processing.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.extensions must not be empty".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.task_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.task_timeout_ms must be > 0".into(),
            ));
        }
        if self.thumbnail.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnail.max_dimension must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnail.quality) {
            return Err(ConfigError::ValidationError(
                "thumbnail.quality must be between 1 and 100".into(),
            ));
        }
        let meta_dir = &self.store.meta_dir;
        if meta_dir.is_empty() || meta_dir.contains('/') || meta_dir.contains('\\') {
            return Err(ConfigError::ValidationError(
                "store.meta_dir must be a single directory name".into(),
            ));
        }
        if !meta_dir.starts_with('.') || meta_dir == "." || meta_dir == ".." {
            return Err(ConfigError::ValidationError(
                "store.meta_dir must be a hidden directory name like \".album\"".into(),
            ));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of error, warn, info, debug, trace (got {:?})",
                self.logging.level
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.processing.workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_validate_rejects_empty_extensions() {
        let mut config = Config::default();
        config.processing.extensions.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("extensions"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.task_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("task_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_quality() {
        let mut config = Config::default();
        config.thumbnail.quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));

        config.thumbnail.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nested_meta_dir() {
        let mut config = Config::default();
        config.store.meta_dir = "meta/nested".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("meta_dir"));

        config.store.meta_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_hidden_meta_dir() {
        let mut config = Config::default();
        for bad in ["album-meta", ".", ".."] {
            config.store.meta_dir = bad.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("meta_dir"), "{bad}");
        }

        config.store.meta_dir = ".thumbs-cache".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_log_settings() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("logging.level"));

        config.logging.level = "warn".to_string();
        config.logging.format = "xml".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("logging.format"));
    }
}
