use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.api.base_url.trim().is_empty() {
        return Err(invalid("api.base_url must not be empty"));
    }

    if config.tracker.poll_interval_ms == 0 {
        return Err(invalid("tracker.poll_interval_ms must be greater than 0"));
    }

    if config.tracker.max_poll_attempts == Some(0) {
        return Err(invalid("tracker.max_poll_attempts must be at least 1"));
    }

    if config.tracker.event_capacity == 0 {
        return Err(invalid("tracker.event_capacity must be greater than 0"));
    }

    let layout = &config.layout;
    let sizes = [
        ("layout.page_width", layout.page_width),
        ("layout.page_height", layout.page_height),
        ("layout.title_size", layout.title_size),
        ("layout.heading_size", layout.heading_size),
        ("layout.body_size", layout.body_size),
        ("layout.line_height_factor", layout.line_height_factor),
        ("layout.image_max_width", layout.image_max_width),
    ];
    for (name, value) in sizes {
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid(format!("{} must be positive, got {}", name, value)));
        }
    }

    if !(layout.margin >= 0.0 && layout.margin * 2.0 < layout.page_width.min(layout.page_height)) {
        return Err(invalid(format!(
            "layout.margin {} must be smaller than half the page",
            layout.margin
        )));
    }

    if let Some(bottom) = layout.bottom_margin {
        if !(bottom >= 0.0 && bottom < layout.top()) {
            return Err(invalid(format!(
                "layout.bottom_margin {} must lie between 0 and the top margin",
                bottom
            )));
        }
    }

    let sheet = config.export.sheet_name.trim();
    if sheet.is_empty() {
        return Err(invalid("export.sheet_name must not be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.tracker.poll_interval_ms, 3000);
        assert_eq!(config.tracker.max_poll_attempts, None);
        assert_eq!(config.layout.margin, 60.0);
        assert_eq!(config.layout.page_width, 595.28);
        assert_eq!(config.export.sheet_name, "Records");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.api.submit_path, "save-pdf-approved/");
    }

    #[test]
    fn test_load_config_with_overrides() {
        let config_json = r#"
        {
            "version": "1.0",
            "api": { "base_url": "https://backend.test/api/" },
            "tracker": { "poll_interval_ms": 500, "max_poll_attempts": 20 },
            "layout": { "margin": 40, "body_size": 10 },
            "logging": { "level": "debug", "format": "json" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.api.base_url, "https://backend.test/api/");
        assert_eq!(config.tracker.max_poll_attempts, Some(20));
        assert_eq!(config.layout.margin, 40.0);
        assert_eq!(config.layout.body_size, 10.0);
        assert_eq!(config.layout.heading_size, 16.0);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = load_config_from_str(r#"{"version": "1.0", "tracker": {"poll_interval_ms": 0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_margin_wider_than_half_page_rejected() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "layout": {"page_width": 100, "margin": 50}}"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("layout.margin"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_malformed_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }
}
