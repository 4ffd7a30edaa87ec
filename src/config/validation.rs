use crate::config::types::{
    Config, EnrichmentConfig, HttpConfig, OutputConfig, SelectorConfig, UserAgentConfig,
    WalkerConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Longest wait any single delay or timeout may be configured to (one day)
const MAX_SECONDS: f64 = 86_400.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_http_config(&config.http)?;
    validate_walker_config(&config.walker)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    validate_seconds("timeout_secs", config.timeout_secs)?;
    if config.timeout_secs == 0.0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    validate_seconds("retry_delay_secs", config.retry_delay_secs)
}

fn validate_walker_config(config: &WalkerConfig) -> Result<(), ConfigError> {
    validate_seconds("walker.page_delay_secs", config.page_delay_secs)?;
    validate_seconds("walker.group_delay_secs", config.group_delay_secs)?;

    if config.save_interval < 1 {
        return Err(ConfigError::Validation(
            "walker.save_interval must be >= 1".to_string(),
        ));
    }

    if config.max_pages_per_group == Some(0) {
        return Err(ConfigError::Validation(
            "walker.max_pages_per_group must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    validate_seconds("enrichment.delay_secs", config.delay_secs)?;

    if config.save_interval < 1 {
        return Err(ConfigError::Validation(
            "enrichment.save_interval must be >= 1".to_string(),
        ));
    }

    if config.required_fields.is_empty() {
        return Err(ConfigError::Validation(
            "enrichment.required_fields must name at least one field".to_string(),
        ));
    }

    if let Some(field) = config.required_fields.iter().find(|f| f.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "enrichment.required_fields contains an empty name: '{}'",
            field
        )));
    }

    Ok(())
}

/// Checks every selector parses
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("entry", &config.entry),
        ("entry-link", &config.entry_link),
        ("description", &config.description),
        ("next-page", &config.next_page),
        ("detail-table", &config.detail_table),
        ("group-link", &config.group_link),
    ] {
        parse_selector(field, selector)?;
    }
    Ok(())
}

/// Parses a CSS selector, mapping failures to a config error
pub(crate) fn parse_selector(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        message: format!("'{}': {:?}", selector, e),
    })
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("groups_path", &config.groups_path),
        ("records_path", &config.records_path),
        ("checkpoint_path", &config.checkpoint_path),
        ("complete_path", &config.complete_path),
        ("detail_path", &config.detail_path),
    ] {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.checkpoint_path == config.records_path {
        return Err(ConfigError::Validation(
            "checkpoint_path must differ from records_path".to_string(),
        ));
    }

    if config.summary_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    if config.database_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "database_path cannot be empty when set".to_string(),
        ));
    }

    if config.report_top_n < 1 {
        return Err(ConfigError::Validation(
            "report_top_n must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Delays and timeouts must be finite, non-negative and at most a day
fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 || value > MAX_SECONDS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0 and {} seconds, got {}",
            name, MAX_SECONDS, value
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_seconds() {
        assert!(validate_seconds("x", 0.0).is_ok());
        assert!(validate_seconds("x", 2.5).is_ok());

        assert!(validate_seconds("x", -1.0).is_err());
        assert!(validate_seconds("x", f64::NAN).is_err());
        assert!(validate_seconds("x", f64::INFINITY).is_err());
        assert!(validate_seconds("x", MAX_SECONDS + 1.0).is_err());
    }

    #[test]
    fn test_zero_retry_attempts_rejected() {
        let mut config = Config::default();
        config.http.retry_attempts = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.http.timeout_secs = 0.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_save_interval_rejected() {
        let mut config = Config::default();
        config.enrichment.save_interval = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.walker.save_interval = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_required_fields_rejected() {
        let mut config = Config::default();
        config.enrichment.required_fields.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut config = Config::default();
        config.selectors.next_page = "a[[".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_checkpoint_must_not_overwrite_records() {
        let mut config = Config::default();
        config.output.checkpoint_path = config.output.records_path.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
