use crate::config::types::{Config, CrawlerConfig, OutputConfig, PlatformConfig, SeedConfig, UserAgentConfig};
use crate::node::NodeId;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_platform_config(&config.platform)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // The platform allows roughly one request per second per client
    if config.request_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be >= 100ms, got {}ms",
            config.request_delay_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates platform endpoint configuration
fn validate_platform_config(config: &PlatformConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    // Plain HTTP is accepted so the client can be pointed at a local mock
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' cannot be used as a base",
            config.base_url
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let files = [
        ("records_file", &config.records_file),
        ("checkpoint_file", &config.checkpoint_file),
        ("error_log", &config.error_log),
        ("seed_cache", &config.seed_cache),
    ];

    for (name, value) in files {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    for (i, (name, value)) in files.iter().enumerate() {
        if files[i + 1..].iter().any(|(_, other)| other == value) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' is also used by another output file",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates explicit seed names
fn validate_seeds(config: &SeedConfig) -> Result<(), ConfigError> {
    for name in &config.names {
        NodeId::normalize(name).map_err(|e| {
            ConfigError::Validation(format!("Invalid seed '{}': {}", name, e))
        })?;
    }
    Ok(())
}

/// Basic email validation: one `@`, a non-empty local part and a dotted domain
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let invalid = || ConfigError::Validation(format!("Invalid contact_email: '{}'", email));
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "contact_email domain '{}' has no dot",
            domain
        )));
    }

    Ok(())
}
