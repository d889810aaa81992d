//! Settings validation.

use super::BrowserSettings;
use crate::error::ConfigError;
use crate::results::TiePolicy;
use std::collections::HashSet;

/// Validate tie tolerance parameters (finite and non-negative).
pub fn validate_tie_policy(policy: &TiePolicy) -> Result<(), ConfigError> {
    if !policy.floor.is_finite() || policy.floor < 0.0 {
        return Err(ConfigError::ValidationFailed(format!(
            "Tie floor must be a non-negative number, got: {}",
            policy.floor
        )));
    }
    if !policy.sigma_multiplier.is_finite() || policy.sigma_multiplier < 0.0 {
        return Err(ConfigError::ValidationFailed(format!(
            "Tie sigma multiplier must be a non-negative number, got: {}",
            policy.sigma_multiplier
        )));
    }
    Ok(())
}

/// Validate backend ordering (no blank or repeated entries).
pub fn validate_backend_order(order: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for env in order {
        if env.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Backend order contains an empty name".to_string(),
            ));
        }
        if !seen.insert(env.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Backend '{}' appears more than once in backend order",
                env
            )));
        }
    }
    Ok(())
}

/// Validate full settings.
pub fn validate_settings(settings: &BrowserSettings) -> Result<(), ConfigError> {
    if settings.results_path.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Results path cannot be empty".to_string(),
        ));
    }
    if let Some(context) = &settings.default_context {
        if context.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Default context cannot be blank".to_string(),
            ));
        }
    }
    validate_tie_policy(&settings.tie_policy)?;
    validate_backend_order(&settings.backend_order)?;
    Ok(())
}
