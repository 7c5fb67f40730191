//! Configuration validation utilities.

use std::collections::HashSet;

use objgate_core::{AttrLocator, AttributeMatcher};

use super::error::{ConfigError, ConfigResult};
use super::schema::{GateConfig, GateSettings, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &GateConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_gate_settings(&config.gate)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if logging.max_files == 0 {
        return Err(ConfigError::validation(
            "logging.max_files must be greater than 0",
        ));
    }

    Ok(())
}

/// Validates dispatch settings.
///
/// Coercion names are checked later, when the settings are compiled against
/// a [`CoercionRegistry`](crate::CoercionRegistry).
pub fn validate_gate_settings(gate: &GateSettings) -> ConfigResult<()> {
    if gate.sources.is_empty() {
        return Err(ConfigError::validation(
            "gate.sources must name at least one source",
        ));
    }

    let mut seen = HashSet::new();
    for source in &gate.sources {
        if !seen.insert(source.as_str()) {
            return Err(ConfigError::validation(format!(
                "Duplicate source: {source}"
            )));
        }
    }

    let reserved = [
        &gate.reserved.attr,
        &gate.reserved.help,
        &gate.reserved.output_mode,
    ];
    let mut names = HashSet::new();
    for name in reserved.into_iter().chain(&gate.constructor_args) {
        if name.is_empty() {
            return Err(ConfigError::validation(
                "Reserved and constructor argument names must not be empty",
            ));
        }
        if !names.insert(name.as_str()) {
            return Err(ConfigError::validation(format!(
                "Argument name '{name}' is used more than once among reserved and constructor names"
            )));
        }
    }

    AttributeMatcher::compile(&gate.permissions)?;

    if let Some(pattern) = &gate.attr_from_path {
        let locator = AttrLocator::path_pattern(pattern)?;
        if let AttrLocator::PathPattern(regex) = &locator
            && regex.captures_len() < 2
        {
            return Err(ConfigError::validation(format!(
                "gate.attr_from_path must contain a capture group: {pattern}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objgate_core::AttributeSpec;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GateConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = GateConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("objgate.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_sources() {
        let mut gate = GateSettings::default();
        gate.sources.clear();
        assert!(validate_gate_settings(&gate).is_err());

        gate.sources = vec!["query".into(), "query".into()];
        assert!(validate_gate_settings(&gate).is_err());
    }

    #[test]
    fn test_constructor_arg_collides_with_reserved() {
        let gate = GateSettings {
            constructor_args: vec!["user".into(), "_help".into()],
            ..Default::default()
        };
        let err = validate_gate_settings(&gate).unwrap_err();
        assert!(err.to_string().contains("_help"));
    }

    #[test]
    fn test_invalid_permission_pattern() {
        let gate = GateSettings {
            permissions: AttributeSpec::Pattern("greet(".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_gate_settings(&gate),
            Err(ConfigError::Pattern(_))
        ));
    }

    #[test]
    fn test_attr_from_path_needs_group() {
        let mut gate = GateSettings {
            attr_from_path: Some("^/api/.*$".into()),
            ..Default::default()
        };
        assert!(validate_gate_settings(&gate).is_err());

        gate.attr_from_path = Some("^/api/([\\w.]+)$".into());
        assert!(validate_gate_settings(&gate).is_ok());
    }
}
