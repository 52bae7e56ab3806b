//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::project::DependsOn;

use super::types::WorkspaceConfig;

/// Validate configuration
pub fn validate_config(config: &WorkspaceConfig) -> Result<()> {
    debug!("validating configuration");
    validate_target_defaults(config)?;
    validate_tasks_runner(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_target_defaults(config: &WorkspaceConfig) -> Result<()> {
    for (target, defaults) in &config.target_defaults {
        if target.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target_defaults".to_string(),
                message: "target name cannot be empty".to_string(),
            }
            .into());
        }

        for (i, entry) in defaults.depends_on.iter().enumerate() {
            let field = format!("target_defaults.{}.depends_on[{}]", target, i);
            match entry {
                DependsOn::Shorthand(s) if s.is_empty() || s == "^" => {
                    return Err(ConfigError::InvalidValue {
                        field,
                        message: "target name cannot be empty".to_string(),
                    }
                    .into());
                }
                DependsOn::Config(c) if c.projects != "self" && c.projects != "dependencies" => {
                    return Err(ConfigError::InvalidValue {
                        field,
                        message: format!(
                            "projects is \"{}\" but should be \"self\" or \"dependencies\"",
                            c.projects
                        ),
                    }
                    .into());
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn validate_tasks_runner(config: &WorkspaceConfig) -> Result<()> {
    if config.tasks_runner.concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            field: "tasks_runner.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetDefaults;
    use crate::project::TargetDependencyConfig;

    fn config_with_defaults(target: &str, depends_on: Vec<DependsOn>) -> WorkspaceConfig {
        let mut config = WorkspaceConfig::default();
        config
            .target_defaults
            .insert(target.to_string(), TargetDefaults { depends_on });
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WorkspaceConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_projects_value() {
        let config = config_with_defaults(
            "build",
            vec![TargetDependencyConfig::new("everything", "build").into()],
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("target_defaults.build.depends_on[0]"));
    }

    #[test]
    fn test_rejects_empty_shorthand() {
        let config = config_with_defaults("build", vec![DependsOn::from("^")]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_accepts_valid_entries() {
        let config = config_with_defaults(
            "test",
            vec![
                DependsOn::from("^build"),
                TargetDependencyConfig::new("self", "build").into(),
            ],
        );
        assert!(validate_config(&config).is_ok());
    }
}
