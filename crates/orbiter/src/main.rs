//! Orbiter - Task graph inspection CLI

mod cli;
mod exit_codes;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use orbiter_core::{ConfigError, OrbiterError};
use orbiter_tasks::{DependencyConfigError, TaskGraphError};

use cli::{output, Cli};

fn main() {
    let guard = init_tracing();

    let cli = Cli::parse();
    let code = match cli.execute() {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            report(&err);
            exit_code(&err)
        }
    };

    // Flush the file layer before exiting
    drop(guard);
    std::process::exit(code);
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: warn)
/// - File: always debug-level JSON to ~/.orbiter/logs/
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Some(log_dir) = log_directory() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "orbiter.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the log directory path, creating it if needed.
fn log_directory() -> Option<std::path::PathBuf> {
    let log_dir = dirs::home_dir()?.join(".orbiter").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}

/// The dependsOn misconfiguration behind an error, if any
fn dependency_config_error(err: &anyhow::Error) -> Option<&DependencyConfigError> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<DependencyConfigError>() {
            return Some(e);
        }
        match cause.downcast_ref::<TaskGraphError>() {
            Some(TaskGraphError::Dependency(e)) => Some(e),
            _ => None,
        }
    })
}

/// Print an error to stderr; dependsOn misconfiguration gets a title and body
fn report(err: &anyhow::Error) {
    match dependency_config_error(err) {
        Some(e) if e.is_configuration_error() => {
            output::error(&e.title());
            for line in e.body_lines() {
                eprintln!("  {}", line);
            }
        }
        _ => output::error(&format!("{:#}", err)),
    }
}

/// Map an error to the process exit code
fn exit_code(err: &anyhow::Error) -> i32 {
    if dependency_config_error(err).is_some_and(DependencyConfigError::is_configuration_error) {
        return exit_codes::CONFIG_ERROR;
    }

    let config_error = err.chain().any(|cause| {
        cause.downcast_ref::<ConfigError>().is_some()
            || matches!(cause.downcast_ref::<OrbiterError>(), Some(OrbiterError::Config(_)))
    });
    if config_error {
        exit_codes::CONFIG_ERROR
    } else {
        exit_codes::ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_projects() -> DependencyConfigError {
        DependencyConfigError::InvalidProjects {
            project: "app".to_string(),
            target: "build".to_string(),
            projects: "everything".to_string(),
        }
    }

    #[test]
    fn test_dependency_misconfiguration_is_config_error() {
        let err = anyhow::Error::new(invalid_projects());
        assert_eq!(exit_code(&err), exit_codes::CONFIG_ERROR);

        let wrapped = anyhow::Error::new(TaskGraphError::Dependency(invalid_projects()));
        assert_eq!(exit_code(&wrapped), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err = anyhow::Error::new(OrbiterError::Config(ConfigError::InvalidValue {
            field: "tasks_runner.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }));
        assert_eq!(exit_code(&err), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors_exit_code() {
        let err = anyhow::Error::new(TaskGraphError::CyclicDependency("a:build".to_string()));
        assert_eq!(exit_code(&err), exit_codes::ERROR);

        let missing = anyhow::Error::new(DependencyConfigError::ProjectNotFound("ghost".to_string()));
        assert_eq!(exit_code(&missing), exit_codes::ERROR);
    }
}
