//! Configuration validation command.

use serde::Serialize;
use turnward_core::error::{Severity, ValidationIssue};
use turnward_core::{ConfigError, TurnwardError};

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoaderOptions};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    warnings: Vec<String>,
}

/// Validate configuration files without running a battle.
///
/// # Errors
///
/// Returns the first configuration error found. With `--strict`,
/// warnings are reported as a validation error.
pub fn run(args: &ValidateArgs) -> Result<(), TurnwardError> {
    let loader = ConfigLoader::new(LoaderOptions::default());
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let result = loader.load(path)?;

        for warning in &result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        if args.strict && !result.warnings.is_empty() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result
                    .warnings
                    .iter()
                    .map(|w| ValidationIssue {
                        path: w.location.clone().unwrap_or_default(),
                        message: w.message.clone(),
                        severity: Severity::Error,
                    })
                    .collect(),
            }
            .into());
        }

        reports.push(FileReport {
            file: path.display().to_string(),
            warnings: result.warnings.into_iter().map(|w| w.message).collect(),
        });
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                match report.warnings.len() {
                    0 => println!("{}: ok", report.file),
                    n => println!("{}: ok ({n} warnings)", report.file),
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}
