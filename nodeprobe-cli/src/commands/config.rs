//! `nodeprobe config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use nodeprobe_core::config::NodeprobeConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (missing file, parse errors, invalid values).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match NodeprobeConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = NodeprobeConfig::load_or_default(config_path).await?;
    let report = build_config_report(&config, config_path, section)?;

    writer.render(&report)?;

    Ok(())
}

fn build_config_report(
    config: &NodeprobeConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let rendered = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("docker") => toml::to_string_pretty(&config.docker),
        Some("harness") => toml::to_string_pretty(&config.harness),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, docker, harness)"
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml: rendered.unwrap_or_else(|e| format!("(serialization error: {e})")),
    })
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("nodeprobe.toml")
    }

    #[test]
    fn test_show_full_config_contains_all_sections() {
        let report = build_config_report(&NodeprobeConfig::default(), &path(), None)
            .expect("full config should render");
        assert!(report.config_toml.contains("[general]"));
        assert!(report.config_toml.contains("[docker]"));
        assert!(report.config_toml.contains("[harness]"));
        assert!(report.config_toml.contains("22.18.0"));
    }

    #[test]
    fn test_show_single_section() {
        let report =
            build_config_report(&NodeprobeConfig::default(), &path(), Some("docker".to_owned()))
                .expect("docker section should render");
        assert!(report.config_toml.contains("stop_timeout_secs = 10"));
        assert!(!report.config_toml.contains("log_level"));
    }

    #[test]
    fn test_show_unknown_section_is_command_error() {
        let err = build_config_report(&NodeprobeConfig::default(), &path(), Some("ebpf".to_owned()))
            .err()
            .expect("unknown section should fail");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("unknown section: ebpf"));
    }

    #[test]
    fn test_validation_report_render_invalid() {
        colored::control::set_override(false);
        let report = ConfigValidationReport {
            source: "nodeprobe.toml".to_owned(),
            valid: false,
            errors: vec!["invalid value for docker.timeout_secs".to_owned()],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("INVALID"));
        assert!(output.contains("docker.timeout_secs"));
    }

    #[tokio::test]
    async fn test_validate_missing_file_is_config_error() {
        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let err = execute_validate(Path::new("/nonexistent/nodeprobe.toml"), &writer)
            .await
            .expect_err("missing file should be invalid");
        assert_eq!(err.exit_code(), 2);
    }
}
