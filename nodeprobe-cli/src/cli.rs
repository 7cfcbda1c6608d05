//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// nodeprobe -- build a Node.js image per version, validate it, tear it down.
///
/// Use `nodeprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "nodeprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the nodeprobe.toml configuration file.
    ///
    /// When omitted, `nodeprobe.toml` is used if present, otherwise defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, check and tear down one image per version.
    Run(RunArgs),

    /// Remove a leftover `node:<VERSION>` image and its containers.
    Cleanup(CleanupArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run validation scenarios.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Version labels to validate (build context directory names).
    ///
    /// Defaults to `--target` if set, otherwise every configured scenario.
    pub versions: Vec<String>,

    /// Scenario label supplied by the environment.
    #[arg(long, env = "TARGET_HOST")]
    pub target: Option<String>,
}

// ---- cleanup ----

/// Tear down leftovers of an earlier partial run.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Version label whose `node:<VERSION>` image should be removed.
    pub version: String,
}

// ---- config ----

/// Manage nodeprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, docker, harness).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    #[serial_test::serial]
    fn test_cli_parse_run_with_versions() {
        // SAFETY: serialised with other env-mutating tests
        unsafe { std::env::remove_var("TARGET_HOST") };
        let cli = Cli::try_parse_from(["nodeprobe", "run", "14", "22"]).expect("parse succeeded");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.versions, vec!["14", "22"]);
                assert!(args.target.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_cli_parse_run_target_flag() {
        let cli = Cli::try_parse_from(["nodeprobe", "run", "--target", "24"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.versions.is_empty());
                assert_eq!(args.target.as_deref(), Some("24"));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_cli_parse_run_target_from_env() {
        let original = std::env::var("TARGET_HOST").ok();
        // SAFETY: serialised with other env-mutating tests
        unsafe { std::env::set_var("TARGET_HOST", "22") };

        let cli = Cli::try_parse_from(["nodeprobe", "run"]).expect("parse succeeded");

        // SAFETY: restore original value
        unsafe {
            match original {
                Some(v) => std::env::set_var("TARGET_HOST", v),
                None => std::env::remove_var("TARGET_HOST"),
            }
        }

        match cli.command {
            Commands::Run(args) => assert_eq!(args.target.as_deref(), Some("22")),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_cleanup_requires_version() {
        assert!(Cli::try_parse_from(["nodeprobe", "cleanup"]).is_err());
        let cli = Cli::try_parse_from(["nodeprobe", "cleanup", "22"]).expect("parse succeeded");
        match cli.command {
            Commands::Cleanup(args) => assert_eq!(args.version, "22"),
            _ => panic!("expected Cleanup command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["nodeprobe", "config", "show", "--section", "docker"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => assert_eq!(section.as_deref(), Some("docker")),
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "nodeprobe",
            "config",
            "validate",
            "--config",
            "/etc/nodeprobe.toml",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/nodeprobe.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_invalid_output_format() {
        let result = Cli::try_parse_from(["nodeprobe", "--output", "yaml", "config", "validate"]);
        assert!(result.is_err(), "yaml is not a supported output format");
    }
}
