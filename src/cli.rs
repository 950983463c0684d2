//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Validate OpenID Connect provider policy configuration
#[derive(Parser, Debug)]
#[command(name = "oidc-policy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "OIDC_POLICY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "OIDC_POLICY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "OIDC_POLICY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full validation pass and report errors and warnings
    Validate {
        /// Report format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Print the discovery metadata of a valid configuration as JSON
    Discovery,
}

/// Validation report output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable lines
    Text,
    /// JSON document
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_validate_with_global_flags() {
        // GIVEN/WHEN: flags placed after the subcommand
        let cli = Cli::try_parse_from([
            "oidc-policy",
            "validate",
            "--config",
            "oidc.yaml",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .unwrap();

        // THEN: global flags still apply
        assert_eq!(cli.config, Some(PathBuf::from("oidc.yaml")));
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(
            cli.command,
            Command::Validate {
                format: ReportFormat::Json
            }
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["oidc-policy"]).is_err());
    }

    #[test]
    fn discovery_defaults() {
        let cli = Cli::try_parse_from(["oidc-policy", "discovery", "-c", "x.yaml"]).unwrap();
        assert!(matches!(cli.command, Command::Discovery));
        assert_eq!(cli.log_level, "warn");
    }
}
