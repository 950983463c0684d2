//! oidc-policy - validate OpenID Connect provider policy configuration
//!
//! Loads a configuration document, runs the full validation pass and
//! reports every error and warning at once.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use oidc_policy::{
    cli::{Cli, Command, ReportFormat},
    config::OidcConfig,
    provider, setup_tracing,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            eprintln!("❌ {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Validate { format } => run_validate(&config, format),
        Command::Discovery => run_discovery(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: Option<&Path>) -> anyhow::Result<OidcConfig> {
    let config = OidcConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration from the environment".to_string(),
    })?;
    info!(
        clients = config.clients.len(),
        jwks = config.jwks.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Validate and print the report
fn run_validate(config: &OidcConfig, format: ReportFormat) -> anyhow::Result<ExitCode> {
    let (model, report) = provider::validate(config);

    match format {
        ReportFormat::Json => {
            println!("{}", report.format_json().context("Failed to serialize report")?);
        }
        ReportFormat::Text => print!("{}", report.format_text()),
    }
    info!(clients = model.clients.len(), valid = report.is_valid(), "Validation finished");

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print the discovery aggregate of a valid configuration
fn run_discovery(config: &OidcConfig) -> anyhow::Result<ExitCode> {
    let (model, report) = match provider::build_policy_model(config) {
        Ok(built) => built,
        Err(e) => {
            if let Some(report) = e.report() {
                eprint!("{}", report.format_text());
                return Ok(ExitCode::FAILURE);
            }
            return Err(e).context("Failed to build policy model");
        }
    };

    for issue in report.warnings() {
        eprintln!("⚠️  {issue}");
    }

    let json = serde_json::to_string_pretty(&model.discovery)
        .context("Failed to serialize discovery metadata")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}
