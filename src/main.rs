mod cmd;

use clap::{Parser, Subcommand};
use colored::Colorize;
use securepulse::config::ConfigManager;
use securepulse::error::{self, SecurePulseError, describe_backend_error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "securepulse",
    about = "Onboard Microsoft 365 tenants to SecurePulse",
    version,
    long_about = "Client for the SecurePulse Identity Service\n\n\
                  Starts tenant onboarding, hands off to Entra ID admin consent,\n\
                  and follows provisioning until the tenant is active."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Identity Service base URL (overrides env and config)
    #[arg(long, global = true)]
    service_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start onboarding and open the admin consent page
    Onboard(cmd::onboard::OnboardArgs),

    /// Handle the return from the admin consent page
    Callback(cmd::callback::CallbackArgs),

    /// Show the provisioning status of a tenant
    Status(cmd::tenant::StatusArgs),

    /// List tenants known to the Identity Service
    Tenants(cmd::tenant::TenantsArgs),

    /// Wait for a tenant to finish provisioning
    Poll(cmd::tenant::PollArgs),

    /// Forget the pending onboarding state
    Clear(cmd::callback::ClearArgs),

    /// Inspect or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show resolved settings and pending onboarding state
    Show,

    /// Persist the Identity Service base URL
    #[command(name = "set-url")]
    SetUrl(cmd::config::SetUrlArgs),

    /// Print config and session file locations
    Path,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let message = match &e {
            SecurePulseError::Backend(backend) => describe_backend_error(backend),
            other => other.to_string(),
        };
        eprintln!("{} {}", "Error:".red().bold(), message);
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let config_level = ConfigManager::new()
        .and_then(|manager| manager.load_config())
        .ok()
        .and_then(|config| config.log_level);
    let rust_log = std::env::var("RUST_LOG").ok();
    if let Some(directive) = log_filter(cli.verbose, rust_log, config_level.as_deref()) {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(directive))
            .with_writer(std::io::stderr)
            .init();
    }

    if let Commands::Config(ConfigCommands::SetUrl(args)) = cli.command {
        return cmd::config::set_url(args).await;
    }

    let ctx = cmd::Context::load(cli.service_url.as_deref())?;

    match cli.command {
        Commands::Onboard(args) => cmd::onboard::onboard(&ctx, args).await?,
        Commands::Callback(args) => cmd::callback::callback(&ctx, args).await?,
        Commands::Status(args) => cmd::tenant::status(&ctx, args).await?,
        Commands::Tenants(args) => cmd::tenant::list(&ctx, args).await?,
        Commands::Poll(args) => cmd::tenant::poll(&ctx, args).await?,
        Commands::Clear(args) => cmd::callback::clear(&ctx, args).await?,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => cmd::config::show(&ctx).await?,
            ConfigCommands::SetUrl(args) => cmd::config::set_url(args).await?,
            ConfigCommands::Path => cmd::config::path(&ctx).await?,
        },
    }

    Ok(())
}

/// Filter directive: `--verbose`, then `RUST_LOG`, then `log_level` from config.toml
fn log_filter(
    verbose: bool,
    rust_log: Option<String>,
    config_level: Option<&str>,
) -> Option<String> {
    if verbose {
        return Some("securepulse=debug".to_string());
    }
    if let Some(directive) = rust_log.filter(|d| !d.trim().is_empty()) {
        return Some(directive);
    }

    let level = config_level.map(str::trim).filter(|l| !l.is_empty())?;
    if level.contains('=') {
        Some(level.to_string())
    } else {
        Some(format!("securepulse={}", level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_precedence() {
        assert_eq!(
            log_filter(true, Some("warn".into()), Some("info")).as_deref(),
            Some("securepulse=debug")
        );
        assert_eq!(
            log_filter(false, Some("reqwest=trace".into()), Some("info")).as_deref(),
            Some("reqwest=trace")
        );
        assert_eq!(log_filter(false, None, None), None);
    }

    #[test]
    fn test_log_filter_uses_config_level() {
        assert_eq!(
            log_filter(false, None, Some("debug")).as_deref(),
            Some("securepulse=debug")
        );
        let directive = "securepulse=trace,reqwest=warn";
        assert_eq!(
            log_filter(false, Some(" ".into()), Some(directive)).as_deref(),
            Some(directive)
        );
        assert_eq!(log_filter(false, None, Some("  ")), None);
    }
}
