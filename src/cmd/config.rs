use super::{Context, prompts};
use clap::Args;
use securepulse::config::ConfigManager;
use securepulse::error::Result;
use securepulse::session::{CONSENT_STATE_KEY, PENDING_TENANT_KEY, SessionStore};

#[derive(Args, Debug)]
pub struct SetUrlArgs {
    /// Identity Service base URL, e.g. http://localhost:3000
    url: String,
}

pub async fn show(ctx: &Context) -> Result<()> {
    let settings = &ctx.settings;
    let store = ctx.config.session_store();

    prompts::section_header("SecurePulse configuration");
    prompts::field("Service URL", &settings.service_url);
    prompts::field("Environment", &settings.environment.to_string());
    prompts::field("Locale", &settings.locale.to_string());
    prompts::field("Consent mode", &settings.consent_mode.to_string());
    prompts::field(
        "Poll",
        &format!(
            "{} attempts every {:?}, {} transient retries",
            settings.poll.max_attempts, settings.poll.interval, settings.poll.transient_retries
        ),
    );
    prompts::field("Timeout", &format!("{:?}", settings.request_timeout));

    prompts::section_header("Pending onboarding");
    match store.get(PENDING_TENANT_KEY)? {
        Some(tenant_id) => prompts::field("Tenant", &tenant_id),
        None => prompts::field("Tenant", "-"),
    }
    if store.get(CONSENT_STATE_KEY)?.is_some() {
        prompts::field("State nonce", "stored");
    }

    Ok(())
}

/// Works without resolving settings, so a broken configured URL can be fixed
pub async fn set_url(args: SetUrlArgs) -> Result<()> {
    ConfigManager::new()?.set_service_url(&args.url)?;
    prompts::success(&format!("Identity Service URL set to {}", args.url));
    Ok(())
}

pub async fn path(ctx: &Context) -> Result<()> {
    prompts::field("Config", &ctx.config.config_file().display().to_string());
    prompts::field("Env file", &ctx.config.env_file().display().to_string());
    prompts::field(
        "Session",
        &ctx.config.session_store().path().display().to_string(),
    );
    Ok(())
}
