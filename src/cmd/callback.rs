use super::{Context, prompts, tenant};
use clap::Args;
use securepulse::consent::{ConsentHandoff, StateCheck};
use securepulse::error::{Result, SecurePulseError};
use securepulse::identity::{Locale, TenantState};

#[derive(Args, Debug)]
pub struct CallbackArgs {
    /// URL the consent page returned to (or just its query string)
    location: String,

    /// Report the callback without waiting for provisioning
    #[arg(long)]
    no_wait: bool,

    /// Refuse returns whose state nonce is missing or does not match
    #[arg(long)]
    require_state: bool,

    /// Locale for status lines (en-CA, fr-CA)
    #[arg(long)]
    locale: Option<Locale>,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

pub async fn callback(ctx: &Context, args: CallbackArgs) -> Result<()> {
    let handoff = ConsentHandoff::new(ctx.config.session_store());
    let callback = handoff.check_consent_callback(&args.location)?;
    let locale = args.locale.unwrap_or(ctx.settings.locale);

    if let Some(error) = &callback.error {
        let message = match &callback.error_description {
            Some(description) => format!("Consent returned '{}': {}", error, description),
            None => format!("Consent returned '{}'", error),
        };
        prompts::error(&message);
    }

    if !callback.is_callback {
        prompts::warning("This location is not a return from the admin consent page");
        return Ok(());
    }

    match callback.state {
        StateCheck::Verified => prompts::success("Consent state verified"),
        StateCheck::Mismatch | StateCheck::Missing if args.require_state => {
            return Err(SecurePulseError::InvalidInput(format!(
                "consent state check failed ({:?})",
                callback.state
            )));
        }
        StateCheck::Mismatch => prompts::warning("Consent state does not match this session"),
        StateCheck::Missing => prompts::warning("Consent return carried no state"),
        StateCheck::Unbound => {}
    }

    let Some(tenant_id) = callback.tenant_id else {
        prompts::warning("Consent return detected but no tenant id is known");
        return Ok(());
    };
    prompts::field("Tenant", &tenant_id);

    if args.no_wait {
        prompts::info(&format!(
            "Run 'securepulse poll {}' to follow provisioning",
            tenant_id
        ));
        return Ok(());
    }

    let client = ctx.client()?;
    let status =
        tenant::wait_for_tenant(&client, &tenant_id, &ctx.settings.poll, locale).await?;
    handoff.clear_onboarding_state()?;

    tenant::print_status(&status);
    if status.status == TenantState::Failed {
        return Err(SecurePulseError::ProvisioningFailed(status.id));
    }

    Ok(())
}

pub async fn clear(ctx: &Context, args: ClearArgs) -> Result<()> {
    if !args.yes && !prompts::confirm("Forget the pending onboarding state?", false)? {
        return Ok(());
    }

    ConsentHandoff::new(ctx.config.session_store()).clear_onboarding_state()?;
    prompts::success("Onboarding state cleared");
    Ok(())
}
