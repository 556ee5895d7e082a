use super::{Context, messages, progress, prompts};
use clap::Args;
use colored::{ColoredString, Colorize};
use securepulse::error::{Result, SecurePulseError};
use securepulse::identity::{IdentityClient, Locale, PollOptions, TenantState, TenantStatus};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Tenant id (temporary or permanent)
    tenant_id: String,

    /// Print the raw JSON snapshot
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct TenantsArgs {
    /// Print the list as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Tenant id to follow
    tenant_id: String,

    /// Give up after this many status fetches
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Delay between fetches in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Retry a fetch this many times when the service is unreachable
    #[arg(long)]
    transient_retries: Option<u32>,

    /// Locale for status lines (en-CA, fr-CA)
    #[arg(long)]
    locale: Option<Locale>,
}

pub async fn status(ctx: &Context, args: StatusArgs) -> Result<()> {
    let client = ctx.client()?;
    let status = client.get_tenant_status(&args.tenant_id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}

pub async fn list(ctx: &Context, args: TenantsArgs) -> Result<()> {
    let client = ctx.client()?;
    let list = client.get_tenants_list().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if list.tenants.is_empty() {
        prompts::warning("No tenants found");
        return Ok(());
    }

    println!("\n{} ({})", "Tenants:".bold(), list.total);
    println!("{}", "─".repeat(78));
    println!(
        "{:<38} {:<24} {:<14}",
        "ID".dimmed(),
        "NAME".dimmed(),
        "STATUS".dimmed()
    );

    for tenant in &list.tenants {
        println!(
            "{:<38} {:<24} {:<14}",
            tenant.id,
            tenant.name.as_deref().unwrap_or("-"),
            colored_state(&tenant.status)
        );
    }

    Ok(())
}

pub async fn poll(ctx: &Context, args: PollArgs) -> Result<()> {
    let mut options = ctx.settings.poll.clone();
    if let Some(max_attempts) = args.max_attempts {
        options = options.max_attempts(max_attempts);
    }
    if let Some(interval_ms) = args.interval_ms {
        options = options.interval_ms(interval_ms);
    }
    if let Some(retries) = args.transient_retries {
        options = options.transient_retries(retries);
    }

    let client = ctx.client()?;
    let locale = args.locale.unwrap_or(ctx.settings.locale);
    let status = wait_for_tenant(&client, &args.tenant_id, &options, locale).await?;
    print_status(&status);

    if status.status == TenantState::Failed {
        return Err(SecurePulseError::ProvisioningFailed(status.id));
    }

    Ok(())
}

/// Poll with an attempt bar until the tenant settles
pub async fn wait_for_tenant(
    client: &IdentityClient,
    tenant_id: &str,
    options: &PollOptions,
    locale: Locale,
) -> Result<TenantStatus> {
    let bar = progress::create_attempt_bar(
        u64::from(options.max_attempts),
        messages::provisioning(locale),
    );

    let result = client
        .poll_tenant_status(tenant_id, options, |status| {
            bar.inc(1);
            bar.set_message(format!(
                "{} ({})",
                messages::provisioning(locale),
                status.status
            ));
        })
        .await;

    match &result {
        Ok(status) if status.status == TenantState::Active => {
            progress::finish_success(&bar, messages::ready(locale))
        }
        Ok(_) => progress::finish_error(&bar, messages::failed(locale)),
        Err(_) => progress::finish_error(&bar, messages::poll_error(locale)),
    }

    Ok(result?)
}

pub fn print_status(status: &TenantStatus) {
    println!();
    prompts::field("Tenant", &status.id);
    prompts::field("Status", &colored_state(&status.status).to_string());
    if let Some(name) = &status.name {
        prompts::field("Name", name);
    }
    if let Some(guid) = &status.azure_tenant_guid {
        prompts::field("Entra tenant", guid);
    }
    if let Some(email) = &status.admin_email {
        prompts::field("Admin", email);
    }
    if let Some(created) = &status.created_at {
        prompts::field("Created", created);
    }
    if let Some(provisioned) = &status.provisioned_at {
        prompts::field("Provisioned", provisioned);
    }
    if let Some(took) = provisioning_time(status) {
        prompts::field("Took", &took);
    }
}

/// Time from creation to provisioning; `None` when a timestamp is missing
/// or the clocks disagree
fn provisioning_time(status: &TenantStatus) -> Option<String> {
    let took = status.provisioned_at_utc()? - status.created_at_utc()?;
    if took < chrono::Duration::zero() {
        return None;
    }
    Some(format!("{}m {}s", took.num_minutes(), took.num_seconds() % 60))
}

fn colored_state(state: &TenantState) -> ColoredString {
    match state {
        TenantState::Active => state.as_str().green(),
        TenantState::Failed => state.as_str().red(),
        TenantState::Pending | TenantState::Provisioning => state.as_str().yellow(),
        TenantState::Other(value) => value.as_str().dimmed(),
    }
}
