use super::{Context, messages, prompts};
use clap::Args;
use colored::Colorize;
use securepulse::consent::{ConsentHandoff, ConsentMode, Navigator, PrintNavigator, SystemBrowser};
use securepulse::error::{Result, SecurePulseError};
use securepulse::identity::{Locale, OnboardingRequest, Plan};

#[derive(Args, Debug)]
pub struct OnboardArgs {
    /// Contact name
    #[arg(long)]
    name: Option<String>,

    /// Global administrator email of the tenant being onboarded
    #[arg(long)]
    admin_email: Option<String>,

    /// Company name
    #[arg(long)]
    company: Option<String>,

    /// Subscription plan (essential, professional, enterprise)
    #[arg(long)]
    plan: Option<Plan>,

    /// Locale for the consent flow (en-CA, fr-CA)
    #[arg(long)]
    locale: Option<Locale>,

    /// Open consent in the current browser window or a popup
    #[arg(long)]
    mode: Option<ConsentMode>,

    /// Print the consent URL instead of launching a browser
    #[arg(long)]
    no_browser: bool,

    /// Add a state nonce to the consent URL and verify it on return
    #[arg(long)]
    bind_state: bool,

    /// Prompt for any field not given on the command line
    #[arg(short, long)]
    interactive: bool,
}

pub async fn onboard(ctx: &Context, args: OnboardArgs) -> Result<()> {
    let request = if args.interactive {
        prompt_request(&args, ctx.settings.locale)?
    } else {
        OnboardingRequest {
            name: args.name.clone(),
            admin_email: args.admin_email.clone(),
            company: args.company.clone(),
            plan: args.plan,
            locale: Some(args.locale.unwrap_or(ctx.settings.locale)),
        }
    };
    let locale = request.locale.unwrap_or(ctx.settings.locale);
    let mode = args.mode.unwrap_or(ctx.settings.consent_mode);

    let client = ctx.client()?;
    let handoff =
        ConsentHandoff::new(ctx.config.session_store()).with_state_binding(args.bind_state);
    let navigator: Box<dyn Navigator> = if args.no_browser {
        Box::new(PrintNavigator)
    } else {
        Box::new(SystemBrowser)
    };

    prompts::info(&format!(
        "Contacting Identity Service at {}...",
        client.base_url()
    ));

    match handoff
        .start_onboarding_flow(&client, navigator.as_ref(), &request, mode)
        .await
    {
        Ok(response) => {
            prompts::success("Onboarding started");
            if let Some(tenant_id) = &response.temp_tenant_id {
                prompts::field("Pending tenant", tenant_id);
            }
            println!(
                "\n{} After granting consent, run {} with the URL you were returned to",
                "→".cyan(),
                "securepulse callback '<return-url>'".bold()
            );
            Ok(())
        }
        Err(SecurePulseError::Backend(e)) if e.is_transport() => {
            prompts::warning(&messages::backend_unavailable(locale, request.plan));
            Err(e.into())
        }
        Err(e) => Err(e),
    }
}

fn prompt_request(args: &OnboardArgs, default_locale: Locale) -> Result<OnboardingRequest> {
    prompts::section_header("SecurePulse onboarding");

    let name = match &args.name {
        Some(name) => Some(name.clone()),
        None => prompts::input_optional("Your name (optional)", None)?,
    };
    let admin_email = match &args.admin_email {
        Some(email) => Some(email.clone()),
        None => prompts::input_optional("Admin email (optional)", None)?,
    };
    let company = match &args.company {
        Some(company) => Some(company.clone()),
        None => prompts::input_optional("Company (optional)", None)?,
    };

    let plan = match args.plan {
        Some(plan) => Some(plan),
        None => {
            let options = ["essential", "professional", "enterprise", "(no plan yet)"];
            match prompts::select("Plan", &options, 1)? {
                3 => None,
                index => Some(
                    options[index]
                        .parse::<Plan>()
                        .map_err(SecurePulseError::InvalidInput)?,
                ),
            }
        }
    };

    let locale = match args.locale {
        Some(locale) => locale,
        None => {
            let options = [Locale::EnCa, Locale::FrCa];
            let default = options.iter().position(|l| *l == default_locale).unwrap_or(0);
            options[prompts::select("Locale", &options, default)?]
        }
    };

    let request = OnboardingRequest {
        name,
        admin_email,
        company,
        plan,
        locale: Some(locale),
    };

    if !prompts::confirm("Start onboarding with these details?", true)? {
        return Err(SecurePulseError::InvalidInput("Onboarding cancelled".into()));
    }

    Ok(request)
}
