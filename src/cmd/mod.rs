pub mod callback;
pub mod config;
pub mod messages;
pub mod onboard;
pub mod progress;
pub mod prompts;
pub mod tenant;

use securepulse::IdentityClient;
use securepulse::config::{ConfigManager, Settings};
use securepulse::error::Result;

/// Config and resolved settings shared by every command
pub struct Context {
    pub config: ConfigManager,
    pub settings: Settings,
}

impl Context {
    pub fn load(service_url: Option<&str>) -> Result<Self> {
        let config = ConfigManager::new()?;
        let settings = config.settings(service_url)?;
        tracing::debug!(
            "Using Identity Service at {} ({})",
            settings.service_url,
            settings.environment
        );

        Ok(Self { config, settings })
    }

    pub fn client(&self) -> Result<IdentityClient> {
        IdentityClient::from_settings(&self.settings)
    }
}
