//! Admin consent handoff
//!
//! Outbound: start onboarding, remember the temporary tenant id, send the
//! user to the provider's consent page. Inbound: when the user comes back,
//! work out whether this is a consent return and which tenant to follow.

pub mod navigator;

pub use navigator::{Navigator, PrintNavigator, SystemBrowser};

use crate::error::Result;
use crate::identity::{IdentityClient, OnboardingRequest, OnboardingResponse};
use crate::session::{CONSENT_STATE_KEY, PENDING_TENANT_KEY, SessionStore};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const POPUP_WINDOW_NAME: &str = "entra-admin-consent";
pub const POPUP_WIDTH: u32 = 600;
pub const POPUP_HEIGHT: u32 = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMode {
    /// Replace the current browsing context
    #[default]
    Redirect,
    /// Open a centered secondary window
    Popup,
}

impl fmt::Display for ConsentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentMode::Redirect => write!(f, "redirect"),
            ConsentMode::Popup => write!(f, "popup"),
        }
    }
}

impl FromStr for ConsentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redirect" => Ok(ConsentMode::Redirect),
            "popup" => Ok(ConsentMode::Popup),
            _ => Err(format!("Unknown consent mode: {} (expected redirect or popup)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Placement of the consent popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub width: u32,
    pub height: u32,
    pub left: i64,
    pub top: i64,
}

impl PopupGeometry {
    /// Fixed 600x700 window centered on `screen`
    pub fn centered(screen: ScreenSize) -> Self {
        Self {
            width: POPUP_WIDTH,
            height: POPUP_HEIGHT,
            left: i64::from(screen.width) / 2 - i64::from(POPUP_WIDTH) / 2,
            top: i64::from(screen.height) / 2 - i64::from(POPUP_HEIGHT) / 2,
        }
    }

    /// `window.open` style feature list
    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={},resizable=yes,scrollbars=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Send the user to the admin consent page
pub fn redirect_to_admin_consent<N>(
    navigator: &N,
    admin_consent_url: &str,
    mode: ConsentMode,
) -> Result<()>
where
    N: Navigator + ?Sized,
{
    match mode {
        ConsentMode::Popup => {
            let geometry = PopupGeometry::centered(navigator.screen_size());
            tracing::debug!("Opening consent popup with {}", geometry.features());
            navigator.open_popup(admin_consent_url, POPUP_WINDOW_NAME, &geometry)
        }
        ConsentMode::Redirect => {
            tracing::debug!("Redirecting to consent page");
            navigator.navigate(admin_consent_url)
        }
    }
}

/// Outcome of checking the return location after consent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentCallback {
    pub is_callback: bool,
    pub tenant_id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub state: StateCheck,
}

impl ConsentCallback {
    /// True only when a stored state nonce came back unchanged
    pub fn is_verified(&self) -> bool {
        self.state == StateCheck::Verified
    }
}

/// Result of comparing the returned `state` with the stored nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateCheck {
    /// No nonce was stored; nothing to verify
    Unbound,
    Verified,
    Mismatch,
    /// A nonce was stored but the return carried none
    Missing,
}

/// Drives onboarding across the consent boundary using a session store
pub struct ConsentHandoff<S: SessionStore> {
    store: S,
    bind_state: bool,
}

impl<S: SessionStore> ConsentHandoff<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            bind_state: false,
        }
    }

    /// Append a random `state` to the consent URL and verify it on return
    pub fn with_state_binding(mut self, bind_state: bool) -> Self {
        self.bind_state = bind_state;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Initiate onboarding and hand the user to the consent page.
    ///
    /// The temporary tenant id is stored before navigation so it is there
    /// when the user returns.
    pub async fn start_onboarding_flow<N>(
        &self,
        client: &IdentityClient,
        navigator: &N,
        request: &OnboardingRequest,
        mode: ConsentMode,
    ) -> Result<OnboardingResponse>
    where
        N: Navigator + ?Sized,
    {
        let response = client.initiate_onboarding(request).await?;

        let Some(consent_url) = response.admin_consent_url.as_deref() else {
            return Err(crate::error::BackendError::invalid_response(
                "No admin consent URL received from server",
            )
            .into());
        };

        if let Some(temp_tenant_id) = &response.temp_tenant_id {
            self.store.set(PENDING_TENANT_KEY, temp_tenant_id)?;
            tracing::debug!("Stored pending tenant id '{}'", temp_tenant_id);
        }

        let target = if self.bind_state {
            self.bind_consent_state(consent_url)?
        } else {
            // A nonce left by an earlier bound flow would fail this return
            self.store.remove(CONSENT_STATE_KEY)?;
            consent_url.to_string()
        };

        redirect_to_admin_consent(navigator, &target, mode)?;
        Ok(response)
    }

    fn bind_consent_state(&self, consent_url: &str) -> Result<String> {
        let mut url = Url::parse(consent_url).map_err(|e| {
            crate::error::BackendError::invalid_response(format!(
                "Invalid response: admin consent URL is not a URL ({})",
                e
            ))
        })?;

        // Replace any provider-supplied state so exactly one comes back
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "state")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let nonce = uuid::Uuid::new_v4().to_string();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("state", &nonce);
        self.store.set(CONSENT_STATE_KEY, &nonce)?;

        Ok(url.into())
    }

    /// Inspect a return location for consent-callback signals.
    ///
    /// `location` may be a full URL or just its query string. Any of a
    /// `code` parameter, an `admin_consent` parameter or a resolvable tenant
    /// id marks a callback; the tenant id falls back to the stored pending id.
    pub fn check_consent_callback(&self, location: &str) -> Result<ConsentCallback> {
        let params = QueryParams::parse(location);

        let tenant_id = match params.non_empty("tenantId") {
            Some(id) => Some(id.to_string()),
            None => self
                .store
                .get(PENDING_TENANT_KEY)?
                .filter(|id| !id.is_empty()),
        };

        let is_callback =
            params.has("code") || params.has("admin_consent") || tenant_id.is_some();

        let state = match (self.store.get(CONSENT_STATE_KEY)?, params.non_empty("state")) {
            (None, _) => StateCheck::Unbound,
            (Some(_), None) => StateCheck::Missing,
            (Some(expected), Some(got)) if expected == got => StateCheck::Verified,
            (Some(_), Some(_)) => StateCheck::Mismatch,
        };

        Ok(ConsentCallback {
            is_callback,
            tenant_id,
            error: params.non_empty("error").map(str::to_string),
            error_description: params.non_empty("error_description").map(str::to_string),
            state,
        })
    }

    /// Forget the pending tenant id and any state nonce
    pub fn clear_onboarding_state(&self) -> Result<()> {
        self.store.remove(PENDING_TENANT_KEY)?;
        self.store.remove(CONSENT_STATE_KEY)?;
        Ok(())
    }
}

/// Decoded query parameters; the first occurrence of a key wins
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn parse(location: &str) -> Self {
        let query = match location.split_once('?') {
            Some((_, query)) => query,
            None if location.contains("://") => "",
            None => location,
        };
        let query = query.split('#').next().unwrap_or_default();

        let pairs = reqwest::Url::parse(&format!("http://callback.invalid/?{}", query))
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default();

        Self(pairs)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }
}
