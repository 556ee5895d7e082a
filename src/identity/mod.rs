pub mod poll;
pub mod types;

pub use poll::{PollOptions, StatusSource, poll_tenant_status};
pub use types::{
    Locale, OnboardingRequest, OnboardingResponse, Plan, TenantState, TenantStatus,
    TenantsListResponse,
};

use crate::config::Settings;
use crate::error::{BackendError, SecurePulseError, error_message_from_body};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use types::OnboardBody;

const ONBOARD_PATH: &str = "api/onboard";
const TENANTS_PATH: &str = "api/tenants";

/// HTTP client for the SecurePulse Identity Service.
///
/// Calls are unauthenticated and never retried here; every failure comes back
/// as a classified [`BackendError`].
#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    pub fn with_http_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Build a client from resolved settings (base URL and request timeout)
    pub fn from_settings(settings: &Settings) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("securepulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SecurePulseError::ConfigError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_http_client(settings.service_url.clone(), client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start onboarding: `POST /api/onboard`.
    ///
    /// Succeeds only when the service hands back a non-empty admin consent URL.
    pub async fn initiate_onboarding(
        &self,
        request: &OnboardingRequest,
    ) -> Result<OnboardingResponse, BackendError> {
        const CONTEXT: &str = "Failed to connect to Identity Service";

        let url = self.endpoint(ONBOARD_PATH);
        tracing::debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::transport(CONTEXT, e))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let details = serde_json::from_str::<Value>(&error_text)
                .unwrap_or_else(|_| Value::Object(Default::default()));
            let message = error_message_from_body(&details)
                .unwrap_or_else(|| format!("Onboarding failed with status {}", status.as_u16()));

            tracing::warn!("Onboarding rejected ({}): {}", status, message);
            return Err(BackendError::Http {
                status: status.as_u16(),
                message,
                details: Some(details),
            });
        }

        let body: OnboardBody = decode_json(resp, CONTEXT).await?;
        let admin_consent_url = match body.admin_consent_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                tracing::warn!("Onboarding response carried no admin consent URL");
                return Err(BackendError::invalid_response(
                    "Invalid response: missing adminConsentUrl",
                ));
            }
        };

        Ok(OnboardingResponse {
            success: true,
            admin_consent_url: Some(admin_consent_url),
            temp_tenant_id: body.temp_tenant_id.filter(|id| !id.is_empty()),
            error: None,
        })
    }

    /// Fetch one provisioning snapshot: `GET /api/tenant/{id}/status`
    pub async fn get_tenant_status(&self, tenant_id: &str) -> Result<TenantStatus, BackendError> {
        const CONTEXT: &str = "Network error fetching tenant status";

        let url = self.endpoint(&format!(
            "api/tenant/{}/status",
            urlencoding::encode(tenant_id)
        ));
        let resp = self.get(&url, CONTEXT).await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("Tenant status for '{}' failed: {}", tenant_id, status);
            return Err(BackendError::Http {
                status: status.as_u16(),
                message: format!("Failed to fetch tenant status: {}", status.as_u16()),
                details: None,
            });
        }

        decode_json(resp, CONTEXT).await
    }

    /// List tenants: `GET /api/tenants`.
    ///
    /// A body that is not a JSON array is read as an empty list.
    pub async fn get_tenants_list(&self) -> Result<TenantsListResponse, BackendError> {
        const CONTEXT: &str = "Network error fetching tenants";

        let url = self.endpoint(TENANTS_PATH);
        let resp = self.get(&url, CONTEXT).await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("Tenant list failed: {}", status);
            return Err(BackendError::Http {
                status: status.as_u16(),
                message: format!("Failed to fetch tenants: {}", status.as_u16()),
                details: None,
            });
        }

        let data: Value = decode_json(resp, CONTEXT).await?;
        if !data.is_array() {
            tracing::debug!("Tenant list body was not an array, treating as empty");
            return Ok(TenantsListResponse::default());
        }

        let tenants: Vec<TenantStatus> = serde_json::from_value(data).map_err(|e| {
            BackendError::invalid_response(format!("Invalid response: {}", e))
        })?;
        let total = tenants.len();

        Ok(TenantsListResponse { tenants, total })
    }

    /// Poll until the tenant reaches `active` or `failed`.
    ///
    /// See [`poll::poll_tenant_status`] for the attempt and error rules.
    pub async fn poll_tenant_status<F>(
        &self,
        tenant_id: &str,
        options: &PollOptions,
        on_progress: F,
    ) -> Result<TenantStatus, BackendError>
    where
        F: FnMut(&TenantStatus),
    {
        poll::poll_tenant_status(self, tenant_id, options, on_progress).await
    }

    async fn get(&self, url: &str, context: &str) -> Result<Response, BackendError> {
        tracing::debug!("GET {}", url);

        self.client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| BackendError::transport(context, e))
    }
}

impl StatusSource for IdentityClient {
    fn fetch_status(
        &self,
        tenant_id: &str,
    ) -> impl Future<Output = Result<TenantStatus, BackendError>> + Send {
        self.get_tenant_status(tenant_id)
    }
}

/// Read a 2xx body and decode it; a body that is not the expected JSON is a
/// contract violation, a body that cannot be read is a transport failure.
async fn decode_json<T: DeserializeOwned>(
    resp: Response,
    context: &str,
) -> Result<T, BackendError> {
    let raw = resp
        .bytes()
        .await
        .map_err(|e| BackendError::transport(context, e))?;

    serde_json::from_slice(&raw).map_err(|e| BackendError::InvalidResponse {
        message: format!("Invalid response: {}", e),
        details: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = IdentityClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(
            client.endpoint("/api/onboard"),
            "http://localhost:3000/api/onboard"
        );
    }
}
