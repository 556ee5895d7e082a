//! Wire types for the Identity Service API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription plan offered at onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Essential,
    Professional,
    Enterprise,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Essential => write!(f, "essential"),
            Plan::Professional => write!(f, "professional"),
            Plan::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "essential" => Ok(Plan::Essential),
            "professional" => Ok(Plan::Professional),
            "enterprise" => Ok(Plan::Enterprise),
            _ => Err(format!(
                "Unknown plan: {} (expected essential, professional or enterprise)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en-CA")]
    EnCa,
    #[serde(rename = "fr-CA")]
    FrCa,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::EnCa => write!(f, "en-CA"),
            Locale::FrCa => write!(f, "fr-CA"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "en-ca" | "en" => Ok(Locale::EnCa),
            "fr-ca" | "fr" => Ok(Locale::FrCa),
            _ => Err(format!("Unknown locale: {} (expected en-CA or fr-CA)", s)),
        }
    }
}

/// Body of `POST /api/onboard`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_consent_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Raw success body of `POST /api/onboard` before the consent URL is checked
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OnboardBody {
    #[serde(default)]
    pub admin_consent_url: Option<String>,
    #[serde(default)]
    pub temp_tenant_id: Option<String>,
}

/// Provisioning state of a tenant.
///
/// Values the client does not know are kept in `Other` and serialize back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TenantState {
    Pending,
    Provisioning,
    Active,
    Failed,
    Other(String),
}

impl TenantState {
    /// `active` and `failed` end provisioning
    pub fn is_terminal(&self) -> bool {
        matches!(self, TenantState::Active | TenantState::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TenantState::Pending => "pending",
            TenantState::Provisioning => "provisioning",
            TenantState::Active => "active",
            TenantState::Failed => "failed",
            TenantState::Other(value) => value,
        }
    }
}

impl From<String> for TenantState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => TenantState::Pending,
            "provisioning" => TenantState::Provisioning,
            "active" => TenantState::Active,
            "failed" => TenantState::Failed,
            _ => TenantState::Other(value),
        }
    }
}

impl From<TenantState> for String {
    fn from(state: TenantState) -> Self {
        match state {
            TenantState::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TenantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by `GET /api/tenant/{id}/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantStatus {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_tenant_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: TenantState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_at: Option<String>,
}

impl TenantStatus {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `created_at` as a UTC timestamp, when the service sent RFC 3339
    pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }

    pub fn provisioned_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        parse_timestamp(self.provisioned_at.as_deref()?)
    }
}

fn parse_timestamp(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&chrono::Utc))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantsListResponse {
    pub tenants: Vec<TenantStatus>,
    pub total: usize,
}
