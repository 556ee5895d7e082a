use serde_json::Value;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classified failure of an Identity Service call.
///
/// Callers tell the classes apart with [`BackendError::status_code`]: only
/// `Http` carries one.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The service could not be reached (DNS, refused connection, timeout).
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },

    /// The service answered with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    /// The service answered 2xx but the body broke the contract.
    #[error("{message}")]
    InvalidResponse {
        message: String,
        details: Option<Value>,
    },

    #[error("Polling timeout: provisioning did not complete in expected time")]
    PollingTimeout { attempts: u32 },
}

impl BackendError {
    pub fn transport(context: &str, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Transport {
            message: format!("{}: {}", context, source),
            source,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status of the failed response, `None` for every other class.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Http { details, .. } | Self::InvalidResponse { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PollingTimeout { .. })
    }
}

#[derive(Error, Debug)]
pub enum SecurePulseError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Session store error: {0}")]
    Session(#[from] crate::session::SessionError),

    #[error("Could not open consent page: {0}")]
    NavigationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provisioning failed for tenant '{0}'")]
    ProvisioningFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Interactive prompt error: {0}")]
    DialoguerError(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, SecurePulseError>;

pub use SecurePulseError as Error;

/// Pull a human-readable message out of an Identity Service error body.
///
/// Accepts both `{"error": "text"}` and `{"error": {"code", "message"}}`.
pub fn error_message_from_body(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(obj) => {
            let code = obj.get("code").and_then(|c| c.as_str());
            let message = obj.get("message").and_then(|m| m.as_str());
            match (code, message) {
                (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
                (None, Some(message)) => Some(message.to_string()),
                (Some(code), None) => Some(code.to_string()),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

/// Render a backend failure with a hint for the operator
pub fn describe_backend_error(error: &BackendError) -> String {
    let hint = match error {
        BackendError::Transport { .. } => {
            "\nHint: the Identity Service is unreachable. Check --service-url or run in demo mode."
        }
        BackendError::Http { status: 401 | 403, .. } => {
            "\nHint: the Identity Service rejected the request. Check that the tenant exists and the caller is allowed."
        }
        BackendError::Http { status: 404, .. } => {
            "\nHint: the tenant id is unknown to the Identity Service."
        }
        BackendError::Http { status: 429, .. } => {
            "\nHint: rate limit exceeded. Wait a moment and try again."
        }
        BackendError::Http { status, .. } if *status >= 500 => {
            "\nHint: the Identity Service failed internally. Try again later."
        }
        BackendError::InvalidResponse { .. } => {
            "\nHint: the Identity Service returned an unexpected payload. It may be running an incompatible version."
        }
        BackendError::PollingTimeout { .. } => {
            "\nHint: provisioning is still running. Re-run 'securepulse poll <tenant-id>' to keep waiting."
        }
        _ => "",
    };

    format!("{}{}", error, hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_code_only_on_http() {
        let http = BackendError::Http {
            status: 503,
            message: "down".into(),
            details: None,
        };
        assert_eq!(http.status_code(), Some(503));

        let transport = BackendError::transport("Failed to connect", "connection refused");
        assert_eq!(transport.status_code(), None);
        assert!(transport.is_transport());
        assert_eq!(
            transport.to_string(),
            "Failed to connect: connection refused"
        );

        let timeout = BackendError::PollingTimeout { attempts: 3 };
        assert_eq!(timeout.status_code(), None);
        assert!(timeout.is_timeout());
    }

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(
            error_message_from_body(&json!({"error": "Plan not available"})).as_deref(),
            Some("Plan not available")
        );
        assert_eq!(
            error_message_from_body(&json!({"error": {"code": "BadRequest", "message": "nope"}}))
                .as_deref(),
            Some("BadRequest: nope")
        );
        assert_eq!(error_message_from_body(&json!({})), None);
        assert_eq!(error_message_from_body(&json!({"error": ""})), None);
    }

    #[test]
    fn test_describe_adds_hint() {
        let err = BackendError::PollingTimeout { attempts: 60 };
        let text = describe_backend_error(&err);
        assert!(text.starts_with("Polling timeout"));
        assert!(text.contains("securepulse poll"));
    }
}
