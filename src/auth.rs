use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::formats::{CodeExchangeRequest, CodeExchangeResponse};
use crate::state_store::UserRecord;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("POST {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success status, or an `errorMessage` in the body.
    #[error("auth exchange rejected: {status_text}")]
    Rejected {
        status: u16,
        status_text: String,
        message: Option<String>,
    },
    #[error("auth exchange response is not valid json: {status_text}")]
    MalformedBody {
        status_text: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AuthError {
    pub fn status_text(&self) -> Option<&str> {
        match self {
            Self::Transport { .. } => None,
            Self::Rejected { status_text, .. } | Self::MalformedBody { status_text, .. } => {
                Some(status_text.as_str())
            }
        }
    }
}

/// Trades an authorization code for the backend identity.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<UserRecord, AuthError>;
}

#[derive(Debug, Clone)]
pub struct HttpCodeExchanger {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCodeExchanger {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl CodeExchanger for HttpCodeExchanger {
    async fn exchange(&self, code: &str) -> Result<UserRecord, AuthError> {
        let endpoint = self.endpoint.as_str();
        let transport = |source: reqwest::Error| AuthError::Transport {
            endpoint: endpoint.to_owned(),
            source,
        };

        tracing::info!(endpoint, "exchanging authorization code");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&CodeExchangeRequest {
                code: code.to_owned(),
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let raw = response.text().await.map_err(transport)?;
        parse_exchange_response(status, &raw)
    }
}

fn parse_exchange_response(status: StatusCode, raw: &str) -> Result<UserRecord, AuthError> {
    let status_text = status_text(status);

    if !status.is_success() {
        let message = serde_json::from_str::<CodeExchangeResponse>(raw)
            .ok()
            .and_then(|body| body.error_message);
        tracing::warn!(%status, error_message = ?message, "auth exchange failed");
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            status_text,
            message,
        });
    }

    let body: CodeExchangeResponse =
        serde_json::from_str(raw).map_err(|source| AuthError::MalformedBody {
            status_text: status_text.clone(),
            source,
        })?;

    if let Some(message) = body.error_message {
        tracing::warn!(%status, error_message = %message, "auth endpoint returned an error payload");
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            status_text,
            message: Some(message),
        });
    }

    Ok(UserRecord {
        project_id: body.project_id.unwrap_or_default(),
        email: body.email.unwrap_or_default(),
        name: body.name.unwrap_or_default(),
    })
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| status.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_becomes_user_record() -> anyhow::Result<()> {
        let user = parse_exchange_response(
            StatusCode::OK,
            r#"{"projectId":"proj_1","email":"ada@example.com","name":"Ada"}"#,
        )?;
        assert_eq!(user.project_id, "proj_1");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        Ok(())
    }

    #[test]
    fn error_message_on_ok_status_is_a_failure() {
        let err = parse_exchange_response(StatusCode::OK, r#"{"errorMessage":"bad code"}"#)
            .unwrap_err();
        assert_eq!(err.status_text(), Some("OK"));
        assert!(matches!(
            err,
            AuthError::Rejected { message: Some(ref m), .. } if m == "bad code"
        ));
    }

    #[test]
    fn non_success_status_carries_status_text() {
        let err = parse_exchange_response(StatusCode::BAD_REQUEST, "nope").unwrap_err();
        assert_eq!(err.status_text(), Some("Bad Request"));
        assert_eq!(err.to_string(), "auth exchange rejected: Bad Request");
    }

    #[test]
    fn non_json_success_body_is_malformed() {
        let err = parse_exchange_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, AuthError::MalformedBody { .. }));
    }
}
