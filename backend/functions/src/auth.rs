//! Token verification delegate.
//!
//! The upload pipeline never inspects tokens itself: it forwards the opaque
//! `authToken` to an external verify endpoint and acts on its verdict.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use fnrelay_config::AuthDelegateConfig;
use fnrelay_core::FunctionError;

const VERIFY_PATH: &str = "/api/externals/verify_jwt/";

/// What the delegate said about a token, with its raw JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid(Value),
    Invalid(Value),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Ask the delegate about `token`.
    ///
    /// Unreachable delegates and non-JSON answers are
    /// [`FunctionError::DelegateCommunication`]; any parseable answer is a
    /// [`Verdict`].
    async fn verify(&self, token: &str) -> Result<Verdict, FunctionError>;
}

/// `POST {server_url}/api/externals/verify_jwt/` with basic auth.
pub struct HttpTokenVerifier {
    client: Client,
    verify_url: String,
    credentials: Option<(String, String)>,
}

impl HttpTokenVerifier {
    pub fn new(config: &AuthDelegateConfig) -> Result<Self> {
        let server_url = config
            .server_url
            .as_deref()
            .context("SERVER_URL is not configured")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build auth delegate HTTP client")?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            verify_url: format!("{}{VERIFY_PATH}", server_url.trim_end_matches('/')),
            credentials,
        })
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    #[instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<Verdict, FunctionError> {
        let mut request = self
            .client
            .post(&self.verify_url)
            .json(&json!({ "accessToken": token }));
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FunctionError::DelegateCommunication(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FunctionError::DelegateCommunication(e.to_string()))?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| FunctionError::DelegateCommunication(e.to_string()))?;

        if status.as_u16() == 200 && body.get("valid") == Some(&Value::Bool(true)) {
            debug!("Auth delegate accepted token");
            Ok(Verdict::Valid(body))
        } else {
            warn!(
                status = status.as_u16(),
                response = %logging::redact_sensitive_data(&text),
                "Auth delegate rejected token"
            );
            Ok(Verdict::Invalid(body))
        }
    }
}
