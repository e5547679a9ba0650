use std::fmt;
use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};
use serde_json::Value;
use crate::errors::TokenError;
use crate::initialization::{Azure, Credentials};

/// A bearer token for the Graph API
///
/// Acquired once per inbound request and passed by reference to every Graph call
/// made while serving that request.
pub struct AccessToken {
    access_token: String,
    expires_in: Option<i64>,
    acquired_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a new access token from an already known bearer string
    ///
    /// # Arguments
    ///
    /// * 'access_token' - the bearer string
    /// * 'expires_in' - lifetime in seconds as stated by the identity provider
    pub fn new(access_token: &str, expires_in: Option<i64>) -> Self {
        AccessToken {
            access_token: access_token.to_string(),
            expires_in,
            acquired_at: Utc::now(),
        }
    }

    /// Returns the value for an `Authorization` header
    ///
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Returns when the token stops being valid, if the provider said so
    ///
    /// None as well when the stated lifetime is beyond what a timestamp can hold.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(TimeDelta::try_seconds)
            .and_then(|d| self.acquired_at.checked_add_signed(d))
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at())
            .finish_non_exhaustive()
    }
}

/// Exchanges service principal credentials for access tokens
///
pub struct TokenProvider {
    client: reqwest::Client,
    credentials: Credentials,
    token_url: String,
    scope: String,
}

impl TokenProvider {

    /// Returns a new TokenProvider
    ///
    /// # Arguments
    ///
    /// * 'client' - http client to use for the token exchange
    /// * 'credentials' - tenant, client id and client secret
    /// * 'azure' - authority host and scope to request
    pub fn new(client: reqwest::Client, credentials: Credentials, azure: &Azure) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            azure.authority_host.trim_end_matches('/'),
            credentials.tenant_id,
        );

        TokenProvider {
            client,
            credentials,
            token_url,
            scope: azure.scope.clone(),
        }
    }

    /// Acquires a fresh access token using the client credential flow
    ///
    /// A response without an `access_token` field is a failure, whatever its status,
    /// and its payload is returned untouched in `TokenError::Rejected`.
    pub async fn acquire(&self) -> Result<AccessToken, TokenError> {
        let body: [(&str, &str);4] = [
            ("client_id", &self.credentials.client_id),
            ("client_secret", &self.credentials.client_secret),
            ("scope", &self.scope),
            ("grant_type", "client_credentials"),
        ];

        let resp = self.client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        match payload.get("access_token").and_then(Value::as_str) {
            Some(access_token) => {
                let token = AccessToken::new(access_token, payload.get("expires_in").and_then(Value::as_i64));
                info!("access token acquired, expires at {:?}", token.expires_at());
                Ok(token)
            }
            None => {
                warn!("token exchange returned no access token, status: {}", status);
                Err(TokenError::Rejected(payload))
            }
        }
    }
}
