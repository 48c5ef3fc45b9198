use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::client::{build_http_client, join_url, SUBSCRIPTIONS_API_VERSION};
use crate::error::ArmError;
use crate::profile::{AccessToken, AccountSubscription, AuthConfig, Environment};
use crate::services::Identity;

/// Active Directory password-grant login and subscription discovery.
pub struct AadIdentity {
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds, sent as a string by the token endpoint.
    expires_in: serde_json::Value,
}

#[derive(Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    value: Vec<AccountSubscription>,
}

impl AadIdentity {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    fn client(&self) -> Result<Client> {
        build_http_client(self.timeout_secs)
    }
}

fn parse_expires_in(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl Identity for AadIdentity {
    fn acquire_token(
        &self,
        auth: &AuthConfig,
        username: &str,
        password: &str,
    ) -> Result<AccessToken> {
        let url = join_url(
            &auth.authority_url,
            &format!("{}/oauth2/token", urlencoding::encode(&auth.tenant_id)),
        );
        tracing::debug!(%url, %username, "requesting access token");

        let response = self
            .client()?
            .post(&url)
            .form(&[
                ("grant_type", "password"),
                ("resource", auth.resource_id.as_str()),
                ("client_id", auth.client_id.as_str()),
                ("username", username),
                ("password", password),
            ])
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let body = response.text().context("failed to read token response")?;
        if !status.is_success() {
            return Err(ArmError::from_response(status.as_u16(), &body).into());
        }

        let token: TokenResponse =
            serde_json::from_str(&body).context("failed to parse token response")?;
        let expires_in = parse_expires_in(&token.expires_in)
            .context("token response has no usable expires_in")?;

        Ok(AccessToken {
            auth_config: auth.clone(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        })
    }

    fn account_subscriptions(
        &self,
        environment: &Environment,
        token: &AccessToken,
    ) -> Result<Vec<AccountSubscription>> {
        let url = join_url(
            &environment.resource_management_endpoint_url,
            &format!("subscriptions?api-version={}", SUBSCRIPTIONS_API_VERSION),
        );
        tracing::debug!(%url, "listing subscriptions");

        let response = self
            .client()?
            .get(&url)
            .bearer_auth(&token.access_token)
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let body = response.text().context("failed to read subscription list")?;
        if !status.is_success() {
            return Err(ArmError::from_response(status.as_u16(), &body).into());
        }

        let list: SubscriptionList =
            serde_json::from_str(&body).context("failed to parse subscription list")?;
        Ok(list.value)
    }
}
