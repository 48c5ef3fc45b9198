use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::error::ArmError;

/// API version for subscription and resource group endpoints.
pub const SUBSCRIPTIONS_API_VERSION: &str = "2014-04-01-preview";

/// Default API version for provider resources (overridable with --api-version).
pub const DEFAULT_RESOURCE_API_VERSION: &str = "2014-04-01-preview";

/// `AZURE_ENABLE_STRICT_SSL=false` turns off certificate verification.
pub fn strict_ssl() -> bool {
    std::env::var("AZURE_ENABLE_STRICT_SSL")
        .map(|v| !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true)
}

pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .danger_accept_invalid_certs(!strict_ssl())
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn encode_segments(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extract the `value` array of a list response.
fn list_values(response: Value) -> Vec<Value> {
    match response {
        Value::Object(mut obj) => match obj.remove("value") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Identifies a provider resource inside a resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub group: String,
    pub name: String,
    /// Provider namespace, e.g. `Microsoft.Web`.
    pub namespace: String,
    /// Type below the namespace, e.g. `sites`.
    pub resource_type: String,
    /// Parent resource path, e.g. `servers/db1`.
    pub parent: Option<String>,
}

impl ResourceIdentity {
    /// Build from a `Namespace/type` string.
    pub fn new(
        group: &str,
        name: &str,
        full_type: &str,
        parent: Option<&str>,
    ) -> Result<Self, ArmError> {
        let (namespace, resource_type) = full_type
            .split_once('/')
            .filter(|(ns, rest)| !ns.is_empty() && !rest.trim_matches('/').is_empty())
            .ok_or_else(|| {
                ArmError::InvalidResourceType(full_type.to_string())
            })?;
        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            resource_type: resource_type.trim_matches('/').to_string(),
            parent: parent
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
        })
    }

    pub fn full_type(&self) -> String {
        format!("{}/{}", self.namespace, self.resource_type)
    }

    /// Path relative to the subscription.
    pub fn path(&self) -> String {
        let mut path = format!(
            "resourcegroups/{}/providers/{}",
            urlencoding::encode(&self.group),
            urlencoding::encode(&self.namespace)
        );
        if let Some(parent) = &self.parent {
            path.push('/');
            path.push_str(&encode_segments(parent));
        }
        path.push('/');
        path.push_str(&encode_segments(&self.resource_type));
        path.push('/');
        path.push_str(&urlencoding::encode(&self.name));
        path
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource '{}' of type '{}' in group '{}'",
            self.name,
            self.full_type(),
            self.group
        )
    }
}

/// Resource manager client scoped to one subscription.
pub struct ArmClient {
    client: Client,
    base_url: String,
    token: String,
    subscription_id: String,
}

impl ArmClient {
    pub fn new(
        base_url: &str,
        token: &str,
        subscription_id: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url.to_string(),
            token: token.to_string(),
            subscription_id: subscription_id.to_string(),
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        join_url(
            &self.base_url,
            &format!(
                "subscriptions/{}/{}?api-version={}",
                urlencoding::encode(&self.subscription_id),
                path.trim_start_matches('/'),
                api_version
            ),
        )
    }

    fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<(StatusCode, String)> {
        tracing::debug!(%method, %url, "sending request");

        let mut req = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token));

        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let response_body = response
            .text()
            .with_context(|| "failed to read response body")?;

        tracing::debug!(status = %status.as_u16(), body_len = response_body.len(), "received response");

        Ok((status, response_body))
    }

    /// Make an API request and return the parsed JSON response
    pub fn request(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path, api_version);
        let (status, response_body) = self.send(method, &url, body)?;

        if !status.is_success() {
            return Err(ArmError::from_response(status.as_u16(), &response_body).into());
        }

        // Handle empty responses (e.g. 202 Accepted on delete)
        if response_body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).with_context(|| "failed to parse response as JSON")
    }

    /// GET that maps 404 to `None`.
    pub fn probe(&self, path: &str, api_version: &str) -> Result<Option<Value>> {
        let url = self.url(path, api_version);
        let (status, response_body) = self.send(Method::GET, &url, None)?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ArmError::from_response(status.as_u16(), &response_body).into());
        }
        let value = serde_json::from_str(&response_body)
            .with_context(|| "failed to parse response as JSON")?;
        Ok(Some(value))
    }

    // Resource groups

    fn group_path(name: &str) -> String {
        format!("resourcegroups/{}", urlencoding::encode(name))
    }

    pub fn create_group(&self, name: &str, location: &str) -> Result<Value> {
        let body = json!({ "location": location });
        self.request(
            Method::PUT,
            &Self::group_path(name),
            SUBSCRIPTIONS_API_VERSION,
            Some(&body),
        )
    }

    pub fn group_exists(&self, name: &str) -> Result<bool> {
        let url = self.url(&Self::group_path(name), SUBSCRIPTIONS_API_VERSION);
        let (status, body) = self.send(Method::HEAD, &url, None)?;
        match status {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(ArmError::from_response(s.as_u16(), &body).into()),
        }
    }

    pub fn get_group(&self, name: &str) -> Result<Value> {
        self.probe(&Self::group_path(name), SUBSCRIPTIONS_API_VERSION)?
            .ok_or_else(|| ArmError::NotFound(format!("resource group '{}'", name)).into())
    }

    pub fn list_groups(&self) -> Result<Vec<Value>> {
        let response = self.request(Method::GET, "resourcegroups", SUBSCRIPTIONS_API_VERSION, None)?;
        Ok(list_values(response))
    }

    pub fn delete_group(&self, name: &str) -> Result<()> {
        self.request(
            Method::DELETE,
            &Self::group_path(name),
            SUBSCRIPTIONS_API_VERSION,
            None,
        )?;
        Ok(())
    }

    pub fn list_group_resources(&self, name: &str) -> Result<Vec<Value>> {
        let path = format!("{}/resources", Self::group_path(name));
        let response = self.request(Method::GET, &path, SUBSCRIPTIONS_API_VERSION, None)?;
        Ok(list_values(response))
    }

    pub fn list_resources(&self) -> Result<Vec<Value>> {
        let response = self.request(Method::GET, "resources", SUBSCRIPTIONS_API_VERSION, None)?;
        Ok(list_values(response))
    }

    // Provider resources

    pub fn get_resource(&self, id: &ResourceIdentity, api_version: &str) -> Result<Option<Value>> {
        self.probe(&id.path(), api_version)
    }

    pub fn put_resource(
        &self,
        id: &ResourceIdentity,
        api_version: &str,
        location: &str,
        properties: &Value,
    ) -> Result<Value> {
        let body = json!({
            "location": location,
            "properties": properties,
        });
        self.request(Method::PUT, &id.path(), api_version, Some(&body))
    }

    pub fn delete_resource(&self, id: &ResourceIdentity, api_version: &str) -> Result<()> {
        self.request(Method::DELETE, &id.path(), api_version, None)?;
        Ok(())
    }
}
