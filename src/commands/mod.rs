pub mod account;
pub mod config;
pub mod group;
pub mod resource;

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};

use crate::client::ArmClient;
use crate::config::Mode;
use crate::error::ArmError;
use crate::services::Services;

/// Build a resource manager client for the selected subscription.
///
/// Resolution order for the endpoint: `resource_manager_url` in config > `ARMCTL_BASE_URL`
/// env > the subscription's environment.
pub fn arm_client(services: &Services, subscription: Option<&str>) -> Result<ArmClient> {
    let config = services.config.read_config()?;
    if config.mode != Mode::Arm {
        return Err(ArmError::WrongMode(config.mode).into());
    }

    let profile = services.profiles.load(None)?;
    let sub = profile.resolve_subscription(subscription)?;
    let token = sub
        .access_token
        .as_ref()
        .ok_or_else(|| ArmError::NotLoggedIn(sub.id.clone()))?;
    if token.is_expired(Utc::now()) {
        return Err(ArmError::TokenExpired(sub.id.clone()).into());
    }

    let environment = profile.environment(&sub.environment_name)?;
    let base_url = config
        .resource_manager_url
        .clone()
        .or_else(|| std::env::var("ARMCTL_BASE_URL").ok())
        .unwrap_or_else(|| environment.resource_management_endpoint_url.clone());

    tracing::debug!(subscription = %sub.id, %base_url, "using subscription");
    ArmClient::new(&base_url, &token.access_token, &sub.id, services.timeout_secs)
}

/// Ask before destructive operations. `--quiet` skips this.
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("confirmation prompt failed (use --quiet to skip it)")
}

/// Report a declined delete. JSON mode still gets a JSON document.
pub fn write_aborted(out: &mut dyn Write, name: &str, json_mode: bool) -> Result<()> {
    if json_mode {
        crate::output::write_json(out, &json!({ "name": name, "deleted": false }))
    } else {
        writeln!(out, "Aborted.")?;
        Ok(())
    }
}

/// Parse `-p` properties; they must form a JSON object.
pub fn parse_properties(raw: Option<&str>) -> Result<Value, ArmError> {
    let Some(raw) = raw else {
        return Ok(Value::Object(Default::default()));
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ArmError::InvalidProperties(e.to_string()))?;
    if !value.is_object() {
        return Err(ArmError::InvalidProperties(
            "expected a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Pick the switch value, else the positional one.
pub fn pick(
    switch: Option<&String>,
    positional: Option<&String>,
    name: &'static str,
) -> Result<String, ArmError> {
    switch
        .or(positional)
        .cloned()
        .ok_or(ArmError::MissingArgument(name))
}
