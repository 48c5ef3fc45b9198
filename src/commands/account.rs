use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::output::{print_kv_table, print_table, print_value};
use crate::profile::Subscription;
use crate::services::Services;

/// Subscription fields safe to print. Tokens never leave the profile file.
fn summary(sub: &Subscription) -> Value {
    json!({
        "id": sub.id,
        "name": sub.name,
        "isDefault": sub.is_default,
        "environmentName": sub.environment_name,
        "username": sub.username,
        "tokenExpiresAt": sub.access_token.as_ref().map(|t| t.expires_at.to_rfc3339()),
    })
}

pub struct LoginArgs<'a> {
    pub username: &'a str,
    pub password: Option<&'a str>,
    pub environment: &'a str,
    pub tenant: Option<&'a str>,
}

/// Acquire a token, list the account's subscriptions and store the enabled ones.
pub fn login(
    services: &Services,
    args: LoginArgs<'_>,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut profile = services.profiles.load(None)?;
    let environment = profile.environment(args.environment)?.clone();
    let auth = environment.auth_config(args.tenant);

    let password = match args.password {
        Some(p) => p.to_string(),
        None => rpassword::prompt_password("Password: ").context("failed to read password")?,
    };

    let token = services
        .identity
        .acquire_token(&auth, args.username, &password)?;
    let listed = services
        .identity
        .account_subscriptions(&environment, &token)?;

    let active: Vec<_> = listed.into_iter().filter(|s| s.is_active()).collect();
    if active.is_empty() {
        anyhow::bail!("no enabled subscriptions found for {}", args.username);
    }

    let mut imported = Vec::new();
    for account_sub in active {
        let previous = profile
            .subscriptions()
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(&account_sub.subscription_id))
            .cloned();
        let name = if account_sub.display_name.is_empty() {
            account_sub.subscription_id.clone()
        } else {
            account_sub.display_name.clone()
        };
        profile.add_subscription(Subscription {
            id: account_sub.subscription_id.clone(),
            name,
            username: Some(args.username.to_string()),
            access_token: Some(token.clone()),
            is_default: false,
            environment_name: environment.name.clone(),
            registered_providers: previous
                .as_ref()
                .map(|p| p.registered_providers.clone())
                .unwrap_or_default(),
            registered_resource_namespaces: previous
                .map(|p| p.registered_resource_namespaces)
                .unwrap_or_default(),
        });
        imported.push(account_sub.subscription_id);
    }

    services.profiles.save(&profile, None)?;
    tracing::info!(username = %args.username, count = imported.len(), "logged in");

    let subs: Vec<Value> = profile
        .subscriptions()
        .iter()
        .filter(|s| imported.contains(&s.id))
        .map(summary)
        .collect();
    print_value(out, &Value::Array(subs), json_mode, |out, v| {
        writeln!(out, "Logged in as {}.", args.username)?;
        print_table(out, v, &["name", "id", "isDefault"])
    })
}

pub fn list(services: &Services, json_mode: bool, out: &mut dyn Write) -> Result<()> {
    let profile = services.profiles.load(None)?;
    let subs = Value::Array(profile.subscriptions().iter().map(summary).collect());
    print_value(out, &subs, json_mode, |out, v| {
        if v.as_array().is_some_and(|a| a.is_empty()) {
            writeln!(out, "No subscriptions. Use `armctl account login` to import some.")?;
            return Ok(());
        }
        print_table(out, v, &["name", "id", "isDefault"])
    })
}

pub fn show(
    services: &Services,
    subscription: Option<&str>,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let profile = services.profiles.load(None)?;
    let sub = profile.resolve_subscription(subscription)?;
    print_value(out, &summary(sub), json_mode, |out, v| {
        print_kv_table(
            out,
            v,
            &["name", "id", "isDefault", "environmentName", "username", "tokenExpiresAt"],
        )
    })
}

pub fn set(
    services: &Services,
    subscription: &str,
    json_mode: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut profile = services.profiles.load(None)?;
    profile.set_default_subscription(subscription)?;
    services.profiles.save(&profile, None)?;

    let sub = profile.resolve_subscription(None)?;
    tracing::info!(subscription = %sub.id, "default subscription changed");
    print_value(out, &summary(sub), json_mode, |out, v| {
        writeln!(
            out,
            "Default subscription set to '{}' ({}).",
            v["name"].as_str().unwrap_or("-"),
            v["id"].as_str().unwrap_or("-")
        )?;
        Ok(())
    })
}
