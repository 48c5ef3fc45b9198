//! The profile: known environments plus the subscriptions the user has logged into.
//!
//! `ProfileData` is the on-disk shape (`azureProfile.json`); `Profile` is the in-memory
//! model built from it by [`Profile::from_data`]. Every load path, including test
//! fixtures, goes through that one constructor.

pub mod environment;
pub mod subscription;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ArmError;
use crate::services::ProfileStore;

pub use environment::Environment;
pub use subscription::{AccessToken, AccountSubscription, AuthConfig, Subscription, SubscriptionState};

pub const PROFILE_FILE: &str = "azureProfile.json";

/// Serialized form of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    environments: BTreeMap<String, Environment>,
    subscriptions: Vec<Subscription>,
}

impl Profile {
    /// Build a profile from its serialized form. Stored environments override built-ins of
    /// the same name. At most one subscription stays flagged as default.
    pub fn from_data(data: ProfileData) -> Self {
        let mut environments: BTreeMap<String, Environment> = Environment::builtin()
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect();
        for env in data.environments {
            environments.insert(env.name.clone(), env);
        }

        let mut subscriptions = data.subscriptions;
        let mut seen_default = false;
        for sub in subscriptions.iter_mut() {
            if sub.is_default {
                if seen_default {
                    sub.is_default = false;
                }
                seen_default = true;
            }
        }

        Self {
            environments,
            subscriptions,
        }
    }

    /// The value a save persists. Built-in environments are not written back.
    pub fn save_data(&self) -> ProfileData {
        let builtin = Environment::builtin();
        let environments = self
            .environments
            .values()
            .filter(|e| !builtin.contains(e))
            .cloned()
            .collect();
        ProfileData {
            environments,
            subscriptions: self.subscriptions.clone(),
        }
    }

    pub fn environments(&self) -> impl Iterator<Item = &Environment> {
        self.environments.values()
    }

    pub fn environment(&self, name: &str) -> Result<&Environment, ArmError> {
        self.environments
            .get(name)
            .or_else(|| {
                self.environments
                    .values()
                    .find(|e| e.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| ArmError::EnvironmentNotFound(name.to_string()))
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn default_subscription(&self) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.is_default)
    }

    /// Resolve a subscription by id or display name: explicit name > default > the only one.
    pub fn resolve_subscription(&self, name_or_id: Option<&str>) -> Result<&Subscription, ArmError> {
        if self.subscriptions.is_empty() {
            return Err(ArmError::NoSubscription);
        }
        match name_or_id {
            Some(wanted) => self
                .subscriptions
                .iter()
                .find(|s| s.id.eq_ignore_ascii_case(wanted))
                .or_else(|| self.subscriptions.iter().find(|s| s.name == wanted))
                .ok_or_else(|| ArmError::SubscriptionNotFound(wanted.to_string())),
            None => match self.default_subscription() {
                Some(sub) => Ok(sub),
                None if self.subscriptions.len() == 1 => Ok(&self.subscriptions[0]),
                None => Err(ArmError::NoDefaultSubscription),
            },
        }
    }

    /// Insert or replace a subscription by id. The first subscription added becomes default.
    pub fn add_subscription(&mut self, mut subscription: Subscription) {
        let existing = self
            .subscriptions
            .iter()
            .position(|s| s.id.eq_ignore_ascii_case(&subscription.id));
        if let Some(idx) = existing {
            subscription.is_default |= self.subscriptions[idx].is_default;
        }
        if subscription.is_default || self.default_subscription().is_none() {
            for sub in self.subscriptions.iter_mut() {
                sub.is_default = false;
            }
            subscription.is_default = true;
        }
        match existing {
            Some(idx) => self.subscriptions[idx] = subscription,
            None => self.subscriptions.push(subscription),
        }
    }

    pub fn set_default_subscription(&mut self, name_or_id: &str) -> Result<(), ArmError> {
        let id = self.resolve_subscription(Some(name_or_id))?.id.clone();
        for sub in self.subscriptions.iter_mut() {
            sub.is_default = sub.id == id;
        }
        Ok(())
    }
}

/// Load a profile file. A missing file yields an empty profile with the built-in environments.
pub fn load_profile_file(path: &Path) -> Result<Profile> {
    if !path.exists() {
        return Ok(Profile::from_data(ProfileData::default()));
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data: ProfileData = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Profile::from_data(data))
}

pub fn save_profile_file(path: &Path, profile: &Profile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents =
        serde_json::to_string_pretty(&profile.save_data()).context("failed to serialize profile")?;
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Profile files on disk, with a default location.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    default_path: PathBuf,
}

impl FileProfileStore {
    pub fn new(default_path: PathBuf) -> Self {
        Self { default_path }
    }
}

impl ProfileStore for FileProfileStore {
    fn default_path(&self) -> &Path {
        &self.default_path
    }

    fn load(&self, path: Option<&Path>) -> Result<Profile> {
        let path = path.unwrap_or(&self.default_path);
        tracing::debug!(path = %path.display(), "loading profile");
        load_profile_file(path)
    }

    fn save(&self, profile: &Profile, path: Option<&Path>) -> Result<()> {
        let path = path.unwrap_or(&self.default_path);
        save_profile_file(path, profile)?;
        tracing::info!(path = %path.display(), "saved profile");
        Ok(())
    }
}
