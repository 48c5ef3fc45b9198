//! Collaborator interfaces the commands depend on.
//!
//! Commands never touch the profile file, the config file or the identity endpoints
//! directly; they go through a [`Services`] set. The binary uses the live set, the
//! test harness swaps in mocked implementations at construction time.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::{self, Config, FileConfigSource};
use crate::identity::AadIdentity;
use crate::profile::{
    AccessToken, AccountSubscription, AuthConfig, Environment, FileProfileStore, Profile,
    PROFILE_FILE,
};

/// Loading and saving the profile.
pub trait ProfileStore {
    /// Location used when no explicit path is given.
    fn default_path(&self) -> &Path;
    /// Load the profile at `path`, or the default profile when `None`.
    fn load(&self, path: Option<&Path>) -> Result<Profile>;
    /// Persist `profile` to `path`, or to the default profile when `None`.
    fn save(&self, profile: &Profile, path: Option<&Path>) -> Result<()>;
}

/// Reading (and writing) the CLI config.
pub trait ConfigSource {
    fn read_config(&self) -> Result<Config>;
    fn write_config(&self, config: &Config) -> Result<()>;
}

/// Token acquisition and subscription discovery.
pub trait Identity {
    fn acquire_token(&self, auth: &AuthConfig, username: &str, password: &str)
        -> Result<AccessToken>;
    fn account_subscriptions(
        &self,
        environment: &Environment,
        token: &AccessToken,
    ) -> Result<Vec<AccountSubscription>>;
}

pub struct Services {
    pub profiles: Box<dyn ProfileStore>,
    pub config: Box<dyn ConfigSource>,
    pub identity: Box<dyn Identity>,
    /// Request timeout for HTTP collaborators, in seconds.
    pub timeout_secs: u64,
}

impl Services {
    /// Live services rooted in the user's config directory.
    pub fn live(timeout_secs: u64) -> Result<Self> {
        Ok(Self::in_dir(&config::config_dir()?, timeout_secs))
    }

    /// Live services rooted in `dir`.
    pub fn in_dir(dir: &Path, timeout_secs: u64) -> Self {
        Self {
            profiles: Box::new(FileProfileStore::new(profile_path(dir))),
            config: Box::new(FileConfigSource::new(config_path(dir))),
            identity: Box::new(AadIdentity::new(timeout_secs)),
            timeout_secs,
        }
    }
}

pub fn profile_path(dir: &Path) -> PathBuf {
    dir.join(PROFILE_FILE)
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(config::CONFIG_FILE)
}
