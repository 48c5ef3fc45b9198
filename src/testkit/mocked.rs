//! Deterministic stand-ins for the live collaborators.
//!
//! Nothing here touches the network or writes the profile file. Profile saves land in a
//! [`SnapshotSlot`] owned by the harness, and later default-profile loads read it back.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::config::{Config, FileConfigSource, Mode};
use crate::profile::environment::{CLI_CLIENT_ID, DEFAULT_ENVIRONMENT};
use crate::profile::{
    AccessToken, AccountSubscription, AuthConfig, Environment, FileProfileStore, Profile,
    ProfileData, Subscription, SubscriptionState,
};
use crate::services::{self, ConfigSource, Identity, ProfileStore, Services};

pub const TEST_SUBSCRIPTION_ENV: &str = "AZURE_ARM_TEST_SUBSCRIPTIONID";

/// Used when `AZURE_ARM_TEST_SUBSCRIPTIONID` is not set.
pub const DEFAULT_TEST_SUBSCRIPTION_ID: &str = "bfb5e0bf-124b-4d0c-9352-7c0a9f4d9948";

pub const MOCK_SUBSCRIPTION_NAME: &str = "Node CLI Test";
pub const MOCK_USERNAME: &str = "testdummy@example.com";
pub const MOCK_ACCESS_TOKEN: &str = "foobar";

/// Lifetime of tokens handed out by [`MockedIdentity`].
pub const MOCK_TOKEN_LIFETIME_MS: i64 = 4 * 60 * 60 * 1000;

/// Single-slot holder for the last profile a mocked save captured.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSlot(Rc<RefCell<Option<ProfileData>>>);

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&self, data: ProfileData) {
        *self.0.borrow_mut() = Some(data);
    }

    pub fn current(&self) -> Option<ProfileData> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().take();
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_none()
    }
}

fn mocked_environment(
    name: &str,
    aux: &str,
    management: &str,
    resources: &str,
    gallery: &str,
) -> Environment {
    Environment {
        name: name.to_string(),
        publishing_profile_url: Some(format!("https://{}/publishsettings/index", aux)),
        portal_url: Some(format!("https://{}", aux)),
        management_endpoint_url: Some(management.to_string()),
        resource_management_endpoint_url: resources.to_string(),
        active_directory_endpoint_url: "https://login.windows-ppe.net".to_string(),
        sql_management_endpoint_url: Some("https://management.core.windows.net:8443/".to_string()),
        public_gallery_endpoint_url: Some(gallery.to_string()),
        host_name_suffix: Some("azurewebsites.net".to_string()),
        common_tenant_name: "common".to_string(),
        active_directory_resource_id: None,
    }
}

/// The canned profile a mocked run starts from.
pub fn mocked_profile_data(subscription_id: &str, now: DateTime<Utc>) -> ProfileData {
    ProfileData {
        environments: vec![
            mocked_environment(
                "next",
                "auxnext.windows.azure-test.net",
                "https://managementnext.rdfetest.dnsdemo4.com",
                "https://api-next.resources.windows-int.net",
                "https://next.gallery.azure-test.net",
            ),
            mocked_environment(
                "current",
                "auxcurrent.windows.azure-test.net",
                "https://management.rdfetest.dnsdemo4.com",
                "https://api-current.resources.windows-int.net",
                "https://current.gallery.azure-test.net",
            ),
        ],
        subscriptions: vec![Subscription {
            id: subscription_id.to_string(),
            name: MOCK_SUBSCRIPTION_NAME.to_string(),
            username: Some(MOCK_USERNAME.to_string()),
            access_token: Some(AccessToken {
                auth_config: AuthConfig {
                    authority_url: "https://login.windows.net".to_string(),
                    tenant_id: "common".to_string(),
                    resource_id: "https://management.core.windows.net/".to_string(),
                    client_id: CLI_CLIENT_ID.to_string(),
                },
                access_token: "dummy".to_string(),
                refresh_token: Some("dummy".to_string()),
                expires_at: now + Duration::hours(24),
            }),
            is_default: false,
            environment_name: DEFAULT_ENVIRONMENT.to_string(),
            registered_providers: vec![
                "visualstudio.account".to_string(),
                "website".to_string(),
                "sqlserver".to_string(),
            ],
            registered_resource_namespaces: vec![
                "microsoft.insights".to_string(),
                "successbricks.cleardb".to_string(),
            ],
        }],
    }
}

/// Default-profile loads come from the slot (or the fixture); saves go to the slot.
pub struct MockedProfileStore {
    live: FileProfileStore,
    fixture: ProfileData,
    slot: SnapshotSlot,
}

impl MockedProfileStore {
    pub fn new(live: FileProfileStore, fixture: ProfileData, slot: SnapshotSlot) -> Self {
        Self {
            live,
            fixture,
            slot,
        }
    }

    fn is_default(&self, path: Option<&Path>) -> bool {
        path.map_or(true, |p| p == self.live.default_path())
    }
}

impl ProfileStore for MockedProfileStore {
    fn default_path(&self) -> &Path {
        self.live.default_path()
    }

    fn load(&self, path: Option<&Path>) -> Result<Profile> {
        if !self.is_default(path) {
            return self.live.load(path);
        }
        let data = self.slot.current().unwrap_or_else(|| self.fixture.clone());
        Ok(Profile::from_data(data))
    }

    // The path is ignored: every save, whatever its target, replaces the one slot.
    fn save(&self, profile: &Profile, _path: Option<&Path>) -> Result<()> {
        tracing::debug!("capturing profile save in memory");
        self.slot.capture(profile.save_data());
        Ok(())
    }
}

/// Reads the real config and forces arm mode.
pub struct MockedConfigSource {
    live: FileConfigSource,
}

impl MockedConfigSource {
    pub fn new(live: FileConfigSource) -> Self {
        Self { live }
    }
}

impl ConfigSource for MockedConfigSource {
    fn read_config(&self) -> Result<Config> {
        let mut config = self.live.read_config()?;
        config.mode = Mode::Arm;
        Ok(config)
    }

    fn write_config(&self, config: &Config) -> Result<()> {
        self.live.write_config(config)
    }
}

/// Hands out synthetic tokens and a single active subscription.
pub struct MockedIdentity {
    subscription_id: String,
    clock: fn() -> DateTime<Utc>,
}

impl MockedIdentity {
    pub fn new(subscription_id: &str) -> Self {
        Self::with_clock(subscription_id, Utc::now)
    }

    pub fn with_clock(subscription_id: &str, clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            clock,
        }
    }
}

impl Identity for MockedIdentity {
    fn acquire_token(
        &self,
        auth: &AuthConfig,
        _username: &str,
        _password: &str,
    ) -> Result<AccessToken> {
        Ok(AccessToken {
            auth_config: auth.clone(),
            access_token: MOCK_ACCESS_TOKEN.to_string(),
            refresh_token: None,
            expires_at: (self.clock)() + Duration::milliseconds(MOCK_TOKEN_LIFETIME_MS),
        })
    }

    fn account_subscriptions(
        &self,
        _environment: &Environment,
        _token: &AccessToken,
    ) -> Result<Vec<AccountSubscription>> {
        Ok(vec![AccountSubscription {
            subscription_id: self.subscription_id.clone(),
            display_name: MOCK_SUBSCRIPTION_NAME.to_string(),
            state: SubscriptionState::Enabled,
        }])
    }
}

/// The mocked environment a replaying suite runs in.
#[derive(Debug, Clone)]
pub struct MockedEnvironment {
    subscription_id: String,
}

impl MockedEnvironment {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
        }
    }

    /// Subscription id from `AZURE_ARM_TEST_SUBSCRIPTIONID`, else a fixed one.
    pub fn from_env() -> Self {
        let id = std::env::var(TEST_SUBSCRIPTION_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TEST_SUBSCRIPTION_ID.to_string());
        Self::new(&id)
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Mocked services rooted in `dir`. Saves land in `slot`.
    pub fn services(&self, dir: &Path, timeout_secs: u64, slot: SnapshotSlot) -> Services {
        Services {
            profiles: Box::new(MockedProfileStore::new(
                FileProfileStore::new(services::profile_path(dir)),
                mocked_profile_data(&self.subscription_id, Utc::now()),
                slot,
            )),
            config: Box::new(MockedConfigSource::new(FileConfigSource::new(
                services::config_path(dir),
            ))),
            identity: Box::new(MockedIdentity::new(&self.subscription_id)),
            timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::save_config;
    use chrono::TimeZone;

    const SUB: &str = "11111111-2222-3333-4444-555555555555";

    fn store(dir: &Path, slot: SnapshotSlot) -> MockedProfileStore {
        MockedProfileStore::new(
            FileProfileStore::new(services::profile_path(dir)),
            mocked_profile_data(SUB, Utc::now()),
            slot,
        )
    }

    #[test]
    fn test_load_before_save_returns_fixture() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(temp.path(), SnapshotSlot::new());

        for path in [None, Some(store.default_path().to_path_buf())] {
            let profile = store.load(path.as_deref()).unwrap();
            assert_eq!(profile.subscriptions().len(), 1);
            assert_eq!(profile.subscriptions()[0].id, SUB);
            assert!(profile.environment("next").is_ok());
            assert!(profile.environment("current").is_ok());
        }
    }

    #[test]
    fn test_save_then_load_returns_captured_data() {
        let temp = tempfile::TempDir::new().unwrap();
        let slot = SnapshotSlot::new();
        let store = store(temp.path(), slot.clone());

        let mut profile = store.load(None).unwrap();
        profile.set_default_subscription(SUB).unwrap();
        store.save(&profile, None).unwrap();

        let reloaded = store.load(None).unwrap();
        assert_eq!(reloaded, profile);
        assert!(reloaded.default_subscription().is_some());
        assert_eq!(slot.current(), Some(profile.save_data()));
    }

    #[test]
    fn test_save_never_writes_the_profile_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = store(temp.path(), SnapshotSlot::new());
        let profile = store.load(None).unwrap();

        store.save(&profile, None).unwrap();
        store
            .save(&profile, Some(&temp.path().join("elsewhere.json")))
            .unwrap();

        assert!(!store.default_path().exists());
        assert!(!temp.path().join("elsewhere.json").exists());
    }

    #[test]
    fn test_saves_to_any_path_collapse_into_one_slot() {
        let temp = tempfile::TempDir::new().unwrap();
        let slot = SnapshotSlot::new();
        let store = store(temp.path(), slot.clone());

        let first = Profile::from_data(ProfileData::default());
        let second = store.load(None).unwrap();
        store.save(&first, Some(Path::new("a.json"))).unwrap();
        store.save(&second, Some(Path::new("b.json"))).unwrap();

        assert_eq!(store.load(None).unwrap(), second);
    }

    #[test]
    fn test_explicit_path_passes_through() {
        let temp = tempfile::TempDir::new().unwrap();
        let slot = SnapshotSlot::new();
        let store = store(temp.path(), slot.clone());
        slot.capture(mocked_profile_data("captured", Utc::now()));

        let other = temp.path().join("other.json");
        std::fs::write(
            &other,
            r#"{"subscriptions":[{"id":"disk","name":"Disk","environmentName":"AzureCloud"}]}"#,
        )
        .unwrap();

        let profile = store.load(Some(&other)).unwrap();
        assert_eq!(profile.subscriptions().len(), 1);
        assert_eq!(profile.subscriptions()[0].id, "disk");

        let missing = store.load(Some(&temp.path().join("missing.json"))).unwrap();
        assert!(missing.subscriptions().is_empty());
    }

    #[test]
    fn test_config_read_forces_arm_mode() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = services::config_path(temp.path());
        save_config(
            &path,
            &Config {
                mode: Mode::Asm,
                resource_manager_url: Some("http://127.0.0.1:1".to_string()),
            },
        )
        .unwrap();

        let source = MockedConfigSource::new(FileConfigSource::new(path));
        let config = source.read_config().unwrap();
        assert_eq!(config.mode, Mode::Arm);
        assert_eq!(
            config.resource_manager_url.as_deref(),
            Some("http://127.0.0.1:1")
        );
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_token_expires_exactly_four_hours_later() {
        let identity = MockedIdentity::with_clock(SUB, fixed_now);
        let auth = Environment::azure_cloud().auth_config(Some("tenant"));

        let token = identity.acquire_token(&auth, "user", "pw").unwrap();
        assert_eq!(token.auth_config, auth);
        assert_eq!(token.access_token, MOCK_ACCESS_TOKEN);
        assert_eq!(
            (token.expires_at - fixed_now()).num_milliseconds(),
            4 * 60 * 60 * 1000
        );
    }

    #[test]
    fn test_real_clock_token_is_in_the_future() {
        let identity = MockedIdentity::new(SUB);
        let before = Utc::now();
        let token = identity
            .acquire_token(&Environment::azure_cloud().auth_config(None), "u", "p")
            .unwrap();
        assert!(token.expires_at > before + Duration::hours(3));
        assert!(!token.is_expired(Utc::now()));
    }

    #[test]
    fn test_subscription_listing_returns_one_active_subscription() {
        let identity = MockedIdentity::new(SUB);
        let token = identity
            .acquire_token(&Environment::azure_cloud().auth_config(None), "u", "p")
            .unwrap();
        let subs = identity
            .account_subscriptions(&Environment::azure_cloud(), &token)
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].subscription_id, SUB);
        assert!(subs[0].is_active());
    }

    #[test]
    fn test_slot_clear() {
        let slot = SnapshotSlot::new();
        assert!(slot.is_empty());
        slot.capture(ProfileData::default());
        assert!(!slot.is_empty());
        slot.clear();
        slot.clear();
        assert!(slot.is_empty());
    }
}
