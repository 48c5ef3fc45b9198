// Test harness for wiremock-based integration tests.
//
// ## How it fits together
// `FakeArm` is a stateful wiremock responder that keeps resource groups and provider
// resources in memory, so a sequence of CLI commands sees its own writes. `TestServer`
// starts it, writes `config.toml` into a temp config dir pointing the resource manager
// endpoint at it, and can seed a profile with a logged-in subscription.
//
// ## How to write new tests
// 1. Start a server: `let ts = TestServer::start();`
// 2. For binary tests seed a profile: `ts.write_profile(SUBSCRIPTION_ID);`
//    then run `ts.command().args(["group", "list", "--json"]).assert().success();`
// 3. For in-process tests build a replay suite: `let mut suite = ts.replay_suite("prefix");`
//    and drive it with `suite.execute(&[...])`.
// 4. Inspect what the fake saw with `ts.fake.requests()` or `ts.fake.resource_count()`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use armctl::config::{save_config, Config, Mode};
use armctl::profile::{
    save_profile_file, AccessToken, Environment, Profile, ProfileData, Subscription,
};
use armctl::services::{config_path, profile_path};
use armctl::testkit::{CliTest, MockedEnvironment, SuiteMode, TestPaths};
use assert_cmd::Command;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SUBSCRIPTION_ID: &str = "bfb5e0bf-124b-4d0c-9352-7c0a9f4d9948";
pub const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Default)]
struct ArmState {
    /// Keyed by lowercased group name.
    groups: BTreeMap<String, Value>,
    /// Keyed by (lowercased group, lowercased provider path).
    resources: BTreeMap<(String, String), Value>,
    requests: Vec<(String, String)>,
}

/// In-memory resource manager for one subscription.
#[derive(Debug, Clone, Default)]
pub struct FakeArm {
    state: Arc<Mutex<ArmState>>,
}

fn arm_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": { "code": code, "message": message }
    }))
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

impl FakeArm {
    /// (method, path) of every request received, in order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn group_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .values()
            .filter_map(|g| g["name"].as_str().map(str::to_string))
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        self.state.lock().unwrap().resources.len()
    }

    fn group_json(sub: &str, name: &str, location: &str) -> Value {
        json!({
            "id": format!("/subscriptions/{}/resourceGroups/{}", sub, name),
            "name": name,
            "location": location,
            "properties": { "provisioningState": "Succeeded" },
        })
    }

    fn handle(&self, request: &Request) -> ResponseTemplate {
        let method = request.method.as_str().to_string();
        let raw_path = request.url.path().to_string();
        self.state
            .lock()
            .unwrap()
            .requests
            .push((method.clone(), raw_path.clone()));

        let authorized = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer "));
        if !authorized {
            return arm_error(401, "AuthenticationFailed", "missing bearer token");
        }

        let segments: Vec<String> = raw_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let (sub, rest) = match segments.as_slice() {
            ["subscriptions", sub, rest @ ..] => (*sub, rest),
            _ => return arm_error(404, "NotFound", "unknown path"),
        };

        match rest {
            ["resources"] if method == "GET" => {
                let state = self.state.lock().unwrap();
                let items: Vec<Value> = state.resources.values().cloned().collect();
                ResponseTemplate::new(200).set_body_json(json!({ "value": items }))
            }
            ["resourcegroups"] if method == "GET" => {
                let state = self.state.lock().unwrap();
                let items: Vec<Value> = state.groups.values().cloned().collect();
                ResponseTemplate::new(200).set_body_json(json!({ "value": items }))
            }
            ["resourcegroups", group] => self.handle_group(request, &method, sub, group),
            ["resourcegroups", group, "resources"] if method == "GET" => {
                let state = self.state.lock().unwrap();
                let key = group.to_lowercase();
                if !state.groups.contains_key(&key) {
                    return arm_error(404, "ResourceGroupNotFound", "resource group not found");
                }
                let items: Vec<Value> = state
                    .resources
                    .iter()
                    .filter(|((g, _), _)| *g == key)
                    .map(|(_, r)| r.clone())
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({ "value": items }))
            }
            ["resourcegroups", group, "providers", namespace, path @ ..] if path.len() >= 2 => {
                self.handle_resource(request, &method, sub, group, namespace, path)
            }
            _ => arm_error(404, "NotFound", "unknown path"),
        }
    }

    fn handle_group(
        &self,
        request: &Request,
        method: &str,
        sub: &str,
        group: &str,
    ) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let key = group.to_lowercase();
        match method {
            "PUT" => {
                let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
                let location = body["location"].as_str().unwrap_or_default();
                let value = Self::group_json(sub, group, location);
                state.groups.insert(key, value.clone());
                ResponseTemplate::new(201).set_body_json(value)
            }
            "HEAD" if state.groups.contains_key(&key) => ResponseTemplate::new(204),
            "HEAD" => ResponseTemplate::new(404),
            "GET" => match state.groups.get(&key) {
                Some(g) => ResponseTemplate::new(200).set_body_json(g.clone()),
                None => arm_error(404, "ResourceGroupNotFound", "resource group not found"),
            },
            "DELETE" => {
                if state.groups.remove(&key).is_none() {
                    return arm_error(404, "ResourceGroupNotFound", "resource group not found");
                }
                state.resources.retain(|(g, _), _| *g != key);
                ResponseTemplate::new(202)
            }
            _ => arm_error(405, "MethodNotAllowed", "unsupported method"),
        }
    }

    fn handle_resource(
        &self,
        request: &Request,
        method: &str,
        sub: &str,
        group: &str,
        namespace: &str,
        path: &[&str],
    ) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let group_key = group.to_lowercase();
        let key = (
            group_key.clone(),
            format!("{}/{}", namespace, path.join("/")).to_lowercase(),
        );

        match method {
            "PUT" => {
                if !state.groups.contains_key(&group_key) {
                    return arm_error(404, "ResourceGroupNotFound", "resource group not found");
                }
                let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
                let (name, type_path) = match path.split_last() {
                    Some((name, parents)) => (*name, parents),
                    None => return arm_error(400, "BadRequest", "missing resource name"),
                };
                // Type segments sit at even offsets: parent type, parent name, ..., type.
                let type_segments: Vec<&str> = type_path.iter().step_by(2).copied().collect();
                let full_type = format!("{}/{}", namespace, type_segments.join("/"));
                let value = json!({
                    "id": format!(
                        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
                        sub,
                        group,
                        namespace,
                        path.join("/")
                    ),
                    "name": name,
                    "type": full_type,
                    "location": body["location"],
                    "properties": body["properties"],
                });
                let status = if state.resources.contains_key(&key) { 200 } else { 201 };
                state.resources.insert(key, value.clone());
                ResponseTemplate::new(status).set_body_json(value)
            }
            "GET" => match state.resources.get(&key) {
                Some(r) => ResponseTemplate::new(200).set_body_json(r.clone()),
                None => arm_error(404, "ResourceNotFound", "resource not found"),
            },
            "DELETE" => match state.resources.remove(&key) {
                Some(_) => ResponseTemplate::new(200),
                None => ResponseTemplate::new(204),
            },
            _ => arm_error(405, "MethodNotAllowed", "unsupported method"),
        }
    }
}

impl Respond for FakeArm {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.handle(request)
    }
}

pub struct TestServer {
    // Dropped before the runtime that started it.
    pub mock_server: MockServer,
    pub runtime: tokio::runtime::Runtime,
    pub temp_dir: TempDir,
    pub fake: FakeArm,
}

impl TestServer {
    /// Start a fake resource manager and prepare a temp config directory in arm mode.
    pub fn start() -> Self {
        let runtime = tokio::runtime::Runtime::new().expect("failed to build runtime");
        let mock_server = runtime.block_on(MockServer::start());
        let fake = FakeArm::default();
        runtime.block_on(
            Mock::given(any())
                .respond_with(fake.clone())
                .mount(&mock_server),
        );

        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let server = Self {
            mock_server,
            runtime,
            temp_dir,
            fake,
        };
        server.write_config(Mode::Arm);
        server
    }

    pub fn uri(&self) -> String {
        self.mock_server.uri()
    }

    pub fn config_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `config.toml` with the given mode and the fake as resource manager endpoint.
    pub fn write_config(&self, mode: Mode) {
        save_config(
            &config_path(self.config_dir()),
            &Config {
                mode,
                resource_manager_url: Some(self.uri()),
            },
        )
        .expect("failed to write config");
    }

    /// Environment whose endpoints all point at the fake.
    pub fn environment(&self, name: &str) -> Environment {
        Environment {
            name: name.to_string(),
            resource_management_endpoint_url: self.uri(),
            active_directory_endpoint_url: self.uri(),
            active_directory_resource_id: Some("https://management.core.windows.net/".to_string()),
            ..Environment::azure_cloud()
        }
    }

    /// Seed the profile file with one logged-in default subscription.
    pub fn write_profile(&self, subscription_id: &str) {
        self.write_profile_with_expiry(subscription_id, Utc::now() + Duration::hours(1));
    }

    pub fn write_profile_with_expiry(
        &self,
        subscription_id: &str,
        expires_at: chrono::DateTime<Utc>,
    ) {
        let environment = self.environment("FakeCloud");
        let profile = Profile::from_data(ProfileData {
            subscriptions: vec![Subscription {
                id: subscription_id.to_string(),
                name: "Fake Subscription".to_string(),
                username: Some("user@example.com".to_string()),
                access_token: Some(AccessToken {
                    auth_config: environment.auth_config(None),
                    access_token: TEST_TOKEN.to_string(),
                    refresh_token: None,
                    expires_at,
                }),
                is_default: true,
                environment_name: environment.name.clone(),
                registered_providers: Vec::new(),
                registered_resource_namespaces: Vec::new(),
            }],
            environments: vec![environment],
        });
        save_profile_file(&profile_path(self.config_dir()), &profile)
            .expect("failed to write profile");
    }

    /// Replay suite whose mocked subscription is `SUBSCRIPTION_ID`.
    pub fn replay_suite(&self, prefix: &str) -> CliTest {
        CliTest::with_environment(
            prefix,
            SuiteMode::Replay,
            TestPaths::new(self.config_dir(), self.config_dir().join("recordings")),
            &MockedEnvironment::new(SUBSCRIPTION_ID),
        )
    }

    /// Build an assert_cmd Command pre-configured with the test environment.
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("armctl").expect("binary not found");
        cmd.env("ARMCTL_CONFIG_DIR", self.config_dir())
            .env_remove("ARMCTL_SUBSCRIPTION")
            .env_remove("ARMCTL_BASE_URL")
            .env_remove("RUST_LOG");
        cmd
    }
}
