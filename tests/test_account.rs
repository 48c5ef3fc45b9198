mod harness;

use armctl::profile::{load_profile_file, Profile, ProfileData};
use armctl::services::profile_path;
use harness::TestServer;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const ACCOUNT_SUB: &str = "0a1b2c3d-0000-1111-2222-333344445555";
const DISABLED_SUB: &str = "9f8e7d6c-0000-1111-2222-333344445555";
const SUSPENDED_SUB: &str = "5a5a5a5a-0000-1111-2222-333344445555";

/// Seed a profile that only knows the fake environment.
fn seed_environment(ts: &TestServer) {
    let profile = Profile::from_data(ProfileData {
        environments: vec![ts.environment("FakeCloud")],
        subscriptions: Vec::new(),
    });
    armctl::profile::save_profile_file(&profile_path(ts.config_dir()), &profile).unwrap();
}

fn mount_login(ts: &TestServer) {
    ts.runtime.block_on(async {
        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=user%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "access_token": "issued-token",
                "refresh_token": "refresh",
                "expires_in": "3599",
            })))
            .with_priority(1)
            .mount(&ts.mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .and(query_param("api-version", "2014-04-01-preview"))
            .and(header("authorization", "Bearer issued-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {
                        "subscriptionId": ACCOUNT_SUB,
                        "displayName": "Contoso Dev",
                        "state": "Enabled"
                    },
                    {
                        "subscriptionId": DISABLED_SUB,
                        "displayName": "Old",
                        "state": "Disabled"
                    },
                    {
                        "subscriptionId": SUSPENDED_SUB,
                        "displayName": "Paused",
                        "state": "Suspended"
                    }
                ]
            })))
            .with_priority(1)
            .mount(&ts.mock_server)
            .await;
    });
}

#[test]
fn test_login_stores_enabled_subscriptions() {
    let ts = TestServer::start();
    seed_environment(&ts);
    mount_login(&ts);

    ts.command()
        .args([
            "account",
            "login",
            "-u",
            "user@example.com",
            "-p",
            "secret",
            "--environment",
            "FakeCloud",
            "--tenant",
            "contoso",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(ACCOUNT_SUB))
        .stdout(predicate::str::contains(DISABLED_SUB).not())
        .stdout(predicate::str::contains(SUSPENDED_SUB).not())
        .stdout(predicate::str::contains("issued-token").not());

    let profile = load_profile_file(&profile_path(ts.config_dir())).unwrap();
    assert_eq!(profile.subscriptions().len(), 1);
    let sub = &profile.subscriptions()[0];
    assert_eq!(sub.id, ACCOUNT_SUB);
    assert_eq!(sub.name, "Contoso Dev");
    assert!(sub.is_default);
    assert_eq!(sub.environment_name, "FakeCloud");
    let token = sub.access_token.as_ref().unwrap();
    assert_eq!(token.access_token, "issued-token");
    assert_eq!(token.auth_config.tenant_id, "contoso");
}

#[test]
fn test_login_then_group_list_uses_issued_token() {
    let ts = TestServer::start();
    seed_environment(&ts);
    mount_login(&ts);

    ts.command()
        .args([
            "account", "login", "-u", "user@example.com", "-p", "secret", "-e", "FakeCloud",
            "--tenant", "contoso",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as user@example.com."));

    ts.command()
        .args(["group", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));

    let requests = ts.fake.requests();
    assert_eq!(
        requests.last().unwrap().1,
        format!("/subscriptions/{}/resourcegroups", ACCOUNT_SUB)
    );
}

#[test]
fn test_login_with_bad_password_fails() {
    let ts = TestServer::start();
    seed_environment(&ts);
    ts.runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/common/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "invalid_grant", "message": "bad credentials" }
            })))
            .with_priority(1)
            .mount(&ts.mock_server),
    );

    ts.command()
        .args([
            "account", "login", "-u", "user@example.com", "-p", "wrong", "-e", "FakeCloud",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_grant: bad credentials"));
    assert!(load_profile_file(&profile_path(ts.config_dir()))
        .unwrap()
        .subscriptions()
        .is_empty());
}

#[test]
fn test_account_set_and_show() {
    let ts = TestServer::start();
    ts.write_profile(harness::SUBSCRIPTION_ID);

    ts.command()
        .args(["account", "set", "Fake Subscription"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default subscription set to 'Fake Subscription'"));

    ts.command()
        .args(["account", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(harness::SUBSCRIPTION_ID))
        .stdout(predicate::str::contains(harness::TEST_TOKEN).not());

    ts.command()
        .args(["account", "set", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("subscription not found: missing"));
}
