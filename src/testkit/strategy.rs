use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;

use super::mocked::{MockedEnvironment, SnapshotSlot};
use super::recording::RecordingSink;
use crate::services::Services;

pub const STRICT_SSL_ENV: &str = "AZURE_ENABLE_STRICT_SSL";

/// How a suite talks to the outside world. Chosen once per suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteMode {
    /// Real credentials, real endpoints, nothing captured.
    Live,
    /// Real credentials and endpoints; interactions are captured to a fixture.
    Record,
    /// Mocked credentials and profile; no live authentication.
    Replay,
}

impl SuiteMode {
    pub const ENV: &'static str = "ARMCTL_TEST_MODE";

    /// Mode from `ARMCTL_TEST_MODE`, defaulting to replay.
    pub fn from_env() -> Result<Self> {
        match std::env::var(Self::ENV) {
            Ok(v) if !v.trim().is_empty() => v.parse(),
            _ => Ok(SuiteMode::Replay),
        }
    }
}

impl FromStr for SuiteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(SuiteMode::Live),
            "record" => Ok(SuiteMode::Record),
            "replay" => Ok(SuiteMode::Replay),
            other => anyhow::bail!(
                "unknown test mode '{}' (expected live, record or replay)",
                other
            ),
        }
    }
}

impl fmt::Display for SuiteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteMode::Live => f.write_str("live"),
            SuiteMode::Record => f.write_str("record"),
            SuiteMode::Replay => f.write_str("replay"),
        }
    }
}

/// Suite lifecycle shared by all modes.
pub trait SuiteStrategy {
    fn mode(&self) -> SuiteMode;
    fn services(&self) -> &Services;
    fn setup_suite(&mut self) -> Result<()>;
    /// Must tolerate repeated calls.
    fn teardown_suite(&mut self) -> Result<()>;
    fn setup_test(&mut self) -> Result<()> {
        Ok(())
    }
    fn teardown_test(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct LiveSuite {
    services: Services,
}

impl LiveSuite {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

impl SuiteStrategy for LiveSuite {
    fn mode(&self) -> SuiteMode {
        SuiteMode::Live
    }

    fn services(&self) -> &Services {
        &self.services
    }

    fn setup_suite(&mut self) -> Result<()> {
        Ok(())
    }

    fn teardown_suite(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct RecordSuite {
    services: Services,
    sink: RecordingSink,
}

impl RecordSuite {
    pub fn new(services: Services, sink: RecordingSink) -> Self {
        Self { services, sink }
    }

    pub fn recording_path(&self) -> &Path {
        self.sink.path()
    }
}

impl SuiteStrategy for RecordSuite {
    fn mode(&self) -> SuiteMode {
        SuiteMode::Record
    }

    fn services(&self) -> &Services {
        &self.services
    }

    fn setup_suite(&mut self) -> Result<()> {
        self.sink.begin()
    }

    fn teardown_suite(&mut self) -> Result<()> {
        self.sink.finish()
    }
}

/// Process env override that remembers what it replaced.
#[derive(Debug)]
struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvOverride {
    fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, previous }
    }

    fn restore(self) {
        match self.previous {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

pub struct ReplaySuite {
    services: Services,
    slot: SnapshotSlot,
    strict_ssl: Option<EnvOverride>,
}

impl ReplaySuite {
    pub fn new(environment: &MockedEnvironment, dir: &Path, timeout_secs: u64) -> Self {
        let slot = SnapshotSlot::new();
        Self {
            services: environment.services(dir, timeout_secs, slot.clone()),
            slot,
            strict_ssl: None,
        }
    }

    /// The slot mocked profile saves are captured in.
    pub fn snapshot(&self) -> &SnapshotSlot {
        &self.slot
    }
}

impl SuiteStrategy for ReplaySuite {
    fn mode(&self) -> SuiteMode {
        SuiteMode::Replay
    }

    fn services(&self) -> &Services {
        &self.services
    }

    fn setup_suite(&mut self) -> Result<()> {
        if self.strict_ssl.is_none() {
            self.strict_ssl = Some(EnvOverride::set(STRICT_SSL_ENV, "false"));
        }
        Ok(())
    }

    fn teardown_suite(&mut self) -> Result<()> {
        if let Some(strict_ssl) = self.strict_ssl.take() {
            strict_ssl.restore();
        }
        self.slot.clear();
        Ok(())
    }
}
