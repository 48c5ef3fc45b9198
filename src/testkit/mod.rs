//! Harness for driving the CLI from tests.
//!
//! ## How to write a suite
//! 1. Build a harness: `let mut suite = CliTest::new("resource-tests", mode, paths);`
//! 2. Call `setup_suite` once, `setup_test`/`teardown_test` around each case and
//!    `teardown_suite` at the end.
//! 3. Run commands in-process: `suite.execute(&["group", "show", "rg", "--json"])`.
//!
//! In replay mode the profile, config mode and identity calls are mocked (see
//! [`mocked`]); only the resource manager endpoint in `config.toml` is contacted.

pub mod mocked;
pub mod recording;
pub mod strategy;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::profile::Profile;
use crate::services::Services;

pub use mocked::{MockedEnvironment, SnapshotSlot};
pub use recording::RecordingSink;
pub use strategy::{LiveSuite, RecordSuite, ReplaySuite, SuiteMode, SuiteStrategy};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where a suite keeps its files.
#[derive(Debug, Clone)]
pub struct TestPaths {
    /// Config directory: `config.toml` and the profile file.
    pub config_dir: PathBuf,
    /// Directory recording fixtures are written to.
    pub recordings_dir: PathBuf,
}

impl TestPaths {
    pub fn new(config_dir: impl Into<PathBuf>, recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            recordings_dir: recordings_dir.into(),
        }
    }

    pub fn recording_file(&self, prefix: &str) -> PathBuf {
        self.recordings_dir.join(format!("{}.recording.js", prefix))
    }
}

/// Outcome of one in-process command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_status: i32,
    /// Everything the command wrote to stdout.
    pub text: String,
    pub error_text: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// Parse `text` as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.text).map_err(|e| {
            anyhow::anyhow!("command output is not JSON ({}): {}", e, self.text)
        })
    }
}

pub struct CliTest {
    prefix: String,
    paths: TestPaths,
    strategy: Box<dyn SuiteStrategy>,
    current_test: usize,
    generated_ids: Vec<String>,
    current_profile: Option<Profile>,
}

impl CliTest {
    /// Harness for `mode`; replay suites use the environment from [`MockedEnvironment::from_env`].
    pub fn new(prefix: &str, mode: SuiteMode, paths: TestPaths) -> Self {
        Self::with_environment(prefix, mode, paths, &MockedEnvironment::from_env())
    }

    /// Harness whose mode comes from `ARMCTL_TEST_MODE`.
    pub fn from_env(prefix: &str, paths: TestPaths) -> Result<Self> {
        Ok(Self::new(prefix, SuiteMode::from_env()?, paths))
    }

    pub fn with_environment(
        prefix: &str,
        mode: SuiteMode,
        paths: TestPaths,
        environment: &MockedEnvironment,
    ) -> Self {
        let strategy: Box<dyn SuiteStrategy> = match mode {
            SuiteMode::Live => Box::new(LiveSuite::new(Services::in_dir(
                &paths.config_dir,
                DEFAULT_TIMEOUT_SECS,
            ))),
            SuiteMode::Record => Box::new(RecordSuite::new(
                Services::in_dir(&paths.config_dir, DEFAULT_TIMEOUT_SECS),
                RecordingSink::new(paths.recording_file(prefix)),
            )),
            SuiteMode::Replay => Box::new(ReplaySuite::new(
                environment,
                &paths.config_dir,
                DEFAULT_TIMEOUT_SECS,
            )),
        };
        Self {
            prefix: prefix.to_string(),
            paths,
            strategy,
            current_test: 0,
            generated_ids: Vec::new(),
            current_profile: None,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn mode(&self) -> SuiteMode {
        self.strategy.mode()
    }

    /// True unless running live. Recording suites count as mocked.
    pub fn is_mocked(&self) -> bool {
        self.mode() != SuiteMode::Live
    }

    pub fn is_recording(&self) -> bool {
        self.mode() == SuiteMode::Record
    }

    pub fn current_test(&self) -> usize {
        self.current_test
    }

    pub fn config_dir(&self) -> &Path {
        &self.paths.config_dir
    }

    pub fn services(&self) -> &Services {
        self.strategy.services()
    }

    /// Profile loaded at suite setup.
    pub fn current_profile(&self) -> Option<&Profile> {
        self.current_profile.as_ref()
    }

    pub fn generated_ids(&self) -> &[String] {
        &self.generated_ids
    }

    pub fn setup_suite(&mut self) -> Result<()> {
        tracing::debug!(prefix = %self.prefix, mode = %self.mode(), "setting up suite");
        self.strategy.setup_suite()?;
        self.current_profile = Some(self.services().profiles.load(None)?);
        Ok(())
    }

    pub fn teardown_suite(&mut self) -> Result<()> {
        self.current_test = 0;
        self.strategy.teardown_suite()
    }

    pub fn setup_test(&mut self) -> Result<()> {
        self.strategy.setup_test()
    }

    pub fn teardown_test(&mut self) -> Result<()> {
        self.strategy.teardown_test()?;
        self.current_test += 1;
        Ok(())
    }

    /// Names for created entities. Replay names are deterministic so runs line up with
    /// recorded fixtures; other modes add a time-derived suffix.
    pub fn generate_id(&mut self, prefix: &str) -> String {
        let n = self.generated_ids.len() + 1;
        let id = if self.mode() == SuiteMode::Replay {
            format!("{}{}", prefix, n)
        } else {
            let millis = chrono::Utc::now().timestamp_millis().rem_euclid(1_000_000);
            format!("{}{}{}", prefix, millis, n)
        };
        self.generated_ids.push(id.clone());
        id
    }

    /// Run `armctl <args>` in-process against this suite's services.
    pub fn execute(&self, args: &[&str]) -> CommandResult {
        tracing::debug!(?args, "executing");
        let argv = std::iter::once("armctl").chain(args.iter().copied());
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                let rendered = err.render().to_string();
                let (text, error_text) = if err.use_stderr() {
                    (String::new(), rendered)
                } else {
                    (rendered, String::new())
                };
                return CommandResult {
                    exit_status: err.exit_code(),
                    text,
                    error_text,
                };
            }
        };

        let mut out = Vec::new();
        let outcome = crate::run(cli, self.services(), &mut out);
        let text = String::from_utf8_lossy(&out).into_owned();
        match outcome {
            Ok(()) => CommandResult {
                exit_status: 0,
                text,
                error_text: String::new(),
            },
            Err(err) => CommandResult {
                exit_status: 1,
                text,
                error_text: format!("Error: {:#}", err),
            },
        }
    }
}
