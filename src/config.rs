//! Configuration of the harness.
//!
//! The configuration is layered: built-in defaults, then a TOML file
//! (`minicut.toml` unless another path is given on the command line), then
//! `MINICUT_`-prefixed environment variables. Nested keys are separated by a
//! double underscore, e.g. `MINICUT_EXECUTION__MODE=single`.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::report::ReportFormat;
use crate::runner::isolation::TransportKind;
use crate::runner::RunMode;
use crate::test::HarnessError;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "minicut.toml";

/// How tests are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run every test in its own process, or all of them in this one.
    #[serde(default)]
    pub mode: RunMode,
    /// Channel used to collect the output of a child process.
    #[serde(default)]
    pub transport: TransportKind,
    /// Maximum number of bytes kept from the output of a child.
    #[serde(default = "default_capture_limit")]
    pub capture_limit: usize,
    /// Seconds a child may run before being killed, `0` to wait forever.
    /// A test can override it with its own timeout.
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            mode: RunMode::default(),
            transport: TransportKind::default(),
            capture_limit: default_capture_limit(),
            default_timeout: default_timeout(),
        }
    }
}

const fn default_capture_limit() -> usize {
    8192
}

const fn default_timeout() -> u64 {
    3
}

/// Configuration of the harness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Format of the report printed on standard output.
    #[serde(default)]
    pub report: ReportFormat,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Config {
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MINICUT_").split("__"))
    }

    /// Load the configuration, reading the TOML file at `path` if it exists.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        Ok(Self::figment(path).extract()?)
    }
}
