use std::time::Duration;

use thiserror::Error;

/// Entry point of a test body.
pub type TestFn = fn();

/// Entry point of a set-up or tear-down hook.
pub type HookFn = fn();

/// Error returned by the harness itself (never by a test).
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("error while writing the report: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for HarnessError {
    fn from(e: figment::Error) -> Self {
        HarnessError::Config(Box::new(e))
    }
}

/// Extra attributes attached to a test, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extra {
    /// Override of the default timeout, in seconds.
    Timeout(u64),
    /// Do not run the test, report it as skipped.
    Skip,
}

/// A single test case.
#[derive(Debug, Clone)]
pub struct Test {
    pub name: &'static str,
    pub fun: TestFn,
    pub extras: Vec<Extra>,
}

impl Test {
    /// Timeout requested by the test itself, the last declaration winning.
    pub fn timeout(&self) -> Option<Duration> {
        self.extras.iter().rev().find_map(|extra| match extra {
            Extra::Timeout(secs) => Some(Duration::from_secs(*secs)),
            Extra::Skip => None,
        })
    }

    pub fn is_skipped(&self) -> bool {
        self.extras.contains(&Extra::Skip)
    }
}

/// A named group of tests sharing optional hooks.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: &'static str,
    pub setup: Option<HookFn>,
    pub teardown: Option<HookFn>,
}

impl Suite {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            setup: None,
            teardown: None,
        }
    }
}

/// Final classification of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// No failure was captured.
    Pass,
    /// An assertion failed in set-up, body or tear-down.
    Fail,
    /// The test process crashed, timed out or could not be started.
    Error,
    /// The test is flagged with [`Extra::Skip`].
    Skip,
}

impl Outcome {
    /// Whether the outcome makes the whole run fail.
    pub const fn is_failure(self) -> bool {
        matches!(self, Outcome::Fail | Outcome::Error)
    }
}

/// Messages captured by the execution engine for one test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    /// Failure of the set-up hook or, when set-up passed, of the test body.
    pub error_message: Option<String>,
    /// Failure of the tear-down hook.
    pub teardown_error_message: Option<String>,
}

impl Verdict {
    pub fn outcome(&self) -> Outcome {
        if self.error_message.is_none() && self.teardown_error_message.is_none() {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Extra, Outcome, Test, Verdict};

    fn noop() {}

    #[test]
    fn last_timeout_wins() {
        let test = Test {
            name: "t",
            fun: noop,
            extras: vec![Extra::Timeout(1), Extra::Skip, Extra::Timeout(7)],
        };
        assert_eq!(test.timeout(), Some(Duration::from_secs(7)));
        assert!(test.is_skipped());
    }

    #[test]
    fn teardown_only_failure_fails() {
        let verdict = Verdict {
            error_message: None,
            teardown_error_message: Some("boom".into()),
        };
        assert_eq!(verdict.outcome(), Outcome::Fail);
        assert_eq!(Verdict::default().outcome(), Outcome::Pass);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(Outcome::Error.to_string(), "error");
        assert!(Outcome::Error.is_failure());
        assert!(!Outcome::Skip.is_failure());
    }
}
