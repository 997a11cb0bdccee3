//! Suite and run orchestration.
//!
//! The [`Runner`] owns the fixed-up item list, attaches hooks to their suites
//! and walks the list suite by suite, running every test either in-process or
//! in a child process and forwarding the outcomes to a [`Reporter`].

use std::{
    io::{self, Write},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ExecutionConfig;
use crate::registry::{ItemKind, ItemList, ItemRef, SuiteRef, Unit};
use crate::report::Reporter;
use crate::test::{HarnessError, Outcome, Suite, Test};

pub mod context;
pub mod engine;
pub mod isolation;
pub mod output;

use isolation::{ChildReport, Invocation, Isolation};

/// Whether each test gets its own process.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunMode {
    /// Respawn the executable for every test.
    #[default]
    Forking,
    /// Run every test in this process.
    Single,
}

/// What to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    Suite(u32),
    Test(u32),
    /// Run one test as the child of an isolated run.
    Child(u32),
    List,
}

/// An id given on the command line which cannot be run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Suite not found.")]
    SuiteNotFound,
    #[error("Invalid suite id.")]
    NotASuite,
    #[error("Test not found.")]
    TestNotFound,
    #[error("Invalid test id.")]
    NotATest,
}

impl SelectionError {
    pub const fn exit_code(self) -> i32 {
        match self {
            SelectionError::SuiteNotFound | SelectionError::TestNotFound => 2,
            SelectionError::NotASuite | SelectionError::NotATest => 3,
        }
    }
}

/// Execution settings of a run.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub mode: RunMode,
    pub isolation: Isolation,
    /// Applied to tests without their own timeout.
    pub default_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&ExecutionConfig::default())
    }
}

impl From<&ExecutionConfig> for Settings {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            mode: config.mode,
            isolation: Isolation {
                transport: config.transport,
                capture_limit: config.capture_limit,
            },
            default_timeout: (config.default_timeout > 0)
                .then(|| Duration::from_secs(config.default_timeout)),
        }
    }
}

/// Tests sharing a suite, in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    suite: SuiteRef,
    tests: Vec<ItemRef>,
}

pub struct Runner {
    list: ItemList,
    settings: Settings,
}

impl Runner {
    /// Register the items of `unit` and attach the hooks to their suites.
    pub fn new(unit: Unit, settings: Settings) -> Self {
        let mut list = ItemList::new(unit);
        resolve_hooks(&mut list);
        Self { list, settings }
    }

    pub fn items(&self) -> &ItemList {
        &self.list
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Print every suite and test with its id.
    pub fn list(&self, out: &mut impl Write) -> io::Result<()> {
        for it in self.list.iter() {
            let item = &self.list[it];
            let id = item.id.unwrap_or_default();
            match &item.kind {
                ItemKind::Suite(suite) => writeln!(out, "  Suite `{}' [{id}]", suite.name)?,
                ItemKind::Test(test) => writeln!(out, "    Test `{}' [{id}]", test.name)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Look up the suite numbered `id`.
    pub fn find_suite(&self, id: u32) -> Result<ItemRef, SelectionError> {
        let it = self.list.find_by_id(id).ok_or(SelectionError::SuiteNotFound)?;
        match self.list[it].kind {
            ItemKind::Suite(_) => Ok(it),
            _ => Err(SelectionError::NotASuite),
        }
    }

    /// Look up the test numbered `id`.
    pub fn find_test(&self, id: u32) -> Result<ItemRef, SelectionError> {
        let it = self.list.find_by_id(id).ok_or(SelectionError::TestNotFound)?;
        match self.list[it].kind {
            ItemKind::Test(_) => Ok(it),
            _ => Err(SelectionError::NotATest),
        }
    }

    fn suite_of(&self, test: ItemRef) -> &Suite {
        let registry = self.list.registry();
        registry.suite(registry.parent_suite(test))
    }

    fn test(&self, it: ItemRef) -> &Test {
        match &self.list[it].kind {
            ItemKind::Test(test) => test,
            _ => unreachable!("group members are tests"),
        }
    }

    fn groups(&self) -> Vec<Group> {
        let registry = self.list.registry();
        let mut groups: Vec<Group> = Vec::new();
        for it in self.list.iter().filter(|&it| self.list[it].as_test().is_some()) {
            let suite = registry.parent_suite(it);
            match groups.last_mut() {
                Some(group) if group.suite == suite => group.tests.push(it),
                _ => groups.push(Group {
                    suite,
                    tests: vec![it],
                }),
            }
        }
        groups
    }

    /// Run every test, returning the exit code of the run.
    pub fn run_all(&self, reporter: &mut dyn Reporter) -> Result<i32, HarnessError> {
        self.run_groups(self.groups(), reporter)
    }

    /// Run the tests of the suite `suite` only.
    pub fn run_suite(
        &self,
        suite: ItemRef,
        reporter: &mut dyn Reporter,
    ) -> Result<i32, HarnessError> {
        let groups = self
            .groups()
            .into_iter()
            .filter(|group| group.suite == SuiteRef::Item(suite))
            .collect();
        self.run_groups(groups, reporter)
    }

    /// Run a single test in this process and report it.
    pub fn run_single(
        &self,
        test: ItemRef,
        reporter: &mut dyn Reporter,
    ) -> Result<i32, HarnessError> {
        let group = Group {
            suite: self.list.registry().parent_suite(test),
            tests: vec![test],
        };
        self.run_groups(vec![group], reporter)
    }

    /// Child side of the isolation protocol: run `test` and frame its
    /// failures on `out`. Returns the exit code of the child.
    pub fn run_child(&self, test: ItemRef, out: &mut impl Write) -> Result<i32, HarnessError> {
        let code = engine::run_as_child(self.suite_of(test), self.test(test), out)?;
        Ok(code)
    }

    fn run_groups(
        &self,
        groups: Vec<Group>,
        reporter: &mut dyn Reporter,
    ) -> Result<i32, HarnessError> {
        let total = groups.iter().map(|group| group.tests.len()).sum();
        reporter.init(total)?;

        let mut failed = false;
        for group in &groups {
            let suite = self.list.registry().suite(group.suite);
            reporter.suite_start(suite)?;
            for &it in &group.tests {
                failed |= self.run_one(suite, it, reporter)?.is_failure();
            }
            reporter.suite_done(suite)?;
        }

        reporter.done()?;
        Ok(i32::from(failed))
    }

    fn run_one(
        &self,
        suite: &Suite,
        it: ItemRef,
        reporter: &mut dyn Reporter,
    ) -> Result<Outcome, HarnessError> {
        let test = self.test(it);
        reporter.test_start(test)?;

        if test.is_skipped() {
            debug!(test = test.name, "skipping test");
            reporter.test_done(test, Outcome::Skip, None, None, None)?;
            return Ok(Outcome::Skip);
        }

        match self.settings.mode {
            RunMode::Single => {
                let verdict = engine::run_lifecycle(suite, test);
                let outcome = verdict.outcome();
                reporter.test_done(
                    test,
                    outcome,
                    verdict.error_message.as_deref(),
                    verdict.teardown_error_message.as_deref(),
                    None,
                )?;
                Ok(outcome)
            }
            RunMode::Forking => {
                let report = self.spawn(it, test);
                reporter.test_done(
                    test,
                    report.outcome,
                    report.error_message.as_deref(),
                    None,
                    report.output.stdio(),
                )?;
                Ok(report.outcome)
            }
        }
    }

    fn spawn(&self, it: ItemRef, test: &Test) -> ChildReport {
        let timeout = test
            .timeout()
            .or(self.settings.default_timeout)
            .filter(|timeout| !timeout.is_zero());

        let id = self.list[it].id.unwrap_or_default();
        match Invocation::for_test(id) {
            Ok(invocation) => self.settings.isolation.run(&invocation, timeout),
            Err(e) => ChildReport::aborted(e),
        }
    }
}

/// Attach every set-up and tear-down item to the suite it follows and
/// tombstone it. A later declaration replaces an earlier one.
fn resolve_hooks(list: &mut ItemList) {
    let items: Vec<_> = list.iter().collect();
    let registry = list.registry_mut();

    let mut current = SuiteRef::Default;
    for it in items {
        match registry[it].kind {
            ItemKind::Suite(_) => current = SuiteRef::Item(it),
            ItemKind::Setup(fun) => {
                registry.suite_mut(current).setup = Some(fun);
                registry.tombstone(it);
            }
            ItemKind::Teardown(fun) => {
                registry.suite_mut(current).teardown = Some(fun);
                registry.tombstone(it);
            }
            _ => {}
        }
    }
}
