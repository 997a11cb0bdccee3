//! Reporting sink.
//!
//! The runner forwards every event of a run to a [`Reporter`]; renderers
//! turn them into plain text, TAP or XML.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::test::{Outcome, Suite, Test};

mod plain;
mod tap;
mod xml;

#[cfg(test)]
pub(crate) mod recording;

pub use plain::PlainReporter;
pub use tap::TapReporter;
pub use xml::XmlReporter;

/// Receives the events of a run, in order.
pub trait Reporter {
    /// Called once before anything runs, with the number of tests to run.
    fn init(&mut self, total: usize) -> io::Result<()>;

    fn suite_start(&mut self, suite: &Suite) -> io::Result<()>;

    fn suite_done(&mut self, suite: &Suite) -> io::Result<()>;

    fn test_start(&mut self, test: &Test) -> io::Result<()>;

    /// Called when a test ends, with its failure messages and captured
    /// output, if any.
    fn test_done(
        &mut self,
        test: &Test,
        outcome: Outcome,
        error_message: Option<&str>,
        teardown_error_message: Option<&str>,
        captured_output: Option<&str>,
    ) -> io::Result<()>;

    fn done(&mut self) -> io::Result<()>;
}

/// Available renderers.
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
pub enum ReportFormat {
    Plain,
    #[default]
    Tap,
    Xml,
}

/// Create the renderer for `format`, writing to `out`.
pub fn reporter<'a, W: Write + 'a>(format: ReportFormat, out: W) -> Box<dyn Reporter + 'a> {
    match format {
        ReportFormat::Plain => Box::new(PlainReporter::new(out)),
        ReportFormat::Tap => Box::new(TapReporter::new(out)),
        ReportFormat::Xml => Box::new(XmlReporter::new(out)),
    }
}

/// Running counters of a suite or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    total: usize,
    failed: usize,
    skipped: usize,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Fail | Outcome::Error => self.failed += 1,
            Outcome::Skip => self.skipped += 1,
            Outcome::Pass => {}
        }
    }

    fn passed(&self) -> usize {
        self.total - self.failed - self.skipped
    }
}

/// Messages of a test in reporting order.
fn messages<'m>(
    error_message: Option<&'m str>,
    teardown_error_message: Option<&'m str>,
) -> impl Iterator<Item = &'m str> {
    [error_message, teardown_error_message]
        .into_iter()
        .flatten()
        .filter(|message| !message.is_empty())
}
