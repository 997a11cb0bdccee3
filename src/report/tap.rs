use std::io::{self, Write};

use super::{messages, Reporter, Tally};
use crate::test::{Outcome, Suite, Test};

/// Test Anything Protocol report.
pub struct TapReporter<W> {
    out: W,
    counter: usize,
    suite: Tally,
}

impl<W: Write> TapReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            counter: 0,
            suite: Tally::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn comment(&mut self, text: &str) -> io::Result<()> {
        for line in text.lines() {
            writeln!(self.out, "# {line}")?;
        }
        Ok(())
    }
}

impl<W: Write> Reporter for TapReporter<W> {
    fn init(&mut self, total: usize) -> io::Result<()> {
        self.counter = 0;
        writeln!(self.out, "1..{total}")
    }

    fn suite_start(&mut self, suite: &Suite) -> io::Result<()> {
        self.suite = Tally::default();
        writeln!(self.out, "#> Starting suite {}.", suite.name)
    }

    fn suite_done(&mut self, suite: &Suite) -> io::Result<()> {
        writeln!(
            self.out,
            "#> Finished suite {} (failed {} of {}).",
            suite.name, self.suite.failed, self.suite.total
        )
    }

    fn test_start(&mut self, _test: &Test) -> io::Result<()> {
        self.counter += 1;
        Ok(())
    }

    fn test_done(
        &mut self,
        test: &Test,
        outcome: Outcome,
        error_message: Option<&str>,
        teardown_error_message: Option<&str>,
        captured_output: Option<&str>,
    ) -> io::Result<()> {
        self.suite.record(outcome);

        let status = if outcome.is_failure() { "not ok" } else { "ok" };
        let directive = if outcome == Outcome::Skip { " # SKIP" } else { "" };
        writeln!(self.out, "{status} {} {}{directive}", self.counter, test.name)?;

        if outcome.is_failure() {
            for message in messages(error_message, teardown_error_message) {
                self.comment(message)?;
            }
        }
        if let Some(output) = captured_output {
            self.comment(output)?;
        }
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
