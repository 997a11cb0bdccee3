use std::io::{self, Write};

use super::{messages, Reporter, Tally};
use crate::test::{Outcome, Suite, Test};

/// Human readable report.
pub struct PlainReporter<W> {
    out: W,
    run: Tally,
}

impl<W: Write> PlainReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            run: Tally::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for PlainReporter<W> {
    fn init(&mut self, _total: usize) -> io::Result<()> {
        self.run = Tally::default();
        Ok(())
    }

    fn suite_start(&mut self, suite: &Suite) -> io::Result<()> {
        writeln!(self.out, "Running suite `{}'...", suite.name)
    }

    fn suite_done(&mut self, _suite: &Suite) -> io::Result<()> {
        Ok(())
    }

    fn test_start(&mut self, _test: &Test) -> io::Result<()> {
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
        self.run.record(outcome);

        let status = match outcome {
            Outcome::Pass => "OK",
            Outcome::Fail => "FAIL",
            Outcome::Error => "ERROR",
            Outcome::Skip => "SKIP",
        };
        writeln!(self.out, "  Test `{}': {status}", test.name)?;

        if outcome.is_failure() {
            for line in messages(error_message, teardown_error_message).flat_map(str::lines) {
                writeln!(self.out, "    {line}")?;
            }
        }
        for line in captured_output.into_iter().flat_map(str::lines) {
            writeln!(self.out, "    | {line}")?;
        }
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "Done: {} passed, {} failed, {} skipped ({} total).",
            self.run.passed(),
            self.run.failed,
            self.run.skipped,
            self.run.total
        )?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::PlainReporter;
    use crate::report::Reporter;
    use crate::test::{Outcome, Suite, Test};

    fn noop() {}

    #[test]
    fn renders_statuses_and_summary() {
        let suite = Suite::new("math");
        let test = |name| Test {
            name,
            fun: noop,
            extras: Vec::new(),
        };

        let mut reporter = PlainReporter::new(Vec::new());
        reporter.init(2).unwrap();
        reporter.suite_start(&suite).unwrap();
        reporter
            .test_done(&test("adds"), Outcome::Pass, None, None, None)
            .unwrap();
        reporter
            .test_done(
                &test("divides"),
                Outcome::Fail,
                Some("a.rs:3: Expected <1> but got <2>"),
                Some("a.rs:9: leak"),
                Some("hello"),
            )
            .unwrap();
        reporter.suite_done(&suite).unwrap();
        reporter.done().unwrap();

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            text,
            "Running suite `math'...\n\
             \x20 Test `adds': OK\n\
             \x20 Test `divides': FAIL\n\
             \x20   a.rs:3: Expected <1> but got <2>\n\
             \x20   a.rs:9: leak\n\
             \x20   | hello\n\
             Done: 1 passed, 1 failed, 0 skipped (2 total).\n"
        );
    }
}
