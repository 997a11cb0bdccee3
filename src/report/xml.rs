use std::io::{self, Write};

use super::{messages, Reporter, Tally};
use crate::test::{Outcome, Suite, Test};

/// XML report, one `testcase` element per test.
pub struct XmlReporter<W> {
    out: W,
    suite: Tally,
}

impl<W: Write> XmlReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            suite: Tally::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn cdata(&mut self, element: &str, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        write!(self.out, "\t\t\t<{element}><![CDATA[")?;
        for line in text.lines() {
            writeln!(self.out, "{}", line.replace("]]>", "]]]]><![CDATA[>"))?;
        }
        writeln!(self.out, "]]></{element}>")
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Comments cannot contain `--`.
fn comment(value: &str) -> String {
    value.replace("--", "- -")
}

impl<W: Write> Reporter for XmlReporter<W> {
    fn init(&mut self, total: usize) -> io::Result<()> {
        writeln!(self.out, "<?xml version=\"1.0\"?>")?;
        writeln!(self.out, "<report tests-total=\"{total}\">")
    }

    fn suite_start(&mut self, suite: &Suite) -> io::Result<()> {
        self.suite = Tally::default();
        writeln!(self.out, "\t<suite name=\"{}\">", escape(suite.name))
    }

    fn suite_done(&mut self, suite: &Suite) -> io::Result<()> {
        writeln!(
            self.out,
            "\t</suite><!-- {}: {} / {} -->",
            comment(suite.name),
            self.suite.failed,
            self.suite.total
        )
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
        self.suite.record(outcome);

        writeln!(
            self.out,
            "\t\t<testcase name=\"{}\" status=\"{outcome}\">",
            escape(test.name)
        )?;
        for message in messages(error_message, teardown_error_message) {
            self.cdata("error-message", message)?;
        }
        self.cdata("standard-output", captured_output.unwrap_or_default())?;
        writeln!(self.out, "\t\t</testcase><!-- {} -->", comment(test.name))
    }

    fn done(&mut self) -> io::Result<()> {
        writeln!(self.out, "</report>")?;
        self.out.flush()
    }
}
