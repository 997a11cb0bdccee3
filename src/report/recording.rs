use std::io;

use super::Reporter;
use crate::test::{Outcome, Suite, Test};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Init(usize),
    SuiteStart(&'static str),
    SuiteDone(&'static str),
    TestStart(&'static str),
    TestDone(&'static str, Outcome),
    Done,
}

/// Keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<Event>,
    pub messages: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn init(&mut self, total: usize) -> io::Result<()> {
        self.events.push(Event::Init(total));
        Ok(())
    }

    fn suite_start(&mut self, suite: &Suite) -> io::Result<()> {
        self.events.push(Event::SuiteStart(suite.name));
        Ok(())
    }

    fn suite_done(&mut self, suite: &Suite) -> io::Result<()> {
        self.events.push(Event::SuiteDone(suite.name));
        Ok(())
    }

    fn test_start(&mut self, test: &Test) -> io::Result<()> {
        self.events.push(Event::TestStart(test.name));
        Ok(())
    }

    fn test_done(
        &mut self,
        test: &Test,
        outcome: Outcome,
        error_message: Option<&str>,
        teardown_error_message: Option<&str>,
        _captured_output: Option<&str>,
    ) -> io::Result<()> {
        self.events.push(Event::TestDone(test.name, outcome));
        self.messages.extend(
            [error_message, teardown_error_message]
                .into_iter()
                .flatten()
                .map(str::to_owned),
        );
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        self.events.push(Event::Done);
        Ok(())
    }
}
