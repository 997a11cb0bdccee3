//! Lifecycle of a single test: set-up, body and tear-down.

use std::io::{self, Write};

use tracing::debug;

use super::context::{self, Phase};
use super::output::write_failure;
use crate::test::{Outcome, Suite, Test, Verdict};

/// Run `test` with the hooks of `suite` and collect the failure messages.
pub fn run_lifecycle(suite: &Suite, test: &Test) -> Verdict {
    context::enter_test(test.name);
    debug!(suite = suite.name, test = test.name, "running test");

    let mut verdict = Verdict::default();

    if let Some(setup) = suite.setup {
        verdict.error_message = context::guarded(Phase::Setup, setup);
    }

    if verdict.error_message.is_none() {
        verdict.error_message = context::guarded(Phase::Body, test.fun);
    }

    if let Some(teardown) = suite.teardown {
        verdict.teardown_error_message = context::guarded(Phase::Teardown, teardown);
    }

    context::leave_test();
    verdict
}

/// Child side of process isolation: run the test, frame its failure
/// messages on `out` and return the exit code to terminate with.
pub fn run_as_child(suite: &Suite, test: &Test, out: &mut impl Write) -> io::Result<i32> {
    let verdict = run_lifecycle(suite, test);

    let messages = [&verdict.error_message, &verdict.teardown_error_message];
    for message in messages.into_iter().flatten() {
        write_failure(out, message)?;
    }
    out.flush()?;

    Ok(match verdict.outcome() {
        Outcome::Pass => 0,
        _ => 1,
    })
}
