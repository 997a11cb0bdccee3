//! A minimal unit-testing harness.
//!
//! Tests are registered explicitly by *units*, functions declaring suites,
//! hooks and tests on a [`Chain`]. Every test runs in a child process by
//! default, so a crash brings down the test and not the harness.

pub mod assert;
pub mod cli;
pub mod config;
mod macros;
pub mod registry;
pub mod report;
pub mod runner;
pub mod test;

#[doc(hidden)]
pub use inventory;

pub use cli::{main, run};
pub use registry::{Chain, Unit};
pub use report::{ReportFormat, Reporter};
pub use test::{Extra, Outcome, Suite, Test};
