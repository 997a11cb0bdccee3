//! Command line front end.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use gumdrop::{Options, ParsingStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::registry::Unit;
use crate::report::{self, ReportFormat};
use crate::runner::{RunMode, Runner, SelectionError, Selector, Settings};
use crate::test::HarnessError;

#[derive(Debug, Options)]
struct ArgOptions {
    #[options(help = "print help message")]
    help: bool,

    #[options(help = "list suites and tests with their ids")]
    list: bool,

    #[options(help = "run only the suite with this id", meta = "ID")]
    suite: Option<i32>,

    #[options(help = "run only the test with this id", meta = "ID")]
    test: Option<i32>,

    #[options(help = "run every test in this process")]
    unforked: bool,

    #[options(no_short, help = "run the test given with -t as an isolated child")]
    child: bool,

    #[options(help = "report format (plain, tap, xml)", meta = "FORMAT")]
    format: Option<ReportFormat>,

    #[options(help = "path of the configuration file", meta = "PATH")]
    config: Option<PathBuf>,
}

impl ArgOptions {
    fn selector(&self) -> Result<Selector, &'static str> {
        // Ids below 1 are never assigned.
        let id = |id: i32| u32::try_from(id).unwrap_or(0);

        match (self.suite, self.test) {
            (Some(_), Some(_)) => Err("Specify either -s or -t!"),
            (None, Some(test)) if self.child => Ok(Selector::Child(id(test))),
            _ if self.child => Err("Option --child requires -t!"),
            _ if self.list => Ok(Selector::List),
            (Some(suite), None) => Ok(Selector::Suite(id(suite))),
            (None, Some(test)) => Ok(Selector::Test(id(test))),
            (None, None) => Ok(Selector::All),
        }
    }
}

/// Set up logging on stderr, filtered by `MINICUT_LOG` (`warn` by default).
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MINICUT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Run the tests registered by `unit` as instructed by the process arguments.
pub fn main(unit: Unit) -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    // Not locked: tests may print from other threads while the run goes on.
    let code = run(&args, unit, &mut io::stdout());
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Run the tests registered by `unit` as instructed by `args`, writing the
/// report to `out`. Returns the exit code of the process.
pub fn run<S: AsRef<str>, W: Write>(args: &[S], unit: Unit, out: &mut W) -> i32 {
    match execute(args, unit, out) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn execute<S: AsRef<str>, W: Write>(
    args: &[S],
    unit: Unit,
    out: &mut W,
) -> Result<i32, HarnessError> {
    let opts = match ArgOptions::parse_args(args, ParsingStyle::AllOptions) {
        Ok(opts) => opts,
        Err(e) => {
            writeln!(out, "{e}")?;
            writeln!(out, "{}", ArgOptions::usage())?;
            return Ok(1);
        }
    };

    if opts.help {
        writeln!(out, "Usage: [OPTIONS]\n\n{}", ArgOptions::usage())?;
        return Ok(0);
    }

    let selector = match opts.selector() {
        Ok(selector) => selector,
        Err(message) => {
            writeln!(out, "{message}")?;
            return Ok(1);
        }
    };

    // A child runs with the settings of its parent, not with its own.
    let (settings, format) = match selector {
        Selector::Child(_) => (Settings::default(), ReportFormat::default()),
        _ => {
            let mut config = Config::load(
                opts.config
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_CONFIG_FILE)),
            )?;
            if let Some(format) = opts.format {
                config.report = format;
            }
            if opts.unforked {
                config.execution.mode = RunMode::Single;
            }
            debug!(?config, ?selector, "starting");
            (Settings::from(&config.execution), config.report)
        }
    };

    let runner = Runner::new(unit, settings);

    match selector {
        Selector::List => {
            runner.list(out)?;
            Ok(0)
        }
        Selector::All => runner.run_all(&mut *report::reporter(format, out)),
        Selector::Suite(id) => match runner.find_suite(id) {
            Ok(suite) => runner.run_suite(suite, &mut *report::reporter(format, out)),
            Err(e) => selection_failed(out, e),
        },
        Selector::Child(id) => run_child(&runner, id, out),
        Selector::Test(id) if settings.mode == RunMode::Forking => run_child(&runner, id, out),
        Selector::Test(id) => match runner.find_test(id) {
            Ok(test) => runner.run_single(test, &mut *report::reporter(format, out)),
            Err(e) => selection_failed(out, e),
        },
    }
}

fn run_child(runner: &Runner, id: u32, out: &mut impl Write) -> Result<i32, HarnessError> {
    match runner.find_test(id) {
        Ok(test) => runner.run_child(test, out),
        Err(e) => selection_failed(out, e),
    }
}

fn selection_failed(out: &mut impl Write, error: SelectionError) -> Result<i32, HarnessError> {
    writeln!(out, "{error}")?;
    Ok(error.exit_code())
}
