//! Execution context of the engine.
//!
//! The context is thread-local: it records which lifecycle phase is running,
//! for which test, and where the last panic happened so the fault boundary
//! can turn an unwind into a located message.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    panic::{self, catch_unwind, AssertUnwindSafe},
    sync::Once,
};

use tracing::debug;

use crate::assert::AssertionFailure;

/// Phase of the test lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Init,
    Setup,
    Body,
    Teardown,
    Done,
}

struct PanicLocation(String, u32, u32);

thread_local! {
    static PHASE: Cell<Phase> = const { Cell::new(Phase::Init) };
    static CURRENT_TEST: Cell<Option<&'static str>> = const { Cell::new(None) };
    static PANIC_LOCATION: RefCell<Option<PanicLocation>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install the panic hook recording panic locations.
///
/// Outside of a lifecycle phase the previously installed hook runs instead.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !in_phase() {
                return previous(info);
            }
            let location = info
                .location()
                .map(|l| PanicLocation(l.file().to_owned(), l.line(), l.column()));
            PANIC_LOCATION.with(|cell| *cell.borrow_mut() = location);
        }));
    });
}

fn in_phase() -> bool {
    matches!(phase(), Phase::Setup | Phase::Body | Phase::Teardown)
}

fn phase() -> Phase {
    PHASE.get()
}

/// Name of the test being executed on this thread, if any.
fn current_test() -> Option<&'static str> {
    CURRENT_TEST.get()
}

pub(crate) fn enter_test(name: &'static str) {
    CURRENT_TEST.set(Some(name));
    PHASE.set(Phase::Init);
}

pub(crate) fn leave_test() {
    PHASE.set(Phase::Done);
    CURRENT_TEST.set(None);
}

/// Run `f` as `phase`, returning the failure message if it unwinds.
pub(crate) fn guarded(phase: Phase, f: impl FnOnce()) -> Option<String> {
    install_panic_hook();
    PHASE.set(phase);
    PANIC_LOCATION.with(|cell| cell.borrow_mut().take());

    let result = catch_unwind(AssertUnwindSafe(f));
    PHASE.set(Phase::Init);

    result.err().map(|payload| {
        let message = failure_message(payload.as_ref());
        debug!(test = ?current_test(), %phase, %message, "phase failed");
        message
    })
}

/// Convert an unwind payload into a failure message.
fn failure_message(payload: &(dyn Any + Send)) -> String {
    if let Some(failure) = payload.downcast_ref::<AssertionFailure>() {
        return failure.to_string();
    }

    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|&s| s.to_string()))
        .unwrap_or_else(|| "panicked with a non-string payload".to_string());

    match PANIC_LOCATION.with(|cell| cell.borrow_mut().take()) {
        Some(PanicLocation(file, line, column)) => format!("{file}:{line}:{column}: {message}"),
        None => message,
    }
}
