//! Self test: one suite with set-up and tear-down, one without.

use std::sync::{Mutex, MutexGuard, PoisonError};

use minicut::{assert_not_null, assert_null, assert_str_equals, assertion_failed, Chain};

const BUFFER_SIZE: usize = 512;

static BUFFER: Mutex<Option<Vec<u8>>> = Mutex::new(None);

fn buffer() -> MutexGuard<'static, Option<Vec<u8>>> {
    BUFFER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn allocate() {
    let mut buffer = buffer();
    *buffer = Some(Vec::with_capacity(BUFFER_SIZE));
    assert_not_null!(*buffer);
}

fn release() {
    *buffer() = None;
}

fn formats_into_buffer() {
    let mut guard = buffer();
    let Some(buffer) = guard.as_mut() else {
        assertion_failed!("buffer was not allocated");
    };

    let text = format!("{}-{}", 56, "abcd");
    buffer.extend_from_slice(&text.as_bytes()[..text.len().min(BUFFER_SIZE - 1)]);
    assert_str_equals!("56-abcd", String::from_utf8_lossy(buffer));
}

fn buffer_is_released() {
    assert_null!(*buffer());
}

fn alloc_tests(chain: &mut Chain) {
    chain
        .suite("Tests with set-up and tear-down")
        .setup(allocate)
        .teardown(release)
        .test("snprintf", formats_into_buffer)
        .suite("Another suite without set-up")
        .test("whatever", buffer_is_released);
}

minicut::main!(alloc_tests);
