//! Tests failing in every way the harness knows about.

use std::{thread, time::Duration};

use anyhow::Context;
use minicut::{assert_int_equals, assert_true, assertion_failed, Chain, Extra};

fn passes() {}

fn fails_assertion() {
    assert_int_equals!(42, 6 * 9);
}

fn panics() {
    let parsed: Result<u32, _> = "forty-two".parse::<u32>();
    parsed.unwrap();
}

fn read_fixture(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read fixture {path}"))
}

fn missing_fixture() {
    if let Err(e) = read_fixture("/nonexistent/minicut/fixture.txt") {
        assertion_failed!("{e:#}");
    }
}

fn prints() {
    println!("visible only when captured");
}

fn failing_setup() {
    assertion_failed!("set-up could not acquire its resources");
}

fn never_runs() {
    println!("body ran after a failed set-up");
}

fn failing_teardown() {
    assert_true!(1 + 1 == 3);
}

fn aborts() {
    std::process::abort();
}

fn hangs() {
    thread::sleep(Duration::from_secs(30));
}

fn worker_prints() {
    let worker = thread::spawn(|| println!("printed by a worker thread"));
    assert_true!(worker.join().is_ok());
}

fn shared_tests(chain: &mut Chain) {
    chain.suite("imported").test("imported passes", passes);
}

minicut::export!("shared", shared_tests);

fn fault_tests(chain: &mut Chain) {
    chain
        .suite("assertions")
        .test("passes", passes)
        .test("fails assertion", fails_assertion)
        .test("panics", panics)
        .test("missing fixture", missing_fixture)
        .test("prints", prints);

    chain
        .suite("failing set-up")
        .setup(failing_setup)
        .test("never runs", never_runs);

    chain
        .suite("failing tear-down")
        .teardown(failing_teardown)
        .test("body passes", passes);

    chain
        .suite("crashes")
        .test("aborts", aborts)
        .test_with("hangs", hangs, [Extra::Timeout(1)])
        .test_with("skipped", aborts, [Extra::Skip]);

    chain.import("shared");

    chain.suite("threads").test("worker prints", worker_prints);
}

minicut::main!(fault_tests);
