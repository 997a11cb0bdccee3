use std::{fs, time::Duration};

use assert_cmd::Command;
use predicates::{
    prelude::PredicateBooleanExt,
    str::{contains, is_empty, starts_with},
};

fn selftest() -> Command {
    let mut cmd = Command::cargo_bin("minicut-selftest").unwrap();
    cmd.env("MINICUT_LOG", "off");
    cmd
}

fn faults() -> Command {
    let mut cmd = Command::cargo_bin("minicut-faults").unwrap();
    cmd.env("MINICUT_LOG", "off");
    cmd
}

#[test]
fn selftest_passes() {
    selftest().assert().success().stdout(
        starts_with("1..2\n")
            .and(contains("ok 1 snprintf\n"))
            .and(contains("ok 2 whatever\n"))
            .and(contains("not ok").not()),
    );
}

#[test]
fn selftest_passes_unforked() {
    selftest()
        .args(["-u", "-f", "plain"])
        .assert()
        .success()
        .stdout(
            contains("Running suite `Tests with set-up and tear-down'...")
                .and(contains("  Test `snprintf': OK"))
                .and(contains("  Test `whatever': OK"))
                .and(contains("Done: 2 passed, 0 failed, 0 skipped (2 total).")),
        );
}

#[test]
fn listing_shows_two_tests() {
    let output = selftest().arg("-l").output().unwrap();
    assert!(output.status.success());

    // Suites and hooks are numbered too, so the two tests get ids 4 and 6.
    let listing = String::from_utf8(output.stdout).unwrap();
    let tests: Vec<_> = listing
        .lines()
        .filter(|line| line.trim_start().starts_with("Test"))
        .collect();
    assert_eq!(tests, vec!["    Test `snprintf' [4]", "    Test `whatever' [6]"]);
}

#[test]
fn exclusive_selectors() {
    selftest()
        .args(["-s2", "-t3"])
        .assert()
        .code(1)
        .stdout("Specify either -s or -t!\n");
}

#[test]
fn unknown_test_id() {
    selftest()
        .arg("-t999")
        .assert()
        .code(2)
        .stdout(contains("not found"));
}

#[test]
fn child_protocol_is_silent_on_success() {
    selftest().arg("-t4").assert().success().stdout(is_empty());
}

#[test]
fn single_suite_runs_alone() {
    selftest()
        .arg("-s5")
        .assert()
        .success()
        .stdout(starts_with(
            "1..1\n#> Starting suite Another suite without set-up.\nok 1 whatever\n",
        ));
}

#[test]
fn faults_are_classified() {
    let output = faults().args(["-f", "tap"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report = String::from_utf8(output.stdout).unwrap();
    for expected in [
        "1..12\n",
        "ok 1 passes\n",
        "not ok 2 fails assertion\n# ",
        "Expected <42> but got <54> (42 != 6 * 9)\n",
        "not ok 3 panics\n",
        "InvalidDigit",
        "not ok 4 missing fixture\n",
        "cannot read fixture /nonexistent/minicut/fixture.txt: ",
        "ok 5 prints\n# visible only when captured\n",
        "not ok 6 never runs\n# ",
        "set-up could not acquire its resources\n",
        "not ok 7 body passes\n# ",
        "Expected true but got <1 + 1 == 3>\n",
        "not ok 8 aborts\n# killed by signal 6",
        "not ok 9 hangs\n# timed out after 1 s\n",
        "ok 10 skipped # SKIP\n",
        "#> Finished suite crashes (failed 2 of 3).\n",
        "ok 11 imported passes\n",
        "ok 12 worker prints\n",
    ] {
        assert!(report.contains(expected), "missing {expected:?} in\n{report}");
    }
    assert!(!report.contains("body ran after a failed set-up"), "{report}");
}

#[test]
fn faults_render_as_xml() {
    faults()
        .args(["-f", "xml", "-s7"])
        .assert()
        .code(1)
        .stdout(
            starts_with("<?xml version=\"1.0\"?>\n<report tests-total=\"1\">\n")
                .and(contains("\t<suite name=\"failing set-up\">\n"))
                .and(contains("\t\t<testcase name=\"never runs\" status=\"fail\">\n"))
                .and(contains("<error-message><![CDATA["))
                .and(contains("\t</suite><!-- failing set-up: 1 / 1 -->\n"))
                .and(contains("</report>\n")),
        );
}

#[test]
fn temp_file_transport_gives_same_outcomes() {
    faults()
        .args(["-f", "plain", "-s13"])
        .env("MINICUT_EXECUTION__TRANSPORT", "temp_file")
        .assert()
        .code(1)
        .stdout(
            contains("  Test `aborts': ERROR")
                .and(contains("  Test `hangs': ERROR"))
                .and(contains("  Test `skipped': SKIP")),
        );
}

#[test]
fn disabled_default_timeout_still_runs_tests() {
    faults()
        .args(["-s1", "-f", "plain"])
        .env("MINICUT_EXECUTION__DEFAULT_TIMEOUT", "0")
        .assert()
        .code(1)
        .stdout(contains("  Test `passes': OK"));
}

#[test]
fn worker_threads_may_print() {
    for mode in [&["-u"][..], &[][..]] {
        faults()
            .args(["-f", "plain", "-s19"])
            .args(mode)
            .timeout(Duration::from_secs(10))
            .assert()
            .success()
            .stdout(
                contains("  Test `worker prints': OK")
                    .and(contains("printed by a worker thread")),
            );
    }
}

#[test]
fn children_ignore_the_configuration_of_their_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("minicut.toml"), "[execution]\nmode = \"single\"\n").unwrap();
    fs::write(dir.path().join("forking.toml"), "report = \"plain\"\n").unwrap();

    faults()
        .current_dir(dir.path())
        .args(["-c", "forking.toml", "-s1"])
        .assert()
        .code(1)
        .stdout(
            contains("  Test `fails assertion': FAIL")
                .and(contains("Expected <42> but got <54>"))
                .and(contains("| 1..1").not())
                .and(contains("exited with status").not()),
        );
}
