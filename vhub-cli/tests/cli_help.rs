use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

fn vhub_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_vhub"))
}

#[test]
fn help_lists_subcommands() {
    let output = vhub_cmd().arg("--help").output().expect("run --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["serve", "list", "get", "set-version", "health"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
}

#[test]
fn serve_rejects_zero_interval() {
    vhub_cmd()
        .args(["serve", "--save-interval", "0"])
        .assert()
        .failure()
        .stderr(contains("save-interval"));
}

#[test]
fn client_reports_unreachable_server() {
    vhub_cmd()
        .args(["list", "--server", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(contains("is `vhub serve` running?"));
}

#[test]
fn set_version_requires_all_arguments() {
    vhub_cmd()
        .args(["set-version", "amer", "dev", "svc1"])
        .assert()
        .failure()
        .stderr(contains("<VERSION>"));
}
