use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn vhub_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vhub"));
    cmd.env("HOME", home).env("USERPROFILE", home);
    cmd
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port")
        .port()
}

struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    fn start(home: &Path, port: u16) -> Self {
        let child = vhub_cmd(home)
            .args(["serve", "--bind", "127.0.0.1", "--port", &port.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server");
        Self { child }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(100));
    }
    false
}

#[test]
fn serve_then_drive_with_client_commands() {
    let home = TempDir::new().expect("home");
    let port = free_port();
    let server = format!("http://127.0.0.1:{port}");
    let _process = ServerProcess::start(home.path(), port);

    assert!(
        wait_until(Duration::from_secs(10), || {
            ureq::get(&format!("{server}/healthcheck")).call().is_ok()
        }),
        "server did not come up in time",
    );

    // First run seeds the default skeleton.
    let data_file: PathBuf = home.path().join(".vhub").join("data.json");
    assert!(data_file.is_file());
    assert!(home.path().join(".vhub").join("data.json.bak").is_file());

    ureq::post(&format!("{server}/api/v1/regions/amer/environments/dev/apps"))
        .send_json(serde_json::json!({ "name": "svc1", "version": "1.0.0" }))
        .expect("create app");

    vhub_cmd(home.path())
        .args(["set-version", "amer", "dev", "svc1", "1.1.0", "--server", &server])
        .assert()
        .success()
        .stdout(contains("amer/dev/svc1 is now at 1.1.0"));

    vhub_cmd(home.path())
        .args(["get", "amer", "dev", "svc1", "--json", "--server", &server])
        .assert()
        .success()
        .stdout(contains("\"version\": \"1.1.0\""));

    vhub_cmd(home.path())
        .args(["list", "--server", &server])
        .assert()
        .success()
        .stdout(contains("svc1"));

    vhub_cmd(home.path())
        .args(["health", "--server", &server])
        .assert()
        .success()
        .stdout(contains("Health checks disabled."));

    vhub_cmd(home.path())
        .args(["get", "amer", "dev", "ghost", "--server", &server])
        .assert()
        .failure()
        .stderr(contains("404"))
        .stderr(contains("app 'amer/dev/ghost' not found"));

    let on_disk = std::fs::read_to_string(&data_file).expect("read data file");
    assert!(on_disk.contains("\"1.1.0\""), "mutation not persisted: {on_disk}");
}
