use assert_cmd::Command;
use std::env;

fn sensor() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env_remove("NET_SENSOR_LOG");
    cmd
}

#[test]
fn help_succeeds() {
    let output = sensor().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--list-devices"));
    assert!(stdout.contains("DEVICE"));
}

#[test]
fn short_help_succeeds() {
    sensor().arg("-h").assert().success();
}

#[test]
fn version_succeeds() {
    sensor().arg("--version").assert().success();
}

#[test]
fn invalid_device_argument_fails() {
    sensor().arg("abc").assert().failure();
    sensor().arg("-3").assert().failure();
}

#[test]
fn missing_config_fails() {
    sensor()
        .args(["--config", "/nonexistent/net-sensor.toml", "--read", "-"])
        .assert()
        .failure();
}

#[test]
fn replay_garbage_fails() {
    let dir = env::temp_dir();
    let log = dir.join(format!("net-sensor-cli-{}.log", std::process::id()));
    sensor()
        .args(["--no-dns", "--read", "-", "--alert-log"])
        .arg(&log)
        .write_stdin("definitely not a capture file")
        .assert()
        .failure();
    let _ = std::fs::remove_file(&log);
}
