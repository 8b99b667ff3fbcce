use std::process::Command;

#[test]
fn cli_plays_requested_rounds_with_builtin_config() {
    let output = Command::new(env!("CARGO_BIN_EXE_hexa"))
        .args(["--rounds", "1", "--max-ticks", "3000", "--buy", "archer@700,760"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to invoke the hexa CLI binary");

    assert!(output.status.success(), "hexa should exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("starting gold after purchases: 7"),
        "archer purchase should cost 3 gold, got:\n{stdout}"
    );
    assert!(stdout.contains("round 1:"), "round summary missing:\n{stdout}");
}

#[test]
fn cli_rejects_malformed_purchase_orders() {
    let output = Command::new(env!("CARGO_BIN_EXE_hexa"))
        .args(["--buy", "archer"])
        .output()
        .expect("failed to invoke the hexa CLI binary");

    assert!(!output.status.success(), "malformed orders must fail argument parsing");
}

#[test]
fn cli_reports_missing_config_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_hexa"))
        .args(["--config", "/nonexistent/hexa.toml"])
        .output()
        .expect("failed to invoke the hexa CLI binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("/nonexistent/hexa.toml"),
        "error should name the config path, got:\n{stderr}"
    );
}
