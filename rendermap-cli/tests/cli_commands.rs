//! Integration tests for the rendermap binary.
//!
//! Each test points HOME at a temporary directory so the config file and log
//! file land there instead of the user's real ~/.rendermap.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn rendermap(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rendermap"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run rendermap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_small_config(path: &Path, log_file: &Path) {
    fs::write(
        path,
        format!(
            "[benchmark]\nsize = 32\niterations = 2\npartitions = 4\ntexture_side = 2\n\
             [machine]\nnodes = 1\ncpus_per_node = 2\n\
             [logging]\nfile = {}\n",
            log_file.display()
        ),
    )
    .unwrap();
}

#[test]
fn test_config_path_under_home() {
    let home = TempDir::new().unwrap();
    let output = rendermap(home.path(), &["config", "path"]);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        home.path().join(".rendermap/config.ini").display().to_string()
    );
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();

    let first = rendermap(home.path(), &["config", "init"]);
    assert!(first.status.success());
    assert!(stdout(&first).starts_with("Created"));
    assert!(home.path().join(".rendermap/config.ini").exists());

    let second = rendermap(home.path(), &["config", "init"]);
    assert!(stdout(&second).contains("already exists"));

    let show = rendermap(home.path(), &["config", "show"]);
    assert!(show.status.success());
    assert!(stdout(&show).contains("[benchmark]"));
    assert!(stdout(&show).contains("size = 1024"));
}

#[test]
fn test_run_prints_report() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bench.ini");
    let log_file = home.path().join("logs/bench.log");
    write_small_config(&config, &log_file);

    let output = rendermap(
        home.path(),
        &["run", "--config", config.to_str().unwrap(), "-n", "16", "-x", "-p", "2"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&output);
    assert!(out.contains("Running graph rendering with nsize = 16"));
    assert!(out.contains("Generating iterations = 2"));
    assert!(out.contains("Num of partitions = 2"));
    assert!(out.contains("ELAPSED TIME = "));
    assert!(log_file.exists());
}

#[test]
fn test_invalid_config_exits_with_one() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.ini");
    fs::write(&config, "[benchmark]\npartitions = 0\n").unwrap();

    let output = rendermap(home.path(), &["run", "--config", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("partitions"));
}

#[test]
fn test_topology_lists_placement() {
    let home = TempDir::new().unwrap();
    let output = rendermap(home.path(), &["topology", "-ll:cpu", "2", "-ll:nodes", "2"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Machine: 2 node(s)"));
    assert_eq!(out.matches("(SoA,").count(), 4);
}
