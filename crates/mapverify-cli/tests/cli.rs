use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use mapverify_classfile::access::ACC_PUBLIC;
use mapverify_test_utils::{write_jar, ClassBuilder};
use predicates::prelude::*;

fn mapverify() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mapverify"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// `A.foo()V` overridden by `B`, plus `App` overriding the library's `Base.run()V`.
fn fixture(temp: &TempDir) {
    write_jar(
        temp.child("client.jar").path(),
        &[
            ClassBuilder::new("A").method(ACC_PUBLIC, "foo", "()V").build(),
            ClassBuilder::new("B")
                .extends("A")
                .method(ACC_PUBLIC, "foo", "()V")
                .build(),
            ClassBuilder::new("App")
                .extends("lib/Base")
                .method(ACC_PUBLIC, "run", "()V")
                .build(),
        ],
        &[],
    )
    .unwrap();
    write_jar(
        temp.child("base.jar").path(),
        &[ClassBuilder::new("lib/Base")
            .method(ACC_PUBLIC, "run", "()V")
            .build()],
        &[],
    )
    .unwrap();
}

fn run_args(temp: &TempDir, map: &str) -> Vec<String> {
    temp.child("joined.csrg").write_str(map).unwrap();
    vec![
        "--jar".into(),
        temp.child("client.jar").path().display().to_string(),
        "--map".into(),
        temp.child("joined.csrg").path().display().to_string(),
    ]
}

#[test]
fn help_mentions_inputs() {
    mapverify().arg("--help").assert().success().stdout(
        predicate::str::contains("--jar")
            .and(predicate::str::contains("--map"))
            .and(predicate::str::contains("--task"))
            .and(predicate::str::contains("--libs")),
    );
}

#[test]
fn consistent_mappings_pass() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    mapverify()
        .args(run_args(&temp, "A foo ()V bar\nB foo ()V bar\n"))
        .assert()
        .code(0)
        .stdout(
            predicate::str::contains("overridenames: PASS")
                .and(predicate::str::contains("result: PASS")),
        );
}

#[test]
fn renamed_override_fails_with_code_one() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    mapverify()
        .args(run_args(&temp, "A foo ()V bar\nB foo ()V baz\n"))
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("overridenames: FAIL (1 findings)")
                .and(predicate::str::contains(
                    "Invalid Override: bar: A.foo()V; baz: B.foo()V",
                ))
                .and(predicate::str::contains("accesslevels: PASS")),
        );
}

#[test]
fn library_list_brings_in_overridden_methods() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    temp.child("libs.txt")
        .write_str(&format!(
            "# dependencies\n-e={}\n",
            temp.child("base.jar").path().display()
        ))
        .unwrap();

    let mut args = run_args(&temp, "App run ()V go\n");
    mapverify().args(&args).assert().code(0);

    args.push("--libs".into());
    args.push(temp.child("libs.txt").path().display().to_string());
    mapverify()
        .args(&args)
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Invalid Override: go: App.run()V; run: lib/Base.run()V",
        ));
}

#[test]
fn json_report_for_selected_task() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    let output = mapverify()
        .args(run_args(&temp, "B foo ()V baz\n"))
        .args(["--task", "OverrideNames", "--json"])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(1),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["passed"], false);
    let tasks = v["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["task"], "overridenames");
    assert_eq!(tasks[0]["findings"][0]["kind"], "override_mismatch");
}

#[test]
fn unknown_task_is_a_usage_error() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    mapverify()
        .args(run_args(&temp, "A foo ()V bar\n"))
        .args(["--task", "shades"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown task `shades`"));
}

#[test]
fn missing_inputs_exit_with_two() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    mapverify()
        .args([
            "--jar",
            &temp.child("client.jar").path().display().to_string(),
            "--map",
            &temp.child("missing.csrg").path().display().to_string(),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to load mappings"));

    mapverify()
        .args(run_args(&temp, "A foo ()V bar\n"))
        .args(["--lib", &temp.child("nope.jar").path().display().to_string()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.jar"));

    mapverify().args(["--jar", "client.jar"]).assert().code(2);
}

#[test]
fn config_and_log_file() {
    let temp = TempDir::new().unwrap();
    fixture(&temp);
    temp.child("mapverify.toml")
        .write_str("tasks = [\"unnamedclasses\"]\n")
        .unwrap();
    mapverify()
        .args(run_args(&temp, "A net/C_5_\nB foo ()V baz\n"))
        .args([
            "--config",
            &temp.child("mapverify.toml").path().display().to_string(),
            "--log",
            &temp.child("run.log").path().display().to_string(),
        ])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("unnamedclasses: FAIL (1 findings)")
                .and(predicate::str::contains("Unnamed Class: net/C_5_"))
                .and(predicate::str::contains("overridenames").not()),
        );

    temp.child("run.log")
        .assert(predicate::str::contains("loaded archive"));
    let log = std::fs::read_to_string(temp.child("run.log").path()).unwrap();
    assert_eq!(log.matches("loaded mappings").count(), 1, "{log}");
    assert_eq!(log.matches("verification finished").count(), 1, "{log}");
}
