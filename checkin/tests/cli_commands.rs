//! CLI tests for the `checkin` binary.
//!
//! Spawns the binary against a temporary root and checks exit codes and the
//! state it leaves on disk.

use std::path::Path;
use std::process::{Command, Output};

use chrono::{Duration, SecondsFormat, Utc};
use checkin::exit_codes;
use checkin::io::step_slot::STEP_KEY;
use checkin::io::store::KeyValueStore;
use checkin::test_support::TempCheckin;

fn checkin(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_checkin"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("run checkin")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn fresh_root_reports_welcome() {
    let temp = TempCheckin::new().expect("temp root");

    let output = checkin(&temp.root(), &["status"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.contains("arm: control"), "{out}");
    assert!(out.contains("step: Welcome"), "{out}");
    assert!(out.contains("completed: false"), "{out}");
}

#[test]
fn walk_a_treatment_flow_to_completion() {
    let temp = TempCheckin::new().expect("temp root");
    let root = temp.root();

    let output = checkin(&root, &["--arm", "treatment", "advance", "Chat"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("screen: ScheduleCheckIn"));

    let output = checkin(&root, &["--arm", "treatment", "advance", "ScheduleCheckIn"]);
    assert_eq!(output.status.code(), Some(exit_codes::COMPLETE));

    let output = checkin(&root, &["status"]);
    assert_eq!(output.status.code(), Some(exit_codes::COMPLETE));
    assert!(stdout(&output).contains("completed: true"));
}

#[tokio::test]
async fn reset_forgets_progress() {
    let temp = TempCheckin::new().expect("temp root");
    let root = temp.root();

    let output = checkin(&root, &["set-step", "NewGoal"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stored = temp.open_store().get(STEP_KEY).await.expect("get");
    assert_eq!(stored.as_deref(), Some("NewGoal"));

    let output = checkin(&root, &["reset"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("screen: Welcome"));
    assert_eq!(temp.open_store().get(STEP_KEY).await.expect("get"), None);
}

#[test]
fn step_outside_the_arm_fails() {
    let temp = TempCheckin::new().expect("temp root");

    let output = checkin(&temp.root(), &["--arm", "treatment", "goto", "Health"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn retreat_from_welcome_exits() {
    let temp = TempCheckin::new().expect("temp root");

    let output = checkin(&temp.root(), &["retreat", "Welcome"]);

    assert_eq!(output.status.code(), Some(exit_codes::EXITED));
    assert!(stdout(&output).contains("screen: (exited)"));
}

#[test]
fn due_window_opens_before_the_scheduled_time() {
    let temp = TempCheckin::new().expect("temp root");
    let soon = (Utc::now() + Duration::minutes(10)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let later = (Utc::now() + Duration::hours(3)).to_rfc3339_opts(SecondsFormat::Secs, true);

    let output = checkin(&temp.root(), &["due", soon.as_str()]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let output = checkin(&temp.root(), &["due", later.as_str()]);
    assert_eq!(output.status.code(), Some(exit_codes::NOT_DUE));

    let output = checkin(&temp.root(), &["due", "not a time"]);
    assert_eq!(output.status.code(), Some(exit_codes::NOT_DUE));
}

#[test]
fn nothing_missed_skips_the_review_screen() {
    let temp = TempCheckin::new().expect("temp root");
    let root = temp.root();

    let output = checkin(&root, &["missed-workouts", "0"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let output = checkin(&root, &["advance", "Welcome"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("screen: AmbientProgress"));
}

#[test]
fn reset_recovers_a_corrupt_store() {
    let temp = TempCheckin::new().expect("temp root");
    std::fs::create_dir_all(&temp.paths.checkin_dir).expect("create .checkin");
    std::fs::write(temp.store_path(), "not json").expect("corrupt store");

    let output = checkin(&temp.root(), &["status"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));

    let output = checkin(&temp.root(), &["reset"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("screen: Welcome"));

    let output = checkin(&temp.root(), &["status"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("step: Welcome"));
}
