//! Resuming a flow from the file-backed store across sequencer instances.

use std::sync::Arc;

use checkin::core::types::{Arm, StepId};
use checkin::io::config::{CheckinConfig, load_config, write_config};
use checkin::io::step_slot::STEP_KEY;
use checkin::io::store::{FileStore, KeyValueStore};
use checkin::navigation::ReadinessGate;
use checkin::sequencer::{Sequencer, Transition};
use checkin::test_support::{ExitProbe, RecordingNavigator, TempCheckin};

fn open(
    temp: &TempCheckin,
    arm: Arm,
    exits: &ExitProbe,
) -> Sequencer<FileStore, RecordingNavigator> {
    Sequencer::new(
        arm,
        Arc::new(temp.open_store()),
        RecordingNavigator::default(),
        ReadinessGate::new(),
        exits.callback(),
    )
}

#[tokio::test]
async fn progress_survives_a_restart() {
    let temp = TempCheckin::new().expect("temp root");
    let exits = ExitProbe::default();

    let first = open(&temp, Arm::Control, &exits);
    assert_eq!(first.resume().await.expect("resume"), StepId::Welcome);
    first.advance(StepId::Welcome).await.expect("advance");
    first.advance(StepId::MissedWorkouts).await.expect("advance");
    drop(first);

    let second = open(&temp, Arm::Control, &exits);
    assert_eq!(
        second.resume().await.expect("resume"),
        StepId::AmbientProgress
    );
    assert_eq!(second.current_step(), Some(StepId::AmbientProgress));
}

#[tokio::test]
async fn legacy_step_names_resume() {
    let temp = TempCheckin::new().expect("temp root");
    temp.open_store()
        .set(STEP_KEY, "CheckInPlanCreation")
        .await
        .expect("seed");

    let exits = ExitProbe::default();
    let sequencer = open(&temp, Arm::Control, &exits);
    assert_eq!(
        sequencer.resume().await.expect("resume"),
        StepId::PlanCreation
    );

    sequencer
        .advance(StepId::PlanCreation)
        .await
        .expect("advance");
    let stored = temp.open_store().get(STEP_KEY).await.expect("get");
    assert_eq!(stored.as_deref(), Some("ScheduleCheckIn"));
}

#[tokio::test]
async fn unknown_or_corrupt_progress_starts_over() {
    let temp = TempCheckin::new().expect("temp root");
    temp.open_store()
        .set(STEP_KEY, "CheckInProgress")
        .await
        .expect("seed");

    let exits = ExitProbe::default();
    let sequencer = open(&temp, Arm::Treatment, &exits);
    assert_eq!(sequencer.resume().await.expect("resume"), StepId::Welcome);
}

#[tokio::test]
async fn completion_clears_progress_on_disk() {
    let temp = TempCheckin::new().expect("temp root");
    let exits = ExitProbe::default();

    let sequencer = open(&temp, Arm::Treatment, &exits);
    sequencer.advance(StepId::Chat).await.expect("advance");
    let done = sequencer
        .advance(StepId::ScheduleCheckIn)
        .await
        .expect("advance");
    assert_eq!(done, Transition::Completed);
    assert_eq!(exits.count(), 1);

    let reopened = open(&temp, Arm::Treatment, &exits);
    assert!(
        reopened
            .flags()
            .is_checkin_completed()
            .await
            .expect("completed")
    );
    assert_eq!(reopened.resume().await.expect("resume"), StepId::Welcome);
}

#[test]
fn config_round_trips_through_the_checkin_dir() {
    let temp = TempCheckin::new().expect("temp root");
    assert_eq!(
        load_config(&temp.paths.config_path).expect("defaults"),
        CheckinConfig::default()
    );

    let cfg = CheckinConfig {
        arm: Arm::Treatment,
        due_window_minutes: 45,
        ..CheckinConfig::default()
    };
    write_config(&temp.paths.config_path, &cfg).expect("write");
    assert_eq!(load_config(&temp.paths.config_path).expect("load"), cfg);
    assert_eq!(temp.paths.store_path(&cfg), temp.store_path());
}
