//! Command-line driver for the check-in sequencer.
//!
//! Operates on the durable store under `<root>/.checkin/` so a flow can be
//! inspected, advanced or reset without the app.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use checkin::core::schedule::{is_checkin_due, parse_checkin_time};
use checkin::core::types::{Arm, StepId};
use checkin::exit_codes;
use checkin::io::config::{CheckinConfig, CheckinPaths, load_config};
use checkin::io::store::FileStore;
use checkin::navigation::{Navigator, ReadinessGate};
use checkin::sequencer::{Sequencer, Transition};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "checkin", version, about = "Weekly check-in step sequencer")]
struct Cli {
    /// Directory containing `.checkin/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Experiment arm (`control` or `treatment`); overrides the config file.
    #[arg(long, global = true)]
    arm: Option<Arm>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resumable step, completion state and session flags.
    Status,
    /// Move forward from STEP.
    Advance { step: StepId },
    /// Move backward from STEP.
    Retreat { step: StepId },
    /// Forget persisted progress and start over at Welcome.
    Reset,
    /// Jump straight to STEP.
    Goto { step: StepId },
    /// Persist STEP as the resume point without moving.
    SetStep { step: StepId },
    /// Record how many workouts of last week's plan were missed.
    MissedWorkouts { count: usize },
    /// Check whether a check-in scheduled at TIME (RFC 3339) is open.
    Due { time: String },
}

/// Prints the screen the app would show.
struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&self, step: StepId) {
        println!("screen: {step}");
    }
}

type CliSequencer = Sequencer<FileStore, StdoutNavigator>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    checkin::logging::init(cli.verbose);
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let paths = CheckinPaths::new(&cli.root);
    let cfg = load_config(&paths.config_path)?;
    let arm = cli.arm.unwrap_or(cfg.arm);

    let exited = Arc::new(AtomicBool::new(false));
    let on_exit = {
        let exited = Arc::clone(&exited);
        Arc::new(move || exited.store(true, Ordering::SeqCst))
    };
    let readiness = ReadinessGate::new();
    readiness.mark_ready();
    let sequencer = Sequencer::new(
        arm,
        Arc::new(FileStore::new(paths.store_path(&cfg))),
        StdoutNavigator,
        readiness,
        on_exit,
    );
    // A reset must work even when the stored progress cannot be read.
    if !matches!(cli.command, Command::Reset) {
        sequencer.resume().await.context("resume check-in")?;
    }

    let code = match cli.command {
        Command::Status => return cmd_status(&sequencer).await,
        Command::Advance { step } => {
            let transition = sequencer.advance(step).await?;
            transition_code(transition)
        }
        Command::Retreat { step } => {
            let transition = sequencer.retreat(step).await?;
            transition_code(transition)
        }
        Command::Reset => {
            sequencer.reset_checkin().await?;
            exit_codes::OK
        }
        Command::Goto { step } => {
            sequencer.navigate_to_step(step).await?;
            if sequencer.current_step().is_none() {
                exit_codes::COMPLETE
            } else {
                exit_codes::OK
            }
        }
        Command::SetStep { step } => {
            sequencer.set_resume_step(step).await?;
            println!("resume: {step}");
            return Ok(exit_codes::OK);
        }
        Command::MissedWorkouts { count } => {
            sequencer
                .flags()
                .record_missed_workout_count(count)
                .await
                .context("record missed workouts")?;
            exit_codes::OK
        }
        Command::Due { time } => return Ok(cmd_due(&cfg, &time)),
    };

    if let Some(step) = sequencer.current_step() {
        sequencer.navigator().navigate(step);
    } else if exited.load(Ordering::SeqCst) {
        println!("screen: (exited)");
    }
    Ok(code)
}

async fn cmd_status(sequencer: &CliSequencer) -> Result<i32> {
    let session = sequencer.flags().load().await.context("load session flags")?;
    let completed = sequencer
        .flags()
        .is_checkin_completed()
        .await
        .context("check completion")?;
    println!("arm: {}", sequencer.arm());
    match sequencer.current_step() {
        Some(step) => println!("step: {step}"),
        None => println!("step: (none)"),
    }
    println!("completed: {completed}");
    println!(
        "{}",
        serde_json::to_string_pretty(&session).context("serialize session flags")?
    );
    Ok(if completed {
        exit_codes::COMPLETE
    } else {
        exit_codes::OK
    })
}

fn cmd_due(cfg: &CheckinConfig, raw: &str) -> i32 {
    let Some(checkin_time) = parse_checkin_time(raw) else {
        println!("due: false (unscheduled)");
        return exit_codes::NOT_DUE;
    };
    let due = is_checkin_due(checkin_time, Utc::now(), cfg.due_window());
    println!("due: {due}");
    if due {
        exit_codes::OK
    } else {
        exit_codes::NOT_DUE
    }
}

fn transition_code(transition: Transition) -> i32 {
    match transition {
        Transition::Moved { .. } => exit_codes::OK,
        Transition::Completed => exit_codes::COMPLETE,
        Transition::Exited => exit_codes::EXITED,
    }
}
