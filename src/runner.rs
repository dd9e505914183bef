//! Headless terminal runner: one session, driven by line commands on stdin.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    adapter::DefinitionAdapter,
    db::Database,
    models::OutcomeResult,
    runtime::{SessionClose, SessionController, SessionSnapshot},
    session::SessionPhase,
    settings::{self, SettingsStore},
    timer::format_clock,
};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const HELP: &str = "commands: begin | start | pause | finish | success | fail | value <n> | \
     hold | release | rpe <1-10> | notes <text> | save | exit | status | help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Begin,
    Start,
    Pause,
    Finish,
    Outcome(OutcomeResult),
    Value(String),
    Hold,
    Release,
    Rpe(u8),
    Notes(String),
    Save,
    Exit,
    Status,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'; type 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("rpe must be a whole number from 1 to 10, got '{0}'")]
    InvalidRpe(String),
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "begin" => Command::Begin,
            "start" => Command::Start,
            "pause" | "resume" => Command::Pause,
            "finish" => Command::Finish,
            "success" => Command::Outcome(OutcomeResult::Success),
            "fail" => Command::Outcome(OutcomeResult::Fail),
            // blank clears the field
            "value" => Command::Value(rest.to_string()),
            "hold" => Command::Hold,
            "release" => Command::Release,
            "rpe" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("rpe"));
                }
                let rpe = rest
                    .parse()
                    .map_err(|_| CommandError::InvalidRpe(rest.to_string()))?;
                Command::Rpe(rpe)
            }
            "notes" => Command::Notes(rest.to_string()),
            "save" => Command::Save,
            "exit" | "quit" => Command::Exit,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Loads settings and the definition, then runs one session until it is
/// saved, exited, or stdin closes.
pub async fn run(definition_path: PathBuf) -> Result<()> {
    let data_dir = settings::data_dir();
    let store = SettingsStore::new(data_dir.join("settings.json"))?;
    let settings = store.runtime().with_env_overrides();

    let raw = tokio::fs::read_to_string(&definition_path)
        .await
        .with_context(|| format!("failed to read {}", definition_path.display()))?;
    let definition = DefinitionAdapter::new(settings.default_drill_minutes)
        .from_json_str(&raw)
        .with_context(|| format!("invalid session definition {}", definition_path.display()))?;

    let database = Database::new(data_dir.join("drillrun.sqlite3"))?;

    let Some(mut controller) = SessionController::new(definition, settings, Arc::new(database))
    else {
        println!("Nothing to run: this session has no drills.");
        return Ok(());
    };

    print_overview(&controller);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = controller.snapshot();

    loop {
        tokio::select! {
            signal = controller.next_signal() => {
                if let Some(signal) = signal {
                    if let Err(err) = controller.handle_signal(signal) {
                        log_warn!("signal {signal:?} rejected: {err}");
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(command)) => apply(&mut controller, command).await,
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
        }

        let current = controller.snapshot();
        print_changes(&last, &current);
        last = current;

        match controller.closed() {
            Some(SessionClose::Saved { log_id }) => {
                println!("Session saved ({log_id}).");
                break;
            }
            Some(SessionClose::Exited) => {
                println!("Session closed.");
                break;
            }
            None => {}
        }
    }

    Ok(())
}

async fn apply(controller: &mut SessionController, command: Command) {
    let result = match command {
        Command::Begin => controller.begin(),
        Command::Start => controller.start_drill(),
        Command::Pause => controller.toggle_pause(),
        Command::Finish => controller.finish_drill(),
        Command::Outcome(result) => controller.submit_feedback(result),
        Command::Value(value) => controller.set_achieved_value(value),
        Command::Rpe(rpe) => controller.set_rpe(rpe),
        Command::Notes(notes) => controller.set_notes(notes),
        Command::Exit => controller.exit(),
        Command::Hold => {
            if controller.press_hold() {
                println!("Holding... keep holding to end the session, 'release' to cancel.");
            } else {
                println!("Nothing to end right now.");
            }
            Ok(())
        }
        Command::Release => {
            controller.release_hold();
            Ok(())
        }
        Command::Save => {
            if let Err(err) = controller.save().await {
                println!("{err:#}");
            }
            Ok(())
        }
        Command::Status => {
            print_status(&controller.snapshot());
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
    };

    if let Err(err) = result {
        println!("{err}");
    }
}

fn print_overview(controller: &SessionController) {
    let snapshot = controller.snapshot();
    println!(
        "{} - {} drills, {} min",
        snapshot.title, snapshot.drill_count, snapshot.total_nominal_minutes
    );
    for (index, item) in controller.definition().items().iter().enumerate() {
        let target = item
            .target
            .as_ref()
            .map(|t| format!(" ({}: {})", t.label, t.value))
            .unwrap_or_default();
        println!(
            "  {}. {} [{}]{}",
            index + 1,
            item.name,
            format_clock(item.nominal_duration_seconds),
            target
        );
    }
}

fn print_status(snapshot: &SessionSnapshot) {
    println!(
        "{} | Drill {} of {} | {} | rpe {} | {} outcomes",
        snapshot.phase,
        snapshot.drill_number,
        snapshot.drill_count,
        format_clock(snapshot.time_remaining_seconds),
        snapshot.rpe,
        snapshot.outcomes.len()
    );
}

fn print_changes(previous: &SessionSnapshot, current: &SessionSnapshot) {
    if previous.phase != current.phase || previous.drill_number != current.drill_number {
        print_phase(current);
        return;
    }

    match current.phase {
        SessionPhase::Countdown if previous.countdown_value != current.countdown_value => {
            println!("{}", current.countdown_value);
        }
        SessionPhase::Active
            if previous.time_remaining_seconds != current.time_remaining_seconds
                || previous.is_timer_running != current.is_timer_running =>
        {
            let paused = if current.is_timer_running { "" } else { " (paused)" };
            println!("{}{paused}", format_clock(current.time_remaining_seconds));
        }
        _ => {}
    }
}

fn print_phase(snapshot: &SessionSnapshot) {
    let drill = snapshot.current_drill.as_ref();
    match snapshot.phase {
        SessionPhase::Overview => {}
        SessionPhase::Prep => {
            if let Some(drill) = drill {
                println!(
                    "Drill {} of {}: {}",
                    snapshot.drill_number, snapshot.drill_count, drill.name
                );
                if let Some(instructions) = drill.instructions.as_deref().or(drill.notes.as_deref())
                {
                    println!("  {instructions}");
                }
                println!("Type 'start' when ready.");
            }
        }
        SessionPhase::Countdown => println!("Get ready... {}", snapshot.countdown_value),
        SessionPhase::Active => println!(
            "Go! {} on the clock. 'pause' or 'finish'.",
            format_clock(snapshot.time_remaining_seconds)
        ),
        SessionPhase::Feedback => {
            if let Some(target) = drill.and_then(|d| d.target.as_ref()) {
                println!("{} (target {}): 'value <n>', then", target.label, target.value);
            }
            println!("How did it go? 'success' or 'fail'.");
        }
        SessionPhase::Summary => {
            let heading = if snapshot.ended_early {
                "Session ended early."
            } else {
                "Session complete."
            };
            println!("{heading} {} drills logged.", snapshot.outcomes.len());
            println!("Set 'rpe <1-10>' (now {}), optional 'notes <text>', then 'save'.", snapshot.rpe);
        }
    }
}
