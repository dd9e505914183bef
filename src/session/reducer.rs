use chrono::{DateTime, Utc};

use crate::{
    models::{DrillItem, OutcomeResult, SessionDefinition},
    timer::TickOutcome,
};

use super::{SessionPhase, SessionRunState, TransitionError};

/// Prepended to the notes of a session the player ended by holding.
pub const ENDED_EARLY_MARKER: &str = "[Session ended early]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// "Begin Session" on the overview; `at` becomes the wall-clock start.
    Begin { at: DateTime<Utc> },
    StartDrill,
    Tick { generation: u64 },
    TogglePause,
    /// "Complete Drill". Required even after the timer reaches zero.
    FinishDrill,
    SetAchievedValue(String),
    SubmitFeedback(OutcomeResult),
    /// A confirmed hold-to-end gesture.
    EndEarly,
    SetRpe(u8),
    SetNotes(String),
    /// "Exit" from the overview; no log is produced.
    Exit,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Begin { .. } => "begin",
            SessionEvent::StartDrill => "start drill",
            SessionEvent::Tick { .. } => "tick",
            SessionEvent::TogglePause => "toggle pause",
            SessionEvent::FinishDrill => "finish drill",
            SessionEvent::SetAchievedValue(_) => "set achieved value",
            SessionEvent::SubmitFeedback(_) => "submit feedback",
            SessionEvent::EndEarly => "end early",
            SessionEvent::SetRpe(_) => "set rpe",
            SessionEvent::SetNotes(_) => "set notes",
            SessionEvent::Exit => "exit",
        }
    }
}

/// Side effects the runtime must carry out, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartTicker { generation: u64 },
    StopTicker,
    Close,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionRunState,
    pub effects: Vec<Effect>,
}

/// Applies one event. On error the input state is still the current state.
pub fn reduce(
    definition: &SessionDefinition,
    state: &SessionRunState,
    event: SessionEvent,
) -> Result<Transition, TransitionError> {
    let mut next = state.clone();
    let mut effects = Vec::new();
    apply(definition, &mut next, &mut effects, event)?;
    Ok(Transition {
        state: next,
        effects,
    })
}

fn apply(
    definition: &SessionDefinition,
    state: &mut SessionRunState,
    effects: &mut Vec<Effect>,
    event: SessionEvent,
) -> Result<(), TransitionError> {
    match (state.phase, event) {
        (SessionPhase::Overview, SessionEvent::Begin { at }) => {
            if definition.is_empty() {
                return Err(TransitionError::EmptySession);
            }
            state.started_at = Some(at);
            enter_prep(definition, state, 0)?;
        }

        (SessionPhase::Overview, SessionEvent::Exit) => effects.push(Effect::Close),

        (SessionPhase::Prep, SessionEvent::StartDrill) => {
            let item = current_item(definition, state.current_index)?;
            state.timer.reset(item.nominal_duration_seconds);
            state.countdown_value = state.countdown_from;
            if state.countdown_value == 0 {
                enter_active(state, effects);
            } else {
                state.phase = SessionPhase::Countdown;
                start_ticker(state, effects);
            }
        }

        // Ticks from a source that has since been stopped are dropped here.
        (_, SessionEvent::Tick { generation }) => {
            if state.ticker != Some(generation) {
                return Ok(());
            }
            match state.phase {
                SessionPhase::Countdown => {
                    state.countdown_value = state.countdown_value.saturating_sub(1);
                    if state.countdown_value == 0 {
                        enter_active(state, effects);
                    }
                }
                SessionPhase::Active => {
                    // Expiry only stops the clock; finishing stays a player action.
                    if state.timer.tick() == TickOutcome::Expired {
                        stop_ticker(state, effects);
                    }
                }
                _ => stop_ticker(state, effects),
            }
        }

        (SessionPhase::Active, SessionEvent::TogglePause) => {
            if state.timer.pause() {
                stop_ticker(state, effects);
            } else if state.timer.resume() {
                start_ticker(state, effects);
            }
        }

        (SessionPhase::Active, SessionEvent::FinishDrill) => {
            state.timer.stop();
            stop_ticker(state, effects);
            state.achieved_input.clear();
            state.phase = SessionPhase::Feedback;
        }

        (SessionPhase::Feedback, SessionEvent::SetAchievedValue(value)) => {
            state.achieved_input = value;
        }

        (SessionPhase::Feedback, SessionEvent::SubmitFeedback(result)) => {
            if result == OutcomeResult::Skipped {
                return Err(TransitionError::UndeclarableOutcome(result));
            }
            let item = current_item(definition, state.current_index)?;
            let achieved = match item.target {
                Some(_) => Some(parse_achieved(&state.achieved_input)?),
                None => None,
            };
            state
                .recorder
                .record(state.current_index, item, result, achieved)?;

            state.achieved_input.clear();
            let next = state.current_index + 1;
            if next < definition.len() {
                enter_prep(definition, state, next)?;
            } else {
                state.current_index = next;
                state.phase = SessionPhase::Summary;
            }
        }

        (phase, SessionEvent::EndEarly) if phase.allows_end_early() => {
            state.timer.stop();
            stop_ticker(state, effects);
            state.recorder.skip_remaining(definition.items());
            state.achieved_input.clear();
            state.ended_early = true;
            state.notes = with_marker(&state.notes);
            state.phase = SessionPhase::Summary;
        }

        (SessionPhase::Summary, SessionEvent::SetRpe(rpe)) => {
            if !(1..=10).contains(&rpe) {
                return Err(TransitionError::RpeOutOfRange(rpe));
            }
            state.rpe = rpe;
        }

        (SessionPhase::Summary, SessionEvent::SetNotes(notes)) => {
            state.notes = if state.ended_early {
                with_marker(&notes)
            } else {
                notes
            };
        }

        (phase, event) => {
            return Err(TransitionError::InvalidEvent {
                phase,
                event: event.name(),
            })
        }
    }

    Ok(())
}

fn current_item(
    definition: &SessionDefinition,
    index: usize,
) -> Result<&DrillItem, TransitionError> {
    definition
        .item(index)
        .ok_or(TransitionError::MissingDrill(index))
}

/// Points the run at drill `index` with its clock loaded but not running.
fn enter_prep(
    definition: &SessionDefinition,
    state: &mut SessionRunState,
    index: usize,
) -> Result<(), TransitionError> {
    let item = current_item(definition, index)?;
    state.timer.reset(item.nominal_duration_seconds);
    state.current_index = index;
    state.countdown_value = state.countdown_from;
    state.phase = SessionPhase::Prep;
    Ok(())
}

fn enter_active(state: &mut SessionRunState, effects: &mut Vec<Effect>) {
    stop_ticker(state, effects);
    state.phase = SessionPhase::Active;
    if state.timer.start() {
        start_ticker(state, effects);
    }
}

fn start_ticker(state: &mut SessionRunState, effects: &mut Vec<Effect>) {
    state.last_generation = state.last_generation.wrapping_add(1);
    let generation = state.last_generation;
    state.ticker = Some(generation);
    effects.push(Effect::StartTicker { generation });
}

fn stop_ticker(state: &mut SessionRunState, effects: &mut Vec<Effect>) {
    if state.ticker.take().is_some() {
        effects.push(Effect::StopTicker);
    }
}

/// Blank means 0; anything else must be a non-negative whole number.
fn parse_achieved(input: &str) -> Result<i64, TransitionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|value| *value >= 0)
        .ok_or_else(|| TransitionError::InvalidAchievedValue(input.to_string()))
}

fn with_marker(notes: &str) -> String {
    if notes.starts_with(ENDED_EARLY_MARKER) {
        notes.to_string()
    } else if notes.trim().is_empty() {
        ENDED_EARLY_MARKER.to_string()
    } else {
        format!("{ENDED_EARLY_MARKER} {notes}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DrillItem, DrillOutcome, SessionRef};

    fn scenario_definition() -> SessionDefinition {
        SessionDefinition::new(
            "Baseline day",
            SessionRef::default(),
            vec![
                DrillItem::new("d1", "Serve", 10),
                DrillItem::new("d2", "Rally", 5).with_target("Shots Made", 20),
                DrillItem::new("d3", "Volley", 8),
            ],
        )
    }

    fn definition_of(n: usize) -> SessionDefinition {
        let items = (0..n)
            .map(|i| DrillItem::new(format!("d{i}"), format!("Drill {i}"), 1))
            .collect();
        SessionDefinition::new("Generated", SessionRef::default(), items)
    }

    fn step(def: &SessionDefinition, state: SessionRunState, event: SessionEvent) -> SessionRunState {
        reduce(def, &state, event).unwrap().state
    }

    fn tick(def: &SessionDefinition, state: SessionRunState) -> SessionRunState {
        let generation = state.active_ticker().expect("a ticker should be running");
        step(def, state, SessionEvent::Tick { generation })
    }

    fn begin(def: &SessionDefinition) -> SessionRunState {
        step(def, SessionRunState::default(), SessionEvent::Begin { at: Utc::now() })
    }

    fn finish_countdown(def: &SessionDefinition, mut state: SessionRunState) -> SessionRunState {
        while state.phase() == SessionPhase::Countdown {
            state = tick(def, state);
        }
        state
    }

    fn to_active(def: &SessionDefinition, state: SessionRunState) -> SessionRunState {
        finish_countdown(def, step(def, state, SessionEvent::StartDrill))
    }

    fn run_drill(
        def: &SessionDefinition,
        state: SessionRunState,
        result: OutcomeResult,
        achieved: &str,
    ) -> SessionRunState {
        let state = to_active(def, state);
        let state = step(def, state, SessionEvent::FinishDrill);
        let state = step(def, state, SessionEvent::SetAchievedValue(achieved.into()));
        step(def, state, SessionEvent::SubmitFeedback(result))
    }

    #[test]
    fn ending_early_during_third_prep_skips_the_rest() {
        let def = scenario_definition();
        let state = begin(&def);
        let state = run_drill(&def, state, OutcomeResult::Success, "");
        let state = run_drill(&def, state, OutcomeResult::Fail, "12");
        assert_eq!(state.phase(), SessionPhase::Prep);

        let state = step(&def, state, SessionEvent::EndEarly);
        assert_eq!(state.phase(), SessionPhase::Summary);
        assert_eq!(
            state.outcomes(),
            &[
                DrillOutcome::new("d1", OutcomeResult::Success, 0),
                DrillOutcome::new("d2", OutcomeResult::Fail, 12),
                DrillOutcome::new("d3", OutcomeResult::Skipped, 0),
            ]
        );
        assert!(state.notes().contains(ENDED_EARLY_MARKER));
        assert!(state.ended_early());
    }

    #[test]
    fn countdown_hands_over_to_active_after_three_ticks() {
        let def = scenario_definition();
        let state = step(&def, begin(&def), SessionEvent::StartDrill);
        assert_eq!(state.phase(), SessionPhase::Countdown);
        assert_eq!(state.countdown_value(), 3);

        let state = tick(&def, state);
        let state = tick(&def, state);
        assert_eq!(state.countdown_value(), 1);
        let countdown_ticker = state.active_ticker().unwrap();

        let transition = reduce(
            &def,
            &state,
            SessionEvent::Tick {
                generation: countdown_ticker,
            },
        )
        .unwrap();
        let state = transition.state;
        assert_eq!(state.phase(), SessionPhase::Active);
        assert_eq!(state.time_remaining_seconds(), 600);
        assert!(state.is_timer_running());
        let active_ticker = state.active_ticker().unwrap();
        assert_ne!(active_ticker, countdown_ticker);
        assert_eq!(
            transition.effects,
            vec![
                Effect::StopTicker,
                Effect::StartTicker {
                    generation: active_ticker
                }
            ]
        );
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let def = scenario_definition();
        let state = step(&def, begin(&def), SessionEvent::StartDrill);
        let countdown_ticker = state.active_ticker().unwrap();
        let state = finish_countdown(&def, state);

        let transition = reduce(
            &def,
            &state,
            SessionEvent::Tick {
                generation: countdown_ticker,
            },
        )
        .unwrap();
        assert_eq!(transition.state, state);
        assert!(transition.effects.is_empty());

        // A tick arriving after the drill is finished is equally harmless.
        let active_ticker = state.active_ticker().unwrap();
        let state = step(&def, state, SessionEvent::FinishDrill);
        let after = step(
            &def,
            state.clone(),
            SessionEvent::Tick {
                generation: active_ticker,
            },
        );
        assert_eq!(after, state);
    }

    #[test]
    fn expiry_stops_the_clock_without_advancing() {
        let def = definition_of(2);
        let mut state = to_active(&def, begin(&def));
        assert_eq!(state.time_remaining_seconds(), 60);

        for _ in 0..59 {
            state = tick(&def, state);
        }
        let generation = state.active_ticker().unwrap();
        let transition = reduce(&def, &state, SessionEvent::Tick { generation }).unwrap();
        assert_eq!(transition.effects, vec![Effect::StopTicker]);

        let state = transition.state;
        assert_eq!(state.phase(), SessionPhase::Active);
        assert_eq!(state.time_remaining_seconds(), 0);
        assert!(!state.is_timer_running());
        assert_eq!(state.active_ticker(), None);

        let toggled = reduce(&def, &state, SessionEvent::TogglePause).unwrap();
        assert!(toggled.effects.is_empty());
        assert!(!toggled.state.is_timer_running());

        let state = step(&def, state, SessionEvent::FinishDrill);
        assert_eq!(state.phase(), SessionPhase::Feedback);
    }

    #[test]
    fn pause_releases_and_resume_reacquires_the_ticker() {
        let def = definition_of(1);
        let state = tick(&def, to_active(&def, begin(&def)));
        assert_eq!(state.time_remaining_seconds(), 59);

        let paused = reduce(&def, &state, SessionEvent::TogglePause).unwrap();
        assert_eq!(paused.effects, vec![Effect::StopTicker]);
        assert!(!paused.state.is_timer_running());

        let resumed = reduce(&def, &paused.state, SessionEvent::TogglePause).unwrap();
        let generation = resumed.state.active_ticker().unwrap();
        assert_eq!(resumed.effects, vec![Effect::StartTicker { generation }]);
        assert_eq!(resumed.state.time_remaining_seconds(), 59);
    }

    #[test]
    fn clock_is_loaded_with_each_drills_own_duration() {
        let def = scenario_definition();
        let within_bound = |state: &SessionRunState| {
            let nominal = def.items()[state.current_index()].nominal_duration_seconds;
            assert!(
                state.time_remaining_seconds() <= nominal,
                "{} drill {}: {} > {nominal}",
                state.phase(),
                state.current_index() + 1,
                state.time_remaining_seconds()
            );
        };

        let mut state = begin(&def);
        for index in 0..def.len() {
            assert_eq!(state.phase(), SessionPhase::Prep);
            assert_eq!(
                state.time_remaining_seconds(),
                def.items()[index].nominal_duration_seconds
            );
            assert!(!state.is_timer_running());
            within_bound(&state);

            state = step(&def, state, SessionEvent::StartDrill);
            while state.phase() == SessionPhase::Countdown {
                within_bound(&state);
                state = tick(&def, state);
            }
            // leave part of the clock unused so a stale value would show up
            for _ in 0..3 {
                within_bound(&state);
                state = tick(&def, state);
            }
            within_bound(&state);

            state = step(&def, state, SessionEvent::FinishDrill);
            state = step(&def, state, SessionEvent::SubmitFeedback(OutcomeResult::Success));
        }
        assert_eq!(state.phase(), SessionPhase::Summary);
    }

    #[test]
    fn full_runs_record_one_outcome_per_drill_in_order() {
        for n in 1..=6 {
            let def = definition_of(n);
            let mut state = begin(&def);
            for i in 0..n {
                assert_eq!(state.outcomes().len(), state.current_index());
                let result = if i % 2 == 0 {
                    OutcomeResult::Success
                } else {
                    OutcomeResult::Fail
                };
                state = run_drill(&def, state, result, "");
            }

            assert_eq!(state.phase(), SessionPhase::Summary);
            assert_eq!(state.outcomes().len(), n);
            for (i, outcome) in state.outcomes().iter().enumerate() {
                assert_eq!(outcome.drill_id, format!("d{i}"));
                assert_ne!(outcome.result, OutcomeResult::Skipped);
            }
            assert!(!state.notes().contains(ENDED_EARLY_MARKER));
        }
    }

    #[test]
    fn ending_early_anywhere_keeps_one_outcome_per_drill() {
        let n = 4;
        let def = definition_of(n);
        let phases = [
            SessionPhase::Prep,
            SessionPhase::Countdown,
            SessionPhase::Active,
            SessionPhase::Feedback,
        ];

        for k in 0..n {
            for phase in phases {
                let mut state = begin(&def);
                for _ in 0..k {
                    state = run_drill(&def, state, OutcomeResult::Success, "");
                }
                state = match phase {
                    SessionPhase::Prep => state,
                    SessionPhase::Countdown => step(&def, state, SessionEvent::StartDrill),
                    SessionPhase::Active => to_active(&def, state),
                    _ => step(&def, to_active(&def, state), SessionEvent::FinishDrill),
                };
                assert_eq!(state.phase(), phase);

                let transition = reduce(&def, &state, SessionEvent::EndEarly).unwrap();
                let state = transition.state;
                assert_eq!(state.phase(), SessionPhase::Summary);
                assert_eq!(state.active_ticker(), None);
                assert!(!state.is_timer_running());
                assert_eq!(state.outcomes().len(), n);

                let (done, skipped) = state.outcomes().split_at(k);
                assert!(done.iter().all(|o| o.result == OutcomeResult::Success));
                assert!(skipped
                    .iter()
                    .all(|o| o.result == OutcomeResult::Skipped && o.achieved_value == 0));

                if phase.is_timed() {
                    assert_eq!(transition.effects, vec![Effect::StopTicker]);
                } else {
                    assert!(transition.effects.is_empty());
                }
            }
        }
    }

    #[test]
    fn achieved_value_only_counts_for_drills_with_a_target() {
        let def = scenario_definition();
        let state = run_drill(&def, begin(&def), OutcomeResult::Success, "99");
        assert_eq!(state.outcomes()[0].achieved_value, 0);

        let state = run_drill(&def, state, OutcomeResult::Success, "  ");
        assert_eq!(state.outcomes()[1].achieved_value, 0);
    }

    #[test]
    fn result_is_never_derived_from_the_target() {
        let def = scenario_definition();
        let state = run_drill(&def, begin(&def), OutcomeResult::Success, "");
        // 25 beats the target of 20, yet the player said it failed.
        let state = run_drill(&def, state, OutcomeResult::Fail, "25");
        assert_eq!(
            state.outcomes()[1],
            DrillOutcome::new("d2", OutcomeResult::Fail, 25)
        );
    }

    #[test]
    fn malformed_achieved_value_is_rejected_without_change() {
        let def = scenario_definition();
        let state = run_drill(&def, begin(&def), OutcomeResult::Success, "");
        let state = step(&def, to_active(&def, state), SessionEvent::FinishDrill);

        for bad in ["abc", "-3", "1.5"] {
            let typed = step(&def, state.clone(), SessionEvent::SetAchievedValue(bad.into()));
            assert_eq!(
                reduce(&def, &typed, SessionEvent::SubmitFeedback(OutcomeResult::Fail))
                    .unwrap_err(),
                TransitionError::InvalidAchievedValue(bad.into())
            );
        }
    }

    #[test]
    fn events_outside_their_phase_are_refused() {
        let def = scenario_definition();
        let overview = SessionRunState::default();

        assert_eq!(
            reduce(&def, &overview, SessionEvent::StartDrill).unwrap_err(),
            TransitionError::InvalidEvent {
                phase: SessionPhase::Overview,
                event: "start drill"
            }
        );
        assert!(reduce(&def, &overview, SessionEvent::EndEarly).is_err());

        let state = begin(&def);
        assert!(reduce(&def, &state, SessionEvent::Exit).is_err());
        assert!(reduce(&def, &state, SessionEvent::FinishDrill).is_err());

        let summary = step(&def, state, SessionEvent::EndEarly);
        assert!(reduce(&def, &summary, SessionEvent::EndEarly).is_err());
        assert_eq!(
            reduce(&def, &summary, SessionEvent::SetRpe(11)).unwrap_err(),
            TransitionError::RpeOutOfRange(11)
        );
        assert_eq!(
            reduce(&def, &summary, SessionEvent::SetRpe(0)).unwrap_err(),
            TransitionError::RpeOutOfRange(0)
        );
    }

    #[test]
    fn skipped_cannot_be_declared() {
        let def = definition_of(1);
        let state = step(&def, to_active(&def, begin(&def)), SessionEvent::FinishDrill);
        assert_eq!(
            reduce(&def, &state, SessionEvent::SubmitFeedback(OutcomeResult::Skipped))
                .unwrap_err(),
            TransitionError::UndeclarableOutcome(OutcomeResult::Skipped)
        );
    }

    #[test]
    fn empty_definition_never_begins() {
        let def = definition_of(0);
        assert_eq!(
            reduce(
                &def,
                &SessionRunState::default(),
                SessionEvent::Begin { at: Utc::now() }
            )
            .unwrap_err(),
            TransitionError::EmptySession
        );
    }

    #[test]
    fn summary_collects_rpe_and_notes() {
        let def = definition_of(1);
        let state = run_drill(&def, begin(&def), OutcomeResult::Success, "");
        assert_eq!(state.rpe(), 5);

        let state = step(&def, state, SessionEvent::SetRpe(7));
        let state = step(&def, state, SessionEvent::SetNotes("felt strong".into()));
        assert_eq!(state.rpe(), 7);
        assert_eq!(state.notes(), "felt strong");
    }

    #[test]
    fn marker_survives_note_edits_after_ending_early() {
        let def = definition_of(2);
        let state = step(&def, begin(&def), SessionEvent::EndEarly);
        assert_eq!(state.notes(), ENDED_EARLY_MARKER);

        let state = step(&def, state, SessionEvent::SetNotes("knee felt sore".into()));
        assert_eq!(state.notes(), format!("{ENDED_EARLY_MARKER} knee felt sore"));
    }

    #[test]
    fn exit_from_overview_closes() {
        let def = definition_of(1);
        let transition = reduce(&def, &SessionRunState::default(), SessionEvent::Exit).unwrap();
        assert_eq!(transition.effects, vec![Effect::Close]);
        assert_eq!(transition.state.phase(), SessionPhase::Overview);
        assert_eq!(transition.state.started_at(), None);
    }

    #[test]
    fn zero_second_countdown_goes_straight_to_active() {
        let def = definition_of(1);
        let state = step(
            &def,
            SessionRunState::new(0, 5),
            SessionEvent::Begin { at: Utc::now() },
        );
        let state = step(&def, state, SessionEvent::StartDrill);
        assert_eq!(state.phase(), SessionPhase::Active);
        assert!(state.is_timer_running());
    }
}
