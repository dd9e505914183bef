use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    DrillOutcome, SessionDefinition, SessionLog, SessionLogStatus, UNKNOWN_DRILL_ID,
};

use super::{SessionPhase, SessionRunState, TransitionError};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const SQUAD_NOTES_PREFIX: &str = "[Squad Session]";

/// Whole minutes of wall clock, rounded, never below one.
pub fn duration_minutes(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> u32 {
    let elapsed_ms = (finished_at - started_at).num_milliseconds().max(0);
    let minutes = (elapsed_ms as f64 / 60_000.0).round();
    (minutes as u32).max(1)
}

/// A blank id would be refused by the session-log endpoint; the sentinel is not.
pub fn normalize_drill_id(drill_id: &str) -> String {
    let trimmed = drill_id.trim();
    if trimmed.is_empty() {
        log_warn!("drill outcome without an id; saving as {UNKNOWN_DRILL_ID}");
        UNKNOWN_DRILL_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builds the record for a run parked in SUMMARY.
pub fn assemble(
    definition: &SessionDefinition,
    state: &SessionRunState,
    finished_at: DateTime<Utc>,
) -> Result<SessionLog, TransitionError> {
    if state.phase() != SessionPhase::Summary {
        return Err(TransitionError::InvalidEvent {
            phase: state.phase(),
            event: "save",
        });
    }

    let started_at = state.started_at().unwrap_or(finished_at);

    let drill_performances = state
        .outcomes()
        .iter()
        .map(|outcome| DrillOutcome {
            drill_id: normalize_drill_id(&outcome.drill_id),
            ..outcome.clone()
        })
        .collect();

    let session_ref = definition.session_ref.clone();
    let (notes, squad_session_id) = match session_ref.squad_id.as_deref() {
        Some(squad_id) => (
            squad_notes(state.notes()),
            Some(format!(
                "ad-hoc-{squad_id}-{}",
                finished_at.timestamp_millis()
            )),
        ),
        None => (state.notes().to_string(), None),
    };

    Ok(SessionLog {
        id: Uuid::new_v4().to_string(),
        session_ref,
        squad_session_id,
        status: if state.ended_early() {
            SessionLogStatus::EndedEarly
        } else {
            SessionLogStatus::Completed
        },
        started_at,
        completed_at: finished_at,
        duration_minutes: duration_minutes(started_at, finished_at),
        rpe: state.rpe(),
        notes,
        drill_performances,
    })
}

fn squad_notes(notes: &str) -> String {
    if notes.is_empty() {
        SQUAD_NOTES_PREFIX.to_string()
    } else {
        format!("{SQUAD_NOTES_PREFIX} {notes}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::{
        models::{DrillItem, OutcomeResult, SessionRef},
        session::{reduce, SessionEvent, ENDED_EARLY_MARKER},
    };

    fn definition(session_ref: SessionRef) -> SessionDefinition {
        SessionDefinition::new(
            "Baseline day",
            session_ref,
            vec![
                DrillItem::new("d1", "Serve", 10),
                DrillItem::new("d2", "Rally", 5).with_target("Shots Made", 20),
                DrillItem::new("d3", "Volley", 8),
            ],
        )
    }

    fn apply(def: &SessionDefinition, state: SessionRunState, events: Vec<SessionEvent>) -> SessionRunState {
        events.into_iter().fold(state, |state, event| {
            let event = match event {
                SessionEvent::Tick { .. } => SessionEvent::Tick {
                    generation: state.active_ticker().expect("ticker"),
                },
                other => other,
            };
            reduce(def, &state, event).unwrap().state
        })
    }

    fn complete_drill(result: OutcomeResult, achieved: &str) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::StartDrill];
        events.extend(std::iter::repeat(SessionEvent::Tick { generation: 0 }).take(3));
        events.push(SessionEvent::FinishDrill);
        events.push(SessionEvent::SetAchievedValue(achieved.into()));
        events.push(SessionEvent::SubmitFeedback(result));
        events
    }

    #[test]
    fn duration_is_wall_clock_and_at_least_one_minute() {
        let start = Utc::now();
        assert_eq!(duration_minutes(start, start), 1);
        assert_eq!(duration_minutes(start, start + Duration::seconds(20)), 1);
        assert_eq!(duration_minutes(start, start + Duration::seconds(89)), 1);
        assert_eq!(duration_minutes(start, start + Duration::seconds(90)), 2);
        assert_eq!(duration_minutes(start, start + Duration::minutes(47)), 47);
        // Clock skew never produces zero.
        assert_eq!(duration_minutes(start, start - Duration::minutes(5)), 1);
    }

    #[test]
    fn completed_session_carries_rpe_and_notes() {
        let def = definition(SessionRef {
            program_id: Some("p-1".into()),
            session_day_order: Some(3),
            ..SessionRef::default()
        });
        let started = Utc::now();
        let mut events = vec![SessionEvent::Begin { at: started }];
        events.extend(complete_drill(OutcomeResult::Success, ""));
        events.extend(complete_drill(OutcomeResult::Success, "22"));
        events.extend(complete_drill(OutcomeResult::Fail, ""));
        events.push(SessionEvent::SetRpe(7));
        events.push(SessionEvent::SetNotes("felt strong".into()));
        let state = apply(&def, SessionRunState::default(), events);

        let log = assemble(&def, &state, started + Duration::minutes(31)).unwrap();
        assert_eq!(log.drill_performances.len(), 3);
        assert_eq!(log.rpe, 7);
        assert_eq!(log.notes, "felt strong");
        assert!(!log.notes.contains(ENDED_EARLY_MARKER));
        assert_eq!(log.status, SessionLogStatus::Completed);
        assert_eq!(log.duration_minutes, 31);
        assert_eq!(log.session_ref.session_day_order, Some(3));
        assert_eq!(log.drill_performances[1].achieved_value, 22);
        assert_eq!(log.squad_session_id, None);
    }

    #[test]
    fn refuses_to_assemble_before_summary() {
        let def = definition(SessionRef::default());
        let state = apply(
            &def,
            SessionRunState::default(),
            vec![SessionEvent::Begin { at: Utc::now() }],
        );
        assert!(matches!(
            assemble(&def, &state, Utc::now()),
            Err(TransitionError::InvalidEvent {
                phase: SessionPhase::Prep,
                ..
            })
        ));
    }

    #[test]
    fn blank_drill_ids_fall_back_to_sentinel() {
        let def = SessionDefinition::new(
            "Loose",
            SessionRef::default(),
            vec![DrillItem::new(" ", "Mystery", 1), DrillItem::new("d2", "Known", 1)],
        );
        let state = apply(
            &def,
            SessionRunState::default(),
            vec![SessionEvent::Begin { at: Utc::now() }, SessionEvent::EndEarly],
        );

        let log = assemble(&def, &state, Utc::now()).unwrap();
        assert_eq!(log.drill_performances[0].drill_id, UNKNOWN_DRILL_ID);
        assert_eq!(log.drill_performances[1].drill_id, "d2");
        assert_eq!(log.status, SessionLogStatus::EndedEarly);
        assert!(log.notes.starts_with(ENDED_EARLY_MARKER));
    }

    #[test]
    fn squad_sessions_are_tagged() {
        let def = definition(SessionRef {
            squad_id: Some("sq-4".into()),
            ..SessionRef::default()
        });
        let state = apply(
            &def,
            SessionRunState::default(),
            vec![
                SessionEvent::Begin { at: Utc::now() },
                SessionEvent::EndEarly,
                SessionEvent::SetNotes("rain delay".into()),
            ],
        );

        let finished = Utc::now();
        let log = assemble(&def, &state, finished).unwrap();
        assert_eq!(
            log.notes,
            format!("{SQUAD_NOTES_PREFIX} {ENDED_EARLY_MARKER} rain delay")
        );
        assert_eq!(
            log.squad_session_id,
            Some(format!("ad-hoc-sq-4-{}", finished.timestamp_millis()))
        );
    }

    #[test]
    fn wire_payload_uses_camel_case_keys() {
        let def = definition(SessionRef::default());
        let state = apply(
            &def,
            SessionRunState::default(),
            vec![SessionEvent::Begin { at: Utc::now() }, SessionEvent::EndEarly],
        );
        let log = assemble(&def, &state, Utc::now()).unwrap();
        let json = serde_json::to_value(&log).unwrap();

        assert!(json.get("sessionRef").is_some());
        assert_eq!(json["durationMinutes"], 1);
        assert_eq!(json["rpe"], 5);
        assert_eq!(json["drillPerformances"][2]["outcome"], "skipped");
        assert_eq!(json["drillPerformances"][2]["achievedValue"], 0);
    }
}
