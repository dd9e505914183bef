use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    gesture::{HoldDetector, HoldTimer},
    models::{DrillItem, DrillOutcome, OutcomeResult, SessionDefinition, SessionLog},
    session::{
        assemble, reduce, Effect, SessionEvent, SessionLogSink, SessionPhase, SessionRunState,
        TransitionError,
    },
    settings::RuntimeSettings,
    timer::TickerHandle,
};

use super::RuntimeSignal;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionClose {
    Saved { log_id: String },
    /// Left from the overview; nothing was recorded.
    Exited,
}

/// Everything a rendering layer needs for the current screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub title: String,
    pub phase: SessionPhase,
    /// 1-based "Drill k of N" position.
    pub drill_number: usize,
    pub drill_count: usize,
    pub total_nominal_minutes: u32,
    pub current_drill: Option<DrillItem>,
    pub time_remaining_seconds: u32,
    pub is_timer_running: bool,
    pub countdown_value: u8,
    pub achieved_input: String,
    pub outcomes: Vec<DrillOutcome>,
    pub rpe: u8,
    pub notes: String,
    pub ended_early: bool,
    pub hold_pending: bool,
}

/// Drives one run: feeds user actions and timer signals through the reducer
/// and owns the resources its effects ask for.
///
/// The tick source and the hold threshold timer are owned handles. Each is
/// released on every exit path: an explicit stop effect, ending early,
/// leaving a phase, closing, or dropping the controller.
pub struct SessionController {
    definition: SessionDefinition,
    state: SessionRunState,
    settings: RuntimeSettings,
    sink: Arc<dyn SessionLogSink>,
    signal_tx: UnboundedSender<RuntimeSignal>,
    signal_rx: UnboundedReceiver<RuntimeSignal>,
    ticker: Option<TickerHandle>,
    hold: HoldDetector,
    hold_timer: Option<HoldTimer>,
    closed: Option<SessionClose>,
}

impl SessionController {
    /// `None` when there is nothing to run; the caller shows a placeholder.
    pub fn new(
        definition: Option<SessionDefinition>,
        settings: RuntimeSettings,
        sink: Arc<dyn SessionLogSink>,
    ) -> Option<Self> {
        let definition = match definition {
            Some(definition) if !definition.is_empty() => definition,
            _ => {
                log_warn!("no runnable session definition; controller not started");
                return None;
            }
        };

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        Some(Self {
            definition,
            state: SessionRunState::new(settings.countdown_seconds, settings.default_rpe),
            hold: HoldDetector::new(settings.hold_threshold()),
            settings,
            sink,
            signal_tx,
            signal_rx,
            ticker: None,
            hold_timer: None,
            closed: None,
        })
    }

    pub fn definition(&self) -> &SessionDefinition {
        &self.definition
    }

    pub fn state(&self) -> &SessionRunState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn closed(&self) -> Option<&SessionClose> {
        self.closed.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// True while a tick source is alive. Used to check nothing leaks.
    pub fn has_live_ticker(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let drill_count = self.definition.len();
        let index = self.state.current_index();

        SessionSnapshot {
            title: self.definition.title.clone(),
            phase: self.state.phase(),
            drill_number: (index + 1).min(drill_count),
            drill_count,
            total_nominal_minutes: self.definition.total_nominal_minutes(),
            current_drill: self.definition.item(index).cloned(),
            time_remaining_seconds: self.state.time_remaining_seconds(),
            is_timer_running: self.state.is_timer_running(),
            countdown_value: self.state.countdown_value(),
            achieved_input: self.state.achieved_input().to_string(),
            outcomes: self.state.outcomes().to_vec(),
            rpe: self.state.rpe(),
            notes: self.state.notes().to_string(),
            ended_early: self.state.ended_early(),
            hold_pending: self.hold.is_pressed(),
        }
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Result<(), TransitionError> {
        if self.closed.is_some() {
            return Err(TransitionError::SessionClosed);
        }

        let previous = self.state.phase();
        let transition = reduce(&self.definition, &self.state, event)?;
        self.state = transition.state;
        for effect in transition.effects {
            self.apply_effect(effect);
        }

        let current = self.state.phase();
        if previous != current {
            log_debug!("session phase {previous} -> {current}");
            if !current.allows_end_early() {
                self.cancel_hold();
            }
        }
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::Begin { at: Utc::now() })?;
        log_info!(
            "session '{}' started with {} drills",
            self.definition.title,
            self.definition.len()
        );
        Ok(())
    }

    pub fn start_drill(&mut self) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::StartDrill)
    }

    pub fn toggle_pause(&mut self) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::TogglePause)
    }

    pub fn finish_drill(&mut self) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::FinishDrill)
    }

    pub fn set_achieved_value(&mut self, value: impl Into<String>) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::SetAchievedValue(value.into()))
    }

    pub fn submit_feedback(&mut self, result: OutcomeResult) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::SubmitFeedback(result))
    }

    pub fn set_rpe(&mut self, rpe: u8) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::SetRpe(rpe))
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::SetNotes(notes.into()))
    }

    pub fn exit(&mut self) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::Exit)
    }

    /// Finger down on the hold-to-end control. Returns whether a hold was armed.
    pub fn press_hold(&mut self) -> bool {
        if self.closed.is_some() || !self.state.phase().allows_end_early() {
            return false;
        }

        match self.hold.press() {
            Some(generation) => {
                self.hold_timer = Some(HoldTimer::arm(
                    generation,
                    self.hold.threshold(),
                    self.signal_tx.clone(),
                ));
                true
            }
            None => false,
        }
    }

    /// Finger up. Before the threshold this undoes the press completely.
    pub fn release_hold(&mut self) -> bool {
        if let Some(timer) = self.hold_timer.take() {
            timer.disarm();
        }
        self.hold.release()
    }

    pub async fn next_signal(&mut self) -> Option<RuntimeSignal> {
        self.signal_rx.recv().await
    }

    /// Applies a timer or gesture signal. Signals outliving their source are ignored.
    pub fn handle_signal(&mut self, signal: RuntimeSignal) -> Result<(), TransitionError> {
        if self.closed.is_some() {
            return Ok(());
        }

        match signal {
            RuntimeSignal::Tick { generation } => self.dispatch(SessionEvent::Tick { generation }),
            RuntimeSignal::HoldElapsed { generation } => {
                if !self.hold.elapsed(generation) {
                    return Ok(());
                }
                self.hold_timer = None;
                log_info!(
                    "hold-to-end confirmed during {} at drill {} of {}",
                    self.state.phase(),
                    self.state.current_index() + 1,
                    self.definition.len()
                );
                self.dispatch(SessionEvent::EndEarly)
            }
        }
    }

    /// Waits for the next timer or gesture signal and applies it.
    pub async fn step(&mut self) -> Result<(), TransitionError> {
        if let Some(signal) = self.next_signal().await {
            self.handle_signal(signal)?;
        }
        Ok(())
    }

    /// Assembles the log and submits it once. On failure the run stays in
    /// SUMMARY so the player can try again.
    pub async fn save(&mut self) -> Result<SessionLog> {
        if self.closed.is_some() {
            return Err(TransitionError::SessionClosed.into());
        }

        let log = assemble(&self.definition, &self.state, Utc::now())?;

        match self.sink.submit(&log).await {
            Ok(()) => {
                log_info!(
                    "saved session log {} ({} min, {} drills, {:?})",
                    log.id,
                    log.duration_minutes,
                    log.drill_performances.len(),
                    log.status
                );
                self.release_resources();
                self.state =
                    SessionRunState::new(self.settings.countdown_seconds, self.settings.default_rpe);
                self.closed = Some(SessionClose::Saved {
                    log_id: log.id.clone(),
                });
                Ok(log)
            }
            Err(err) => {
                log_error!("failed to save session '{}': {err:?}", self.definition.title);
                Err(err.context("could not save session; try again"))
            }
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StartTicker { generation } => {
                if let Some(previous) = self.ticker.take() {
                    previous.stop();
                }
                self.ticker = Some(TickerHandle::spawn(
                    generation,
                    self.settings.tick_interval(),
                    self.signal_tx.clone(),
                ));
            }
            Effect::StopTicker => {
                if let Some(ticker) = self.ticker.take() {
                    ticker.stop();
                }
            }
            Effect::Close => {
                self.release_resources();
                self.closed = Some(SessionClose::Exited);
                log_info!("session '{}' exited from overview", self.definition.title);
            }
        }
    }

    fn cancel_hold(&mut self) {
        if let Some(timer) = self.hold_timer.take() {
            timer.disarm();
        }
        self.hold.reset();
    }

    fn release_resources(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        self.cancel_hold();
    }
}
