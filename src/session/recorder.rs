use serde::Serialize;

use crate::models::{DrillItem, DrillOutcome, OutcomeResult};

use super::TransitionError;

/// Append-only outcome list; entry `i` belongs to drill `i` of the definition.
///
/// Positions rather than drill ids key the list, so a program that repeats a
/// drill still gets one outcome per slot.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct OutcomeRecorder {
    outcomes: Vec<DrillOutcome>,
}

impl OutcomeRecorder {
    pub fn record(
        &mut self,
        position: usize,
        item: &DrillItem,
        result: OutcomeResult,
        achieved_value: Option<i64>,
    ) -> Result<(), TransitionError> {
        let expected = self.outcomes.len();
        if position < expected {
            return Err(TransitionError::DuplicateOutcome { position });
        }
        if position > expected {
            return Err(TransitionError::OutOfOrder { position, expected });
        }

        self.outcomes.push(DrillOutcome::new(
            item.id.clone(),
            result,
            achieved_value.unwrap_or(0),
        ));
        Ok(())
    }

    /// Marks every drill without an outcome as skipped. Returns how many.
    pub fn skip_remaining(&mut self, items: &[DrillItem]) -> usize {
        let before = self.outcomes.len();
        self.outcomes.extend(
            items
                .iter()
                .skip(before)
                .map(|item| DrillOutcome::skipped(item.id.clone())),
        );
        self.outcomes.len() - before
    }

    pub fn outcomes(&self) -> &[DrillOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
