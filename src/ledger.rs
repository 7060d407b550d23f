use crate::error::{CoreError, CoreResult};
use crate::events::{EventBus, LessonEvent};
use crate::lessons::{load_instance, persist_instance};
use crate::model::{
    now_iso, BehaviorEntry, EvaluationInput, GradeEntry, LessonInstance, ObservationEntry,
};
use crate::store::RecordStore;
use serde_json::Value;
use tracing::debug;

/// Numeric coercion for grade input. Anything that does not read as a number
/// becomes NaN and is kept; the aggregator drops it on read.
pub fn coerce_grade(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                0.0
            } else {
                t.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Free-text payloads are stored verbatim; non-string JSON keeps its literal form.
fn text_of(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `value` wins unless it is empty, then the legacy `note` field is used.
fn note_text(value: &Value, note: &Value) -> String {
    let text = text_of(value);
    if text.is_empty() {
        text_of(note)
    } else {
        text
    }
}

/// Append-only per-student evaluation history inside a lesson instance.
pub struct EvaluationLedger<'a, S> {
    store: &'a S,
    events: &'a EventBus,
}

impl<'a, S: RecordStore> EvaluationLedger<'a, S> {
    pub fn new(store: &'a S, events: &'a EventBus) -> Self {
        Self { store, events }
    }

    /// Closed instances still accept evaluations (late grading).
    pub fn add_evaluation(
        &self,
        lesson_instance_id: &str,
        student_id: &str,
        evaluation: &EvaluationInput,
    ) -> CoreResult<LessonInstance> {
        if lesson_instance_id.trim().is_empty() {
            return Err(CoreError::validation("missing lessonInstanceId"));
        }
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(CoreError::validation("missing studentId"));
        }

        let mut instance = load_instance(self.store, lesson_instance_id)?;
        let now = now_iso();
        let record = instance
            .evaluations
            .entry(student_id.to_string())
            .or_default();

        match evaluation {
            EvaluationInput::Grade {
                value,
                activity_type,
                evaluator_id,
            } => record.grades.push(GradeEntry {
                value: coerce_grade(value),
                activity_type: activity_type.clone(),
                timestamp: now.clone(),
                evaluator_id: evaluator_id.clone(),
            }),
            EvaluationInput::Behavior {
                value,
                evaluator_id,
            } => record.behavior.push(BehaviorEntry {
                emoji: text_of(value),
                timestamp: now.clone(),
                evaluator_id: evaluator_id.clone(),
            }),
            EvaluationInput::Note {
                value,
                note,
                evaluator_id,
            } => record.observations.push(ObservationEntry {
                text: note_text(value, note),
                timestamp: now.clone(),
                evaluator_id: evaluator_id.clone(),
            }),
        }
        record.last_updated = Some(now.clone());
        instance.updated_at = now;

        persist_instance(self.store, &instance)?;
        debug!(
            id = %instance.id,
            student_id,
            kind = evaluation.kind(),
            "evaluation appended"
        );
        self.events.publish(&LessonEvent::EvaluationUpdated {
            lesson_instance_id: instance.id.clone(),
            student_id: student_id.to_string(),
            evaluation: evaluation.clone(),
        });
        Ok(instance)
    }
}
