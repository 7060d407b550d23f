use crate::model::{EvaluationInput, LessonInstance, Recording};
use serde::Serialize;
use tracing::warn;

/// Notifications published to UI observers. Serialized as
/// `{"event": "<name>", "detail": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "camelCase")]
pub enum LessonEvent {
    LessonInstanceStarted(LessonInstance),
    LessonInstanceEnded {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    EvaluationUpdated {
        lesson_instance_id: String,
        student_id: String,
        evaluation: EvaluationInput,
    },
    #[serde(rename_all = "camelCase")]
    RecordingSaved {
        lesson_instance_id: String,
        recording: Recording,
    },
}

impl LessonEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LessonEvent::LessonInstanceStarted(_) => "lessonInstanceStarted",
            LessonEvent::LessonInstanceEnded { .. } => "lessonInstanceEnded",
            LessonEvent::EvaluationUpdated { .. } => "evaluationUpdated",
            LessonEvent::RecordingSaved { .. } => "recordingSaved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&LessonEvent) -> anyhow::Result<()>>;

/// Fire-and-forget observer registry.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&LessonEvent) -> anyhow::Result<()> + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers.push((id, Box::new(observer)));
        id
    }

    #[cfg(test)]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Delivers to every observer. Observer failures are logged and never
    /// reach the publisher.
    pub fn publish(&self, event: &LessonEvent) {
        for (id, observer) in &self.observers {
            if let Err(e) = observer(event) {
                warn!(event = event.name(), subscription = id.0, error = %e, "observer failed");
            }
        }
    }
}
