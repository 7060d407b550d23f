use crate::error::{CoreError, CoreResult};
use crate::events::{EventBus, LessonEvent};
use crate::model::{
    now_iso, Activity, LessonInstance, LessonKey, LessonSnapshot, LessonStatus, Recording,
    ADHOC_CLASS_PLACEHOLDER,
};
use crate::schedule;
use crate::store::{self, Collection, RecordStore};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Fields captured by the "enter class" modal. Non-empty values win over the
/// schedule entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOverrides {
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub subject_label: Option<String>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityInput {
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingInput {
    #[serde(default)]
    pub id: Option<String>,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct LessonFilter {
    pub class_id: Option<String>,
    pub status: Option<LessonStatus>,
}

const DEFAULT_ACTIVITY_TYPE: &str = "activity";

fn pick(over: &Option<String>, base: Option<String>) -> Option<String> {
    match over.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => base,
    }
}

fn require_id<'s>(id: &'s str) -> CoreResult<&'s str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CoreError::validation("missing lesson instance id"));
    }
    Ok(id)
}

/// Reads the full instance record, failing when it does not exist.
pub(crate) fn load_instance(store: &impl RecordStore, id: &str) -> CoreResult<LessonInstance> {
    let id = require_id(id)?;
    store::load(store, Collection::LessonInstances, id)?
        .ok_or_else(|| CoreError::lesson_not_found(id))
}

pub(crate) fn persist_instance(store: &impl RecordStore, instance: &LessonInstance) -> CoreResult<()> {
    store::save(store, Collection::LessonInstances, &instance.id, instance)?;
    Ok(())
}

pub struct LessonInstanceManager<'a, S> {
    store: &'a S,
    events: &'a EventBus,
}

impl<'a, S: RecordStore> LessonInstanceManager<'a, S> {
    pub fn new(store: &'a S, events: &'a EventBus) -> Self {
        Self { store, events }
    }

    pub fn create_from_schedule(
        &self,
        lesson_key: &str,
        overrides: &LessonOverrides,
    ) -> CoreResult<LessonInstance> {
        let key = LessonKey::parse(lesson_key)?;
        let base = if key.is_adhoc() {
            LessonSnapshot {
                class_id: ADHOC_CLASS_PLACEHOLDER.to_string(),
                ..LessonSnapshot::default()
            }
        } else {
            let entry = schedule::find_entry(self.store, &key)?.ok_or_else(|| {
                CoreError::validation(format!("no schedule entry for lesson key {}", key))
            })?;
            LessonSnapshot {
                class_id: entry.class_id,
                class_name: entry.class_name,
                subject_code: entry.subject_code,
                subject_label: entry.subject_label,
                activity_type: entry.activity_type,
                room: entry.room,
            }
        };

        let snapshot = LessonSnapshot {
            class_id: pick(&overrides.class_id, Some(base.class_id)).unwrap_or_default(),
            class_name: pick(&overrides.class_name, base.class_name),
            subject_code: pick(&overrides.subject_code, base.subject_code),
            subject_label: pick(&overrides.subject_label, base.subject_label),
            activity_type: pick(&overrides.activity_type, base.activity_type),
            room: pick(&overrides.room, base.room),
        };
        if snapshot.class_id.trim().is_empty() {
            return Err(CoreError::validation(format!(
                "schedule entry {} has no classId",
                key
            )));
        }

        let now = now_iso();
        let instance = LessonInstance {
            id: Uuid::new_v4().to_string(),
            lesson_key: key.to_string(),
            snapshot,
            note: pick(&overrides.note, None),
            start_time: now.clone(),
            end_time: None,
            status: LessonStatus::Open,
            activities: Vec::new(),
            recordings: Vec::new(),
            evaluations: BTreeMap::new(),
            updated_at: now,
        };
        persist_instance(self.store, &instance)?;
        info!(
            id = %instance.id,
            day = key.day(),
            time = key.time(),
            adhoc = key.is_adhoc(),
            class_id = %instance.snapshot.class_id,
            "lesson instance started"
        );
        self.events
            .publish(&LessonEvent::LessonInstanceStarted(instance.clone()));
        Ok(instance)
    }

    /// Missing ids are an expected outcome for stale references.
    pub fn get(&self, id: &str) -> CoreResult<Option<LessonInstance>> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        Ok(store::load(self.store, Collection::LessonInstances, id)?)
    }

    /// Newest first.
    pub fn list(&self, filter: &LessonFilter) -> CoreResult<Vec<LessonInstance>> {
        let mut out: Vec<LessonInstance> =
            store::load_all::<LessonInstance>(self.store, Collection::LessonInstances)?
                .into_iter()
                .filter(|i| {
                    filter
                        .class_id
                        .as_deref()
                        .map_or(true, |c| i.snapshot.class_id == c)
                })
                .filter(|i| filter.status.map_or(true, |s| i.status == s))
                .collect();
        out.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    /// Closing twice keeps the first `endTime`.
    pub fn close(&self, id: &str) -> CoreResult<LessonInstance> {
        let mut instance = load_instance(self.store, id)?;
        if instance.status == LessonStatus::Closed {
            debug!(id = %instance.id, "lesson instance already closed");
            return Ok(instance);
        }
        let now = now_iso();
        instance.status = LessonStatus::Closed;
        instance.end_time = Some(now.clone());
        instance.updated_at = now;
        persist_instance(self.store, &instance)?;
        info!(id = %instance.id, "lesson instance closed");
        self.events.publish(&LessonEvent::LessonInstanceEnded {
            id: instance.id.clone(),
        });
        Ok(instance)
    }

    pub fn add_activity(&self, id: &str, activity: &ActivityInput) -> CoreResult<LessonInstance> {
        let mut instance = load_instance(self.store, id)?;
        let now = now_iso();
        instance.activities.push(Activity {
            timestamp: now.clone(),
            description: activity.description.clone(),
            kind: pick(&activity.kind, None).unwrap_or_else(|| DEFAULT_ACTIVITY_TYPE.to_string()),
        });
        instance.updated_at = now;
        persist_instance(self.store, &instance)?;
        debug!(id = %instance.id, count = instance.activities.len(), "activity appended");
        Ok(instance)
    }

    pub fn add_recording(&self, id: &str, recording: &RecordingInput) -> CoreResult<LessonInstance> {
        if recording.filename.trim().is_empty() {
            return Err(CoreError::validation("recording filename must not be empty"));
        }
        let mut instance = load_instance(self.store, id)?;
        let now = now_iso();
        instance.recordings.push(Recording {
            id: pick(&recording.id, None).unwrap_or_else(|| Uuid::new_v4().to_string()),
            filename: recording.filename.clone(),
            url: recording.url.clone(),
            timestamp: now.clone(),
        });
        instance.updated_at = now;
        persist_instance(self.store, &instance)?;
        debug!(id = %instance.id, count = instance.recordings.len(), "recording appended");
        Ok(instance)
    }
}
