use crate::error::{CoreResult, StoreError};
use crate::model::LessonInstance;
use crate::store::{self, Collection, RecordStore, SettingsStore};
use serde_json::Value;
use tracing::{debug, info};

pub(crate) const CURRENT_INSTANCE_KEY: &str = "session.currentLessonInstanceId";

/// Tracks the lesson the user is currently "in". The id is mirrored into
/// the settings table so a restarted UI can reattach.
#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<String>,
}

impl SessionContext {
    /// Reads the persisted id and keeps it only while it still resolves to an
    /// open instance.
    pub fn resume<S: RecordStore + SettingsStore>(store: &S) -> CoreResult<SessionContext> {
        let persisted = store
            .setting(CURRENT_INSTANCE_KEY)?
            .and_then(|v| v.as_str().map(str::to_string));
        let Some(id) = persisted else {
            return Ok(SessionContext::default());
        };
        let instance: Option<LessonInstance> = store::load(store, Collection::LessonInstances, &id)?;
        match instance {
            Some(inst) if inst.is_open() => {
                info!(id = %id, "resumed open lesson instance");
                Ok(SessionContext { current: Some(id) })
            }
            _ => {
                debug!(id = %id, "dropping stale current lesson reference");
                store.clear_setting(CURRENT_INSTANCE_KEY)?;
                Ok(SessionContext::default())
            }
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The in-memory pointer moves even when persisting it fails; only the
    /// reattach-after-restart is lost then.
    pub fn set_current(&mut self, settings: &impl SettingsStore, id: &str) -> Result<(), StoreError> {
        self.current = Some(id.to_string());
        settings.set_setting(CURRENT_INSTANCE_KEY, &Value::String(id.to_string()))
    }

    /// Clears the reference only when it points at `id`.
    pub fn release(&mut self, settings: &impl SettingsStore, id: &str) -> Result<bool, StoreError> {
        if self.current.as_deref() != Some(id) {
            return Ok(false);
        }
        self.current = None;
        settings.clear_setting(CURRENT_INSTANCE_KEY)?;
        Ok(true)
    }
}
