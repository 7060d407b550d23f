use crate::error::{CoreError, CoreResult};
use crate::model::{parse_hhmm, LessonKey, ScheduleEntry};
use crate::store::{self, Collection, RecordStore, SettingsStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub(crate) const CONFIG_KEY: &str = "schedule.config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub days: Vec<String>,
    pub time_slots: Vec<String>,
    pub slot_minutes: u32,
    pub auto_select_default: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            days: ["Lunedì", "Martedì", "Mercoledì", "Giovedì", "Venerdì", "Sabato"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            time_slots: ["08:00", "09:00", "10:00", "11:00", "12:00", "13:00"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            slot_minutes: 60,
            auto_select_default: true,
        }
    }
}

pub fn load_config(settings: &impl SettingsStore) -> CoreResult<ScheduleConfig> {
    let Some(saved) = settings.setting(CONFIG_KEY)? else {
        return Ok(ScheduleConfig::default());
    };
    // A malformed stored config must not block the schedule UI.
    match serde_json::from_value(saved) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(error = %e, "stored schedule config unreadable, using defaults");
            Ok(ScheduleConfig::default())
        }
    }
}

fn parse_string_list(v: &Value, key: &str) -> CoreResult<Vec<String>> {
    let Some(items) = v.as_array() else {
        return Err(CoreError::validation(format!("{} must be an array", key)));
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(s) = item.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
            return Err(CoreError::validation(format!(
                "{} must contain non-empty strings",
                key
            )));
        };
        if !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    }
    if out.is_empty() {
        return Err(CoreError::validation(format!("{} must not be empty", key)));
    }
    Ok(out)
}

pub fn apply_config_patch(cfg: &mut ScheduleConfig, patch: &Map<String, Value>) -> CoreResult<()> {
    for (k, v) in patch {
        match k.as_str() {
            "days" => cfg.days = parse_string_list(v, k)?,
            "timeSlots" => {
                let mut slots = parse_string_list(v, k)?;
                if let Some(bad) = slots.iter().find(|s| parse_hhmm(s).is_none()) {
                    return Err(CoreError::validation(format!(
                        "timeSlots entries must be HH:MM: {}",
                        bad
                    )));
                }
                slots.sort();
                cfg.time_slots = slots;
            }
            "slotMinutes" => {
                let n = v
                    .as_u64()
                    .filter(|n| (1..=240).contains(n))
                    .ok_or_else(|| CoreError::validation("slotMinutes must be between 1 and 240"))?;
                cfg.slot_minutes = n as u32;
            }
            "autoSelectDefault" => {
                cfg.auto_select_default = v
                    .as_bool()
                    .ok_or_else(|| CoreError::validation("autoSelectDefault must be boolean"))?;
            }
            _ => {
                return Err(CoreError::validation(format!(
                    "unknown schedule config field: {}",
                    k
                )))
            }
        }
    }
    Ok(())
}

pub fn update_config(
    settings: &impl SettingsStore,
    patch: &Map<String, Value>,
) -> CoreResult<ScheduleConfig> {
    let mut cfg = load_config(settings)?;
    apply_config_patch(&mut cfg, patch)?;
    settings.set_setting(
        CONFIG_KEY,
        &serde_json::to_value(&cfg).map_err(crate::error::StoreError::from)?,
    )?;
    Ok(cfg)
}

pub fn find_entry(store: &impl RecordStore, key: &LessonKey) -> CoreResult<Option<ScheduleEntry>> {
    if key.is_adhoc() {
        return Ok(None);
    }
    Ok(store::load(store, Collection::ScheduleEntries, &key.to_string())?)
}

/// Entries for one day (or all days), ordered by time.
pub fn list_entries(store: &impl RecordStore, day: Option<&str>) -> CoreResult<Vec<ScheduleEntry>> {
    let mut entries: Vec<ScheduleEntry> =
        store::load_all::<ScheduleEntry>(store, Collection::ScheduleEntries)?
            .into_iter()
            .filter(|e| day.map_or(true, |d| e.day == d))
            .collect();
    entries.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.day.cmp(&b.day)));
    Ok(entries)
}

pub fn upsert_entry(
    store: &impl RecordStore,
    cfg: &ScheduleConfig,
    entry: &ScheduleEntry,
) -> CoreResult<String> {
    if !cfg.days.iter().any(|d| *d == entry.day) {
        return Err(CoreError::validation(format!(
            "day is not part of the configured week: {}",
            entry.day
        )));
    }
    if parse_hhmm(&entry.time).is_none() {
        return Err(CoreError::validation("time must be HH:MM"));
    }
    if entry.class_id.trim().is_empty() {
        return Err(CoreError::validation("classId must not be empty"));
    }
    let key = entry.lesson_key();
    store::save(store, Collection::ScheduleEntries, &key, entry)?;
    Ok(key)
}

pub fn delete_entry(store: &impl RecordStore, lesson_key: &str) -> CoreResult<bool> {
    let key = LessonKey::parse(lesson_key)?;
    if key.is_adhoc() {
        return Err(CoreError::validation("ad-hoc slots have no schedule entry"));
    }
    Ok(store.delete(Collection::ScheduleEntries, &key.to_string())?)
}
