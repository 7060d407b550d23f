use crate::error::CoreResult;
use crate::model::{parse_hhmm, LessonKey, ScheduleEntry};
use crate::schedule::{self, ScheduleConfig};
use crate::store::RecordStore;
use chrono::{Datelike, Duration, NaiveDateTime, Weekday};
use serde::Serialize;

const ITALIAN_DAYS: [&str; 7] = [
    "Lunedì",
    "Martedì",
    "Mercoledì",
    "Giovedì",
    "Venerdì",
    "Sabato",
    "Domenica",
];

pub fn italian_day_name(weekday: Weekday) -> &'static str {
    ITALIAN_DAYS[weekday.num_days_from_monday() as usize]
}

/// The slot the user picked in the grid but has not entered yet.
#[derive(Debug, Default)]
pub struct SlotSelection {
    selected: Option<String>,
}

impl SlotSelection {
    pub fn set(&mut self, lesson_key: &str) -> CoreResult<String> {
        let key = LessonKey::parse(lesson_key)?.to_string();
        self.selected = Some(key.clone());
        Ok(key)
    }

    pub fn get(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSlot {
    pub lesson_key: String,
    pub day: String,
    pub time: String,
    pub entry: Option<ScheduleEntry>,
}

/// Resolves the configured slot whose window `[start, start + slotMinutes)`
/// contains `now`. Overlapping windows resolve to the latest start.
pub fn find_current_slot(
    store: &impl RecordStore,
    cfg: &ScheduleConfig,
    now: NaiveDateTime,
) -> CoreResult<Option<CurrentSlot>> {
    let day = italian_day_name(now.weekday());
    if !cfg.days.iter().any(|d| d == day) {
        return Ok(None);
    }
    let clock = now.time();
    let window = Duration::minutes(i64::from(cfg.slot_minutes));
    let mut starts: Vec<&String> = cfg.time_slots.iter().collect();
    starts.sort();

    let mut hit: Option<&String> = None;
    for slot in starts {
        let Some(start) = parse_hhmm(slot) else {
            continue;
        };
        let (end, wrapped) = start.overflowing_add_signed(window);
        let inside = if wrapped != 0 {
            clock >= start
        } else {
            clock >= start && clock < end
        };
        if inside {
            hit = Some(slot);
        }
    }
    let Some(time) = hit else {
        return Ok(None);
    };

    let scheduled = LessonKey::Scheduled {
        day: day.to_string(),
        time: time.clone(),
    };
    let entry = schedule::find_entry(store, &scheduled)?;
    let lesson_key = if entry.is_some() {
        scheduled.to_string()
    } else {
        LessonKey::AdHoc {
            day: day.to_string(),
            time: time.clone(),
        }
        .to_string()
    };
    Ok(Some(CurrentSlot {
        lesson_key,
        day: day.to_string(),
        time: time.clone(),
        entry,
    }))
}
