use crate::error::{CoreError, CoreResult};
use chrono::{NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const ADHOC_PREFIX: &str = "ADHOC-";
/// Class id recorded on instances opened from an empty slot without a class override.
pub const ADHOC_CLASS_PLACEHOLDER: &str = "ADHOC";

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts only zero-padded `HH:MM`.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub day: String,
    pub time: String,
    pub class_id: String,
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
}

impl ScheduleEntry {
    pub fn lesson_key(&self) -> String {
        LessonKey::Scheduled {
            day: self.day.clone(),
            time: self.time.clone(),
        }
        .to_string()
    }
}

/// `{day}-{time}` for a configured slot, `ADHOC-{day}-{time}` for an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonKey {
    Scheduled { day: String, time: String },
    AdHoc { day: String, time: String },
}

impl LessonKey {
    pub fn parse(raw: &str) -> CoreResult<LessonKey> {
        let raw = raw.trim();
        let (adhoc, rest) = match raw.strip_prefix(ADHOC_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let Some((day, time)) = rest.rsplit_once('-') else {
            return Err(CoreError::validation(format!(
                "lesson key must look like DAY-HH:MM: {}",
                raw
            )));
        };
        if day.trim().is_empty() {
            return Err(CoreError::validation("lesson key is missing the day"));
        }
        if parse_hhmm(time).is_none() {
            return Err(CoreError::validation(format!(
                "lesson key time must be HH:MM: {}",
                time
            )));
        }
        let day = day.to_string();
        let time = time.to_string();
        Ok(if adhoc {
            LessonKey::AdHoc { day, time }
        } else {
            LessonKey::Scheduled { day, time }
        })
    }

    pub fn day(&self) -> &str {
        match self {
            LessonKey::Scheduled { day, .. } | LessonKey::AdHoc { day, .. } => day,
        }
    }

    pub fn time(&self) -> &str {
        match self {
            LessonKey::Scheduled { time, .. } | LessonKey::AdHoc { time, .. } => time,
        }
    }

    pub fn is_adhoc(&self) -> bool {
        matches!(self, LessonKey::AdHoc { .. })
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonKey::Scheduled { day, time } => write!(f, "{}-{}", day, time),
            LessonKey::AdHoc { day, time } => write!(f, "{}{}-{}", ADHOC_PREFIX, day, time),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Open,
    Closed,
}

impl LessonStatus {
    pub fn parse(raw: &str) -> Option<LessonStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Some(LessonStatus::Open),
            "closed" => Some(LessonStatus::Closed),
            _ => None,
        }
    }
}

/// Descriptive fields copied from the schedule entry when the lesson starts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSnapshot {
    pub class_id: String,
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
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub timestamp: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    /// NaN when the submitted value was not numeric; persisted as `null`.
    #[serde(with = "nan_as_null")]
    pub value: f64,
    #[serde(default)]
    pub activity_type: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub evaluator_id: Option<String>,
}

impl GradeEntry {
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEntry {
    pub emoji: String,
    pub timestamp: String,
    #[serde(default)]
    pub evaluator_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationEntry {
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub evaluator_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    #[serde(default)]
    pub grades: Vec<GradeEntry>,
    #[serde(default)]
    pub behavior: Vec<BehaviorEntry>,
    #[serde(default)]
    pub observations: Vec<ObservationEntry>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonInstance {
    pub id: String,
    pub lesson_key: String,
    pub snapshot: LessonSnapshot,
    #[serde(default)]
    pub note: Option<String>,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    pub status: LessonStatus,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub recordings: Vec<Recording>,
    #[serde(default)]
    pub evaluations: BTreeMap<String, EvaluationRecord>,
    pub updated_at: String,
}

impl LessonInstance {
    pub fn is_open(&self) -> bool {
        self.status == LessonStatus::Open
    }
}

/// Caller-supplied evaluation payload, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvaluationInput {
    #[serde(rename_all = "camelCase")]
    Grade {
        #[serde(default)]
        value: serde_json::Value,
        #[serde(default)]
        activity_type: Option<String>,
        #[serde(default)]
        evaluator_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Behavior {
        #[serde(default)]
        value: serde_json::Value,
        #[serde(default)]
        evaluator_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Note {
        #[serde(default)]
        value: serde_json::Value,
        #[serde(default)]
        note: serde_json::Value,
        #[serde(default)]
        evaluator_id: Option<String>,
    },
}

impl EvaluationInput {
    pub fn from_json(raw: &serde_json::Value) -> CoreResult<EvaluationInput> {
        if !raw.is_object() {
            return Err(CoreError::validation("evaluation must be an object"));
        }
        let kind = raw.get("type").and_then(|v| v.as_str()).unwrap_or("");
        match kind {
            "grade" | "behavior" | "note" => serde_json::from_value(raw.clone())
                .map_err(|e| CoreError::validation(format!("invalid {} evaluation: {}", kind, e))),
            _ => Err(CoreError::validation(format!(
                "unknown evaluation type: {}",
                kind
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationInput::Grade { .. } => "grade",
            EvaluationInput::Behavior { .. } => "behavior",
            EvaluationInput::Note { .. } => "note",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorTrend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub avg_grade: Option<f64>,
    pub behavior_trend: BehaviorTrend,
    pub last_updated: Option<String>,
    pub grades_count: usize,
    pub behavior_count: usize,
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}
