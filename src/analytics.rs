use crate::error::CoreResult;
use crate::lessons::load_instance;
use crate::model::{AnalyticsSnapshot, BehaviorTrend, EvaluationRecord, LessonInstance};
use crate::store::RecordStore;
use std::collections::BTreeMap;

pub const POSITIVE_MARKERS: &[&str] = &["😊", "👍"];
pub const NEGATIVE_MARKERS: &[&str] = &["😟", "👎"];

fn matches_any(marker: &str, glyphs: &[&str]) -> bool {
    glyphs.iter().any(|g| marker.contains(g))
}

pub fn behavior_trend<'m, I>(markers: I) -> BehaviorTrend
where
    I: IntoIterator<Item = &'m str>,
{
    let mut positive = 0usize;
    let mut negative = 0usize;
    for m in markers {
        if matches_any(m, POSITIVE_MARKERS) {
            positive += 1;
        } else if matches_any(m, NEGATIVE_MARKERS) {
            negative += 1;
        }
    }
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => BehaviorTrend::Up,
        std::cmp::Ordering::Less => BehaviorTrend::Down,
        std::cmp::Ordering::Equal => BehaviorTrend::Stable,
    }
}

pub fn summarize_student(record: &EvaluationRecord) -> AnalyticsSnapshot {
    let (sum, count) = record
        .grades
        .iter()
        .filter(|g| g.is_valid())
        .fold((0.0f64, 0usize), |(s, c), g| (s + g.value, c + 1));

    AnalyticsSnapshot {
        avg_grade: if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        },
        behavior_trend: behavior_trend(record.behavior.iter().map(|b| b.emoji.as_str())),
        last_updated: record.last_updated.clone(),
        grades_count: count,
        behavior_count: record.behavior.len(),
    }
}

/// Recomputed from the stored entries on every call.
pub fn summarize_instance(instance: &LessonInstance) -> BTreeMap<String, AnalyticsSnapshot> {
    instance
        .evaluations
        .iter()
        .map(|(student_id, record)| (student_id.clone(), summarize_student(record)))
        .collect()
}

pub fn compute_analytics(
    store: &impl RecordStore,
    lesson_instance_id: &str,
) -> CoreResult<BTreeMap<String, AnalyticsSnapshot>> {
    let instance = load_instance(store, lesson_instance_id)?;
    Ok(summarize_instance(&instance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::events::EventBus;
    use crate::ledger::EvaluationLedger;
    use crate::lessons::{LessonInstanceManager, LessonOverrides};
    use crate::model::EvaluationInput;
    use crate::store::MemoryRecordStore;
    use serde_json::{json, Value};

    fn grade(v: Value) -> EvaluationInput {
        EvaluationInput::Grade {
            value: v,
            activity_type: None,
            evaluator_id: None,
        }
    }

    fn behavior(m: &str) -> EvaluationInput {
        EvaluationInput::Behavior {
            value: json!(m),
            evaluator_id: None,
        }
    }

    #[test]
    fn average_skips_non_numeric_grades() {
        let store = MemoryRecordStore::new();
        store.init().expect("init");
        let bus = EventBus::new();
        let lesson = LessonInstanceManager::new(&store, &bus)
            .create_from_schedule("ADHOC-Lunedì-08:00", &LessonOverrides::default())
            .expect("create");
        let ledger = EvaluationLedger::new(&store, &bus);
        for v in [json!(8), json!("abc"), json!(6)] {
            ledger.add_evaluation(&lesson.id, "s1", &grade(v)).expect("grade");
        }
        ledger
            .add_evaluation(&lesson.id, "s2", &behavior("😊"))
            .expect("behavior");

        let out = compute_analytics(&store, &lesson.id).expect("analytics");
        let s1 = &out["s1"];
        assert_eq!(s1.avg_grade, Some(7.0));
        assert_eq!(s1.grades_count, 2);
        assert_eq!(s1.behavior_trend, BehaviorTrend::Stable);
        assert_eq!(s1.behavior_count, 0);

        let s2 = &out["s2"];
        assert_eq!(s2.avg_grade, None);
        assert_eq!(s2.grades_count, 0);
        assert_eq!(s2.behavior_trend, BehaviorTrend::Up);
        assert!(s2.last_updated.is_some());
    }

    #[test]
    fn trend_counts_only_recognised_markers() {
        assert_eq!(behavior_trend(["😊", "😟"]), BehaviorTrend::Stable);
        assert_eq!(behavior_trend(["😊", "😊", "😟"]), BehaviorTrend::Up);
        assert_eq!(behavior_trend(["😟", "🤔", "🤔"]), BehaviorTrend::Down);
        assert_eq!(behavior_trend(Vec::<&str>::new()), BehaviorTrend::Stable);
    }

    #[test]
    fn behavior_count_includes_unrecognised_markers() {
        let mut rec = EvaluationRecord::default();
        for m in ["🤔", "😊", "⭐"] {
            rec.behavior.push(crate::model::BehaviorEntry {
                emoji: m.into(),
                timestamp: "2026-01-01T00:00:00.000Z".into(),
                evaluator_id: None,
            });
        }
        let snap = summarize_student(&rec);
        assert_eq!(snap.behavior_count, 3);
        assert_eq!(snap.behavior_trend, BehaviorTrend::Up);
        assert_eq!(snap.avg_grade, None);
        assert_eq!(snap.last_updated, None);
    }

    #[test]
    fn missing_instance_is_not_found() {
        let store = MemoryRecordStore::new();
        store.init().expect("init");
        assert!(matches!(
            compute_analytics(&store, "nope"),
            Err(CoreError::NotFound { .. })
        ));
    }
}
