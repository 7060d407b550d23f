mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, spawn_sidecar, temp_dir, upsert_entry};

#[test]
fn current_slot_resolves_scheduled_and_adhoc_keys() {
    let workspace = temp_dir("docente-slots-current");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    upsert_entry(&mut stdin, &mut reader, "Lunedì", "09:00", "3A");

    // 2026-10-19 is a Monday.
    let hit = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "slots.current",
        json!({ "now": "2026-10-19T09:30" }),
    );
    assert_eq!(hit["slot"]["lessonKey"], "Lunedì-09:00");
    assert_eq!(hit["slot"]["entry"]["classId"], "3A");
    assert_eq!(hit["selectedSlot"], "Lunedì-09:00");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "lessons.createFromSchedule",
        json!({}),
    );
    assert_eq!(created["instance"]["lessonKey"], "Lunedì-09:00");
    let selected = request_ok(&mut stdin, &mut reader, "3", "slots.selected", json!({}));
    assert!(selected["selectedSlot"].is_null());

    let adhoc = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "slots.current",
        json!({ "now": "2026-10-19 10:15", "autoSelect": false }),
    );
    assert_eq!(adhoc["slot"]["lessonKey"], "ADHOC-Lunedì-10:00");
    assert!(adhoc["slot"]["entry"].is_null());
    assert!(adhoc["selectedSlot"].is_null());

    let last = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "slots.current",
        json!({ "now": "2026-10-19T13:59:59", "autoSelect": false }),
    );
    assert_eq!(last["slot"]["lessonKey"], "ADHOC-Lunedì-13:00");

    for (i, now) in ["2026-10-18T09:00", "2026-10-19T07:30", "2026-10-19T14:00"]
        .iter()
        .enumerate()
    {
        let miss = request_ok(
            &mut stdin,
            &mut reader,
            &format!("miss-{}", i),
            "slots.current",
            json!({ "now": now }),
        );
        assert!(miss["slot"].is_null(), "expected no slot at {}", now);
    }

    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "slots.current",
        json!({ "now": "ieri" }),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn slot_window_follows_schedule_config() {
    let workspace = temp_dir("docente-slots-config");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let cfg = request_ok(&mut stdin, &mut reader, "1", "schedule.config.get", json!({}));
    assert_eq!(cfg["slotMinutes"], 60);
    assert_eq!(cfg["days"].as_array().map(|d| d.len()), Some(6));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.config.update",
        json!({ "patch": { "slotMinutes": 45, "autoSelectDefault": false } }),
    );
    assert_eq!(updated["slotMinutes"], 45);
    assert_eq!(updated["autoSelectDefault"], false);

    let gap = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "slots.current",
        json!({ "now": "2026-10-19T09:50" }),
    );
    assert!(gap["slot"].is_null());

    let inside = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "slots.current",
        json!({ "now": "2026-10-19T09:44" }),
    );
    assert_eq!(inside["slot"]["lessonKey"], "ADHOC-Lunedì-09:00");
    assert!(inside["selectedSlot"].is_null());

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.config.update",
        json!({ "patch": { "lunchBreak": true } }),
    );
    assert_eq!(code, "bad_params");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn manual_selection_is_normalized_and_cleared() {
    let workspace = temp_dir("docente-slots-select");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "slots.select",
        json!({ "lessonKey": " Martedì-11:00 " }),
    );
    assert_eq!(res["selectedSlot"], "Martedì-11:00");
    let res = request_ok(&mut stdin, &mut reader, "2", "slots.selected", json!({}));
    assert_eq!(res["selectedSlot"], "Martedì-11:00");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "slots.select",
        json!({ "lessonKey": "Martedì-25:99" }),
    );
    assert_eq!(code, "bad_params");

    let _ = request_ok(&mut stdin, &mut reader, "4", "slots.clear", json!({}));
    let res = request_ok(&mut stdin, &mut reader, "5", "slots.selected", json!({}));
    assert!(res["selectedSlot"].is_null());

    let _ = std::fs::remove_dir_all(workspace);
}
