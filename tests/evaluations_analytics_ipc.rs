mod test_support;

use serde_json::{json, Value};
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{
    create_lesson, exchange, id_of, request_err, request_ok, select_workspace, spawn_sidecar,
    temp_dir, upsert_entry,
};

fn add(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    lesson: &str,
    student: &str,
    evaluation: Value,
) -> Value {
    request_ok(
        stdin,
        reader,
        "eval",
        "evaluations.add",
        json!({ "lessonInstanceId": lesson, "studentId": student, "evaluation": evaluation }),
    )
}

fn analytics(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, lesson: &str) -> Value {
    request_ok(
        stdin,
        reader,
        "analytics",
        "analytics.compute",
        json!({ "lessonInstanceId": lesson }),
    )
}

#[test]
fn non_numeric_grades_are_kept_but_not_averaged() {
    let workspace = temp_dir("docente-eval-grades");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let key = upsert_entry(&mut stdin, &mut reader, "Lunedì", "08:00", "3A");
    let id = id_of(&create_lesson(&mut stdin, &mut reader, &key));

    add(&mut stdin, &mut reader, &id, "s1", json!({ "type": "grade", "value": 8 }));
    add(&mut stdin, &mut reader, &id, "s1", json!({ "type": "grade", "value": "abc" }));
    let res = add(
        &mut stdin,
        &mut reader,
        &id,
        "s1",
        json!({ "type": "grade", "value": "6", "activityType": "orale" }),
    );
    let grades = res["instance"]["evaluations"]["s1"]["grades"]
        .as_array()
        .cloned()
        .expect("grades");
    assert_eq!(grades.len(), 3);
    assert!(grades[1]["value"].is_null());
    assert_eq!(grades[2]["value"].as_f64(), Some(6.0));
    assert_eq!(grades[2]["activityType"], "orale");

    let stats = analytics(&mut stdin, &mut reader, &id);
    assert_eq!(stats["lessonInstanceId"], id.as_str());
    let s1 = &stats["students"]["s1"];
    assert_eq!(s1["avgGrade"].as_f64(), Some(7.0));
    assert_eq!(s1["gradesCount"], 2);
    assert_eq!(s1["behaviorCount"], 0);
    assert_eq!(s1["behaviorTrend"], "stable");
    assert!(s1["lastUpdated"].is_string());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn behavior_trend_follows_marker_balance() {
    let workspace = temp_dir("docente-eval-behavior");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let id = id_of(&create_lesson(&mut stdin, &mut reader, "ADHOC-Martedì-10:00"));

    for marker in ["😊", "👍", "😟"] {
        add(&mut stdin, &mut reader, &id, "up", json!({ "type": "behavior", "value": marker }));
    }
    for marker in ["👎", "😐"] {
        add(&mut stdin, &mut reader, &id, "down", json!({ "type": "behavior", "value": marker }));
    }
    add(&mut stdin, &mut reader, &id, "flat", json!({ "type": "behavior", "value": "😐" }));
    add(
        &mut stdin,
        &mut reader,
        &id,
        "quiet",
        json!({ "type": "note", "note": "assente giustificato" }),
    );

    let stats = analytics(&mut stdin, &mut reader, &id);
    let students = &stats["students"];
    assert_eq!(students["up"]["behaviorTrend"], "up");
    assert_eq!(students["up"]["behaviorCount"], 3);
    assert_eq!(students["down"]["behaviorTrend"], "down");
    assert_eq!(students["down"]["behaviorCount"], 2);
    assert_eq!(students["flat"]["behaviorTrend"], "stable");
    assert!(students["quiet"]["avgGrade"].is_null());
    assert_eq!(students["quiet"]["gradesCount"], 0);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn each_evaluation_publishes_an_update_event() {
    let workspace = temp_dir("docente-eval-events");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let id = id_of(&create_lesson(&mut stdin, &mut reader, "ADHOC-Sabato-12:00"));

    let ex = exchange(
        &mut stdin,
        &mut reader,
        "1",
        "evaluations.add",
        json!({
            "lessonInstanceId": id,
            "studentId": "s9",
            "evaluation": { "type": "note", "value": "Ottimo intervento" }
        }),
    );
    assert_eq!(ex.event_names(), vec!["evaluationUpdated"]);
    let detail = &ex.events[0]["detail"];
    assert_eq!(detail["lessonInstanceId"], id.as_str());
    assert_eq!(detail["studentId"], "s9");
    assert_eq!(detail["evaluation"]["type"], "note");
    assert_eq!(
        ex.response["result"]["instance"]["evaluations"]["s9"]["observations"][0]["text"],
        "Ottimo intervento"
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn closed_lessons_still_accept_late_grades() {
    let workspace = temp_dir("docente-eval-late");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let id = id_of(&create_lesson(&mut stdin, &mut reader, "ADHOC-Lunedì-13:00"));
    let _ = request_ok(&mut stdin, &mut reader, "1", "lessons.close", json!({ "id": id }));

    let res = add(&mut stdin, &mut reader, &id, "s1", json!({ "type": "grade", "value": 9.5 }));
    assert_eq!(res["instance"]["status"], "closed");
    let stats = analytics(&mut stdin, &mut reader, &id);
    assert_eq!(stats["students"]["s1"]["avgGrade"].as_f64(), Some(9.5));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invalid_evaluations_are_rejected() {
    let workspace = temp_dir("docente-eval-invalid");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let id = id_of(&create_lesson(&mut stdin, &mut reader, "ADHOC-Giovedì-08:00"));

    let cases = [
        (json!({ "lessonInstanceId": id, "studentId": "", "evaluation": { "type": "grade", "value": 7 } }), "bad_params"),
        (json!({ "lessonInstanceId": "", "studentId": "s1", "evaluation": { "type": "grade", "value": 7 } }), "bad_params"),
        (json!({ "lessonInstanceId": id, "studentId": "s1", "evaluation": { "type": "emoji", "value": 7 } }), "bad_params"),
        (json!({ "lessonInstanceId": id, "studentId": "s1" }), "bad_params"),
        (json!({ "lessonInstanceId": "missing", "studentId": "s1", "evaluation": { "type": "grade", "value": 7 } }), "not_found"),
    ];
    for (i, (params, expected)) in cases.into_iter().enumerate() {
        let code = request_err(&mut stdin, &mut reader, &i.to_string(), "evaluations.add", params);
        assert_eq!(code, expected, "case {}", i);
    }

    let code = request_err(
        &mut stdin,
        &mut reader,
        "a",
        "analytics.compute",
        json!({ "lessonInstanceId": "missing" }),
    );
    assert_eq!(code, "not_found");

    let stats = analytics(&mut stdin, &mut reader, &id);
    assert_eq!(stats["students"], json!({}));

    let _ = std::fs::remove_dir_all(workspace);
}
