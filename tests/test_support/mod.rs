#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_docented");
    let mut child = Command::new(exe)
        .env_remove("DOCENTED_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn docented");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

/// Response line plus every event line the sidecar wrote ahead of it.
pub struct Exchange {
    pub response: Value,
    pub events: Vec<Value>,
}

impl Exchange {
    pub fn event_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| e.get("event").and_then(|v| v.as_str()))
            .collect()
    }
}

pub fn exchange(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Exchange {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut events = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
        if value.get("event").is_some() {
            events.push(value);
            continue;
        }
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        return Exchange {
            response: value,
            events,
        };
    }
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
    exchange(stdin, reader, id, method, params).response
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "expected ok response for {}: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns the error code of a failed response.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "expected error response for {}: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn select_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &Path,
) -> Value {
    request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    )
}

pub fn upsert_entry(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    day: &str,
    time: &str,
    class_id: &str,
) -> String {
    let res = request_ok(
        stdin,
        reader,
        "upsert",
        "schedule.entries.upsert",
        json!({
            "entry": {
                "day": day,
                "time": time,
                "classId": class_id,
                "className": format!("Classe {}", class_id),
                "subjectCode": "MAT",
                "subjectLabel": "Matematica",
                "activityType": "lezione",
                "room": "Aula 12"
            }
        }),
    );
    res.get("lessonKey")
        .and_then(|v| v.as_str())
        .expect("lessonKey")
        .to_string()
}

pub fn create_lesson(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    lesson_key: &str,
) -> Value {
    let res = request_ok(
        stdin,
        reader,
        "create",
        "lessons.createFromSchedule",
        json!({ "lessonKey": lesson_key }),
    );
    res.get("instance").cloned().expect("instance")
}

pub fn id_of(instance: &Value) -> String {
    instance
        .get("id")
        .and_then(|v| v.as_str())
        .expect("instance id")
        .to_string()
}
