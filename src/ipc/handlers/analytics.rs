use crate::analytics::compute_analytics;
use crate::ipc::error::{core_err, ok};
use crate::ipc::helpers::{to_json, workspace_store};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_compute(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let lesson_instance_id = req
        .params
        .get("lessonInstanceId")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    match compute_analytics(store, lesson_instance_id) {
        Ok(students) => ok(
            &req.id,
            json!({
                "lessonInstanceId": lesson_instance_id,
                "students": to_json(&students),
            }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.compute" => Some(handle_compute(state, req)),
        _ => None,
    }
}
