use crate::events::LessonEvent;
use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{opt_param, opt_str, required_param, required_str, to_json, workspace_store};
use crate::ipc::types::{AppState, Request};
use crate::lessons::{ActivityInput, LessonFilter, LessonInstanceManager, LessonOverrides, RecordingInput};
use crate::model::LessonStatus;
use serde_json::json;
use tracing::warn;

fn handle_create_from_schedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        store,
        events,
        slots,
        session,
        ..
    } = state;
    let store = match workspace_store(store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let lesson_key = match opt_str(req, "lessonKey") {
        Ok(Some(k)) => k,
        Ok(None) => match slots.get() {
            Some(k) => k.to_string(),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "missing lessonKey and no slot selected",
                    None,
                )
            }
        },
        Err(e) => return e,
    };
    let overrides: LessonOverrides = match opt_param(req, "overrides") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };

    let instance = match LessonInstanceManager::new(store, events).create_from_schedule(&lesson_key, &overrides) {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e),
    };
    slots.clear();
    let mut result = json!({ "instance": to_json(&instance) });
    // The instance is already stored and announced; report a lost pointer
    // without failing the request.
    if let Err(e) = session.set_current(store, &instance.id) {
        warn!(id = %instance.id, error = %e, "could not persist current lesson");
        result["warning"] = json!({
            "code": "session_not_persisted",
            "message": e.to_string(),
        });
    }
    ok(&req.id, result)
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match LessonInstanceManager::new(store, &state.events).get(&id) {
        Ok(found) => ok(&req.id, json!({ "instance": found.map(|i| to_json(&i)) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let class_id = match opt_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status = match opt_str(req, "status") {
        Ok(Some(raw)) => match LessonStatus::parse(&raw) {
            Some(s) => Some(s),
            None => return err(&req.id, "bad_params", "status must be open or closed", None),
        },
        Ok(None) => None,
        Err(e) => return e,
    };
    let filter = LessonFilter { class_id, status };
    match LessonInstanceManager::new(store, &state.events).list(&filter) {
        Ok(instances) => ok(&req.id, json!({ "instances": to_json(&instances) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(id) = state.session.current() else {
        return ok(&req.id, json!({ "instance": null }));
    };
    match LessonInstanceManager::new(store, &state.events).get(id) {
        Ok(found) => ok(&req.id, json!({ "instance": found.map(|i| to_json(&i)) })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        store,
        events,
        session,
        ..
    } = state;
    let store = match workspace_store(store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let instance = match LessonInstanceManager::new(store, events).close(&id) {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e),
    };
    let mut result = json!({ "instance": to_json(&instance) });
    if let Err(e) = session.release(store, &instance.id) {
        warn!(id = %instance.id, error = %e, "could not clear persisted current lesson");
        result["warning"] = json!({
            "code": "session_not_persisted",
            "message": e.to_string(),
        });
    }
    ok(&req.id, result)
}

fn handle_add_activity(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let activity: ActivityInput = match required_param(req, "activity") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match LessonInstanceManager::new(store, &state.events).add_activity(&id, &activity) {
        Ok(instance) => ok(&req.id, json!({ "instance": to_json(&instance) })),
        Err(e) => core_err(&req.id, &e),
    }
}

/// Called by the recorder tooling once a file is saved; also tells the UI to refresh.
fn handle_add_recording(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let recording: RecordingInput = match required_param(req, "recording") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let instance = match LessonInstanceManager::new(store, &state.events).add_recording(&id, &recording) {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e),
    };
    if let Some(saved) = instance.recordings.last() {
        state.events.publish(&LessonEvent::RecordingSaved {
            lesson_instance_id: instance.id.clone(),
            recording: saved.clone(),
        });
    }
    ok(&req.id, json!({ "instance": to_json(&instance) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lessons.createFromSchedule" => Some(handle_create_from_schedule(state, req)),
        "lessons.get" => Some(handle_get(state, req)),
        "lessons.list" => Some(handle_list(state, req)),
        "lessons.current" => Some(handle_current(state, req)),
        "lessons.close" => Some(handle_close(state, req)),
        "lessons.addActivity" => Some(handle_add_activity(state, req)),
        "lessons.addRecording" => Some(handle_add_recording(state, req)),
        _ => None,
    }
}
