use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{opt_str, required_param, required_str, to_json, workspace_store};
use crate::ipc::types::{AppState, Request};
use crate::model::ScheduleEntry;
use crate::schedule;
use serde_json::json;

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match schedule::load_config(store) {
        Ok(cfg) => ok(&req.id, to_json(&cfg)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    match schedule::update_config(store, patch) {
        Ok(cfg) => ok(&req.id, to_json(&cfg)),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_entries_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let day = match opt_str(req, "day") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entries = match schedule::list_entries(store, day.as_deref()) {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e),
    };
    let rows: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            let mut row = to_json(e);
            row["lessonKey"] = json!(e.lesson_key());
            row
        })
        .collect();
    ok(&req.id, json!({ "entries": rows }))
}

fn handle_entries_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let entry: ScheduleEntry = match required_param(req, "entry") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cfg = match schedule::load_config(store) {
        Ok(c) => c,
        Err(e) => return core_err(&req.id, &e),
    };
    match schedule::upsert_entry(store, &cfg, &entry) {
        Ok(key) => ok(&req.id, json!({ "lessonKey": key })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_entries_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let key = match required_str(req, "lessonKey") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match schedule::delete_entry(store, &key) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.config.get" => Some(handle_config_get(state, req)),
        "schedule.config.update" => Some(handle_config_update(state, req)),
        "schedule.entries.list" => Some(handle_entries_list(state, req)),
        "schedule.entries.upsert" => Some(handle_entries_upsert(state, req)),
        "schedule.entries.delete" => Some(handle_entries_delete(state, req)),
        _ => None,
    }
}
