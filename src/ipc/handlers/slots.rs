use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{opt_str, required_str, workspace_store};
use crate::ipc::types::{AppState, Request};
use crate::schedule;
use crate::slots::find_current_slot;
use chrono::{Local, NaiveDateTime};
use serde_json::json;

fn parse_local_now(raw: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn handle_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match required_str(req, "lessonKey") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.slots.set(&key) {
        Ok(selected) => ok(&req.id, json!({ "selectedSlot": selected })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_selected(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "selectedSlot": state.slots.get() }))
}

fn handle_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.slots.clear();
    ok(&req.id, json!({ "selectedSlot": null }))
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState { store, slots, .. } = state;
    let store = match workspace_store(store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let now = match opt_str(req, "now") {
        Ok(Some(raw)) => match parse_local_now(&raw) {
            Some(v) => v,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "now must be a local datetime like 2026-10-19T09:30",
                    None,
                )
            }
        },
        Ok(None) => Local::now().naive_local(),
        Err(e) => return e,
    };
    let cfg = match schedule::load_config(store) {
        Ok(c) => c,
        Err(e) => return core_err(&req.id, &e),
    };
    let auto_select = match req.params.get("autoSelect") {
        None | Some(serde_json::Value::Null) => cfg.auto_select_default,
        Some(v) => match v.as_bool() {
            Some(b) => b,
            None => return err(&req.id, "bad_params", "autoSelect must be boolean", None),
        },
    };

    let slot = match find_current_slot(store, &cfg, now) {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e),
    };
    if let (Some(found), true) = (slot.as_ref(), auto_select) {
        if let Err(e) = slots.set(&found.lesson_key) {
            return core_err(&req.id, &e);
        }
    }
    ok(
        &req.id,
        json!({
            "slot": slot,
            "selectedSlot": slots.get(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "slots.select" => Some(handle_select(state, req)),
        "slots.selected" => Some(handle_selected(state, req)),
        "slots.clear" => Some(handle_clear(state, req)),
        "slots.current" => Some(handle_current(state, req)),
        _ => None,
    }
}
