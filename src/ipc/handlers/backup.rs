use crate::backup;
use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{required_str, to_json, workspace_store};
use crate::ipc::types::{AppState, Request};
use crate::session::SessionContext;
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;

fn handle_export_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match backup::export_bundle(store, &PathBuf::from(&out_path)) {
        Ok(summary) => {
            let mut result = to_json(&summary);
            result["path"] = json!(out_path);
            ok(&req.id, result)
        }
        Err(e) => err(
            &req.id,
            "backup_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path })),
        ),
    }
}

fn handle_import_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        store,
        slots,
        session,
        ..
    } = state;
    let store = match workspace_store(store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let in_path = match required_str(req, "inPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "backup file not found",
            Some(json!({ "kind": "backup", "id": in_path })),
        );
    }

    let summary = match backup::import_bundle(store, &src) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "workspace import failed");
            return err(
                &req.id,
                "backup_failed",
                format!("{e:#}"),
                Some(json!({ "path": in_path })),
            );
        }
    };

    // The restored records decide which lesson (if any) is current.
    slots.clear();
    *session = match SessionContext::resume(store) {
        Ok(s) => s,
        Err(e) => return core_err(&req.id, &e),
    };
    let mut result = to_json(&summary);
    result["currentLessonInstanceId"] = json!(session.current());
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspace" => Some(handle_export_workspace(state, req)),
        "backup.importWorkspace" => Some(handle_import_workspace(state, req)),
        _ => None,
    }
}
