use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{to_json, workspace_store};
use crate::ipc::types::{AppState, Request};
use crate::ledger::EvaluationLedger;
use crate::model::EvaluationInput;
use serde_json::json;

fn param_str<'r>(req: &'r Request, key: &str) -> &'r str {
    req.params.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match workspace_store(&state.store, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("evaluation") else {
        return err(&req.id, "bad_params", "missing evaluation", None);
    };
    let evaluation = match EvaluationInput::from_json(raw) {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e),
    };
    // Empty ids are rejected by the ledger itself.
    let lesson_instance_id = param_str(req, "lessonInstanceId");
    let student_id = param_str(req, "studentId");

    match EvaluationLedger::new(store, &state.events).add_evaluation(
        lesson_instance_id,
        student_id,
        &evaluation,
    ) {
        Ok(instance) => ok(&req.id, json!({ "instance": to_json(&instance) })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "evaluations.add" => Some(handle_add(state, req)),
        _ => None,
    }
}
