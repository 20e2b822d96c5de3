//! The closed command surface (§4.8): one params struct and dispatch arm
//! per method, each returning either a JSON result or a typed `Error`.

use serde::Deserialize;
use serde_json::Value;

use crate::agent::RunMode;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::server::Server;

#[derive(Debug, Deserialize)]
struct AgentRunParams {
    prompt: String,
    mode: RunMode,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentRespondParams {
    tool_use_id: String,
    response: String,
    #[serde(default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct FileGetParams {
    path: String,
}

#[derive(Debug, Deserialize)]
struct SessionWatchParams {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionFocusParams {
    workspace_id: String,
    session_id: String,
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: Option<Value>) -> Result<T> {
    let params = params.ok_or_else(|| Error::InvalidPayload("missing params".to_string()))?;
    serde_json::from_value(params).map_err(|err| Error::InvalidPayload(err.to_string()))
}

pub fn dispatch(server: &Server, conn: &ConnectionState, method: &str, params: Option<Value>) -> Result<Value> {
    match method {
        "agent/run" => agent_run(server, conn, parse_params(params)?),
        "agent/stop" => agent_stop(server, conn),
        "agent/respond" => agent_respond(server, parse_params(params)?),
        "status/get" => status_get(server, conn),
        "file/get" => file_get(server, parse_params(params)?),
        "session/watch" => session_watch(server, conn, parse_params(params)?),
        "session/unwatch" => session_unwatch(server, conn),
        "session/focus" => session_focus(server, conn, parse_params(params)?),
        "session/focus/clear" => session_focus_clear(server, conn),
        other => Err(Error::InvalidCommand(other.to_string())),
    }
}

fn agent_run(server: &Server, conn: &ConnectionState, params: AgentRunParams) -> Result<Value> {
    let mut running = conn.running_session.lock().unwrap();
    if params.mode == RunMode::New && running.is_some() {
        return Err(Error::AgentAlreadyRunning);
    }
    let session_id = server.agent_runner.run(&params.prompt, params.mode, params.session_id.as_deref())?;
    *running = Some(session_id.clone());
    Ok(serde_json::json!({ "session_id": session_id }))
}

fn agent_stop(server: &Server, conn: &ConnectionState) -> Result<Value> {
    let mut running = conn.running_session.lock().unwrap();
    let Some(session_id) = running.take() else {
        return Err(Error::AgentNotRunning);
    };
    server.agent_runner.stop(&session_id)?;
    Ok(serde_json::json!({}))
}

fn agent_respond(server: &Server, params: AgentRespondParams) -> Result<Value> {
    server.agent_runner.respond(&params.tool_use_id, &params.response, params.is_error)?;
    Ok(serde_json::json!({}))
}

fn status_get(server: &Server, conn: &ConnectionState) -> Result<Value> {
    let running_session = conn.running_session.lock().unwrap().clone();
    let payload = sessionrelay_types::ClaudeStatusPayload {
        running: running_session.is_some(),
        session_id: running_session,
        repo_status: Some(crate::status::resolve_repo_status(&server.workspace_root)),
    };
    serde_json::to_value(&payload).map_err(|err| Error::Internal(err.to_string()))
}

fn file_get(server: &Server, params: FileGetParams) -> Result<Value> {
    let contents = server.file_fetcher.fetch(&params.path)?;
    serde_json::to_value(&contents).map_err(|err| Error::Internal(err.to_string()))
}

fn session_watch(server: &Server, conn: &ConnectionState, params: SessionWatchParams) -> Result<Value> {
    let entry = server
        .index
        .find_session_by_id(&params.session_id)?
        .ok_or_else(|| Error::InvalidPayload(format!("unknown session id: {}", params.session_id)))?;

    let mut watched = conn.watched_session.lock().unwrap();
    if let Some(previous) = watched.as_ref() {
        if previous != &entry.session_id {
            server.watches.unwatch(&conn.client_id, previous);
        }
    }
    server.watches.watch(
        &conn.client_id,
        &entry.session_id,
        std::path::PathBuf::from(&entry.full_path),
        entry.model_provider.clone(),
    )?;
    *watched = Some(entry.session_id.clone());
    Ok(serde_json::json!({}))
}

fn session_unwatch(server: &Server, conn: &ConnectionState) -> Result<Value> {
    if let Some(session_id) = conn.watched_session.lock().unwrap().take() {
        server.watches.unwatch(&conn.client_id, &session_id);
    }
    Ok(serde_json::json!({}))
}

fn session_focus(server: &Server, conn: &ConnectionState, params: SessionFocusParams) -> Result<Value> {
    server.registry.set_focus(&conn.client_id, &params.workspace_id, &params.session_id);
    Ok(serde_json::json!({}))
}

fn session_focus_clear(server: &Server, conn: &ConnectionState) -> Result<Value> {
    server.registry.clear_focus(&conn.client_id);
    Ok(serde_json::json!({}))
}
