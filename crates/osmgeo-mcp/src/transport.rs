//! Newline-delimited JSON-RPC transport and request dispatch
//!
//! Every outbound frame (responses and notifications) goes through a single
//! writer task so frames never interleave. `tools/call` and `resources/read`
//! run as spawned tasks; the other methods answer inline.

use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::select;
use tokio::signal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

use crate::notify::McpReporter;
use crate::resources::read_resource;
use crate::server::McpServerState;
use crate::tools::{call_tool, CallError};
use crate::types::{
    error_response, success_response, CallToolResult, JsonRpcError, JsonRpcRequest,
    ResourceReadParams, ToolCallParams, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};

/// Serve requests from `reader` until EOF, interrupt, or a closed writer,
/// then release the upstream session.
pub async fn run_server_loop<R, W>(reader: R, writer: W, state: Arc<McpServerState>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tracing::info!("MCP server initialized, waiting for requests...");

    let (outbound, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, rx));
    let mut lines = BufReader::new(reader).lines();
    let mut tasks = JoinSet::new();

    let interrupt = signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    loop {
        select! {
            _ = &mut interrupt => {
                tracing::info!("Received shutdown signal, exiting gracefully");
                interrupted = true;
                break;
            }

            _ = outbound.closed() => {
                tracing::info!("Client disconnected (writer closed)");
                break;
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("Request task failed: {}", e);
                }
            }

            line = lines.next_line() => {
                match line.context("failed to read from client")? {
                    Some(line) => dispatch(&line, &state, &outbound, &mut tasks),
                    None => {
                        tracing::info!("Client disconnected (EOF)");
                        break;
                    }
                }
            }
        }
    }

    if interrupted {
        tasks.abort_all();
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if !e.is_cancelled() {
                tracing::error!("Request task failed: {}", e);
            }
        }
    }

    drop(outbound);
    let written = writer_task.await.context("writer task failed")?;
    state.shutdown().await;

    match written {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            tracing::info!("Client disconnected (broken pipe)");
        }
        Err(e) => return Err(e).context("failed to write to client"),
        Ok(()) => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn write_loop<W>(mut writer: W, mut rx: UnboundedReceiver<Value>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut frame = serde_json::to_vec(&message)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    Ok(())
}

fn send(outbound: &UnboundedSender<Value>, message: Value) {
    if outbound.send(message).is_err() {
        tracing::debug!("dropping message; writer closed");
    }
}

fn result_response<T: Serialize>(id: Value, result: &T) -> Value {
    match serde_json::to_value(result) {
        Ok(value) => success_response(id, value),
        Err(e) => error_response(id, JsonRpcError::new(INTERNAL_ERROR, e.to_string())),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn dispatch(
    line: &str,
    state: &Arc<McpServerState>,
    outbound: &UnboundedSender<Value>,
    tasks: &mut JoinSet<()>,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Discarding unparseable message: {}", e);
            let error = JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e));
            send(outbound, error_response(Value::Null, error));
            return;
        }
    };

    if value.get("method").is_none() {
        tracing::debug!("Ignoring message without a method");
        return;
    }
    let fallback_id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            let error = JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e));
            send(outbound, error_response(fallback_id, error));
            return;
        }
    };

    let Some(id) = request.id.clone() else {
        tracing::debug!("Notification received: {}", request.method);
        return;
    };

    if request.jsonrpc.as_deref().is_some_and(|v| v != JSONRPC_VERSION) {
        let error = JsonRpcError::new(INVALID_REQUEST, "Unsupported jsonrpc version");
        send(outbound, error_response(id, error));
        return;
    }

    tracing::debug!("Handling {}", request.method);
    let response = match request.method.as_str() {
        "initialize" => success_response(id, state.initialize_result()),
        "ping" | "logging/setLevel" => success_response(id, json!({})),
        "tools/list" => success_response(id, json!({ "tools": state.tools() })),
        "resources/list" => success_response(id, json!({ "resources": [] })),
        "resources/templates/list" => success_response(
            id,
            json!({ "resourceTemplates": state.resource_templates() }),
        ),
        "tools/call" => match parse_params::<ToolCallParams>(request.params) {
            Ok(params) => {
                spawn_tool_call(id, params, state, outbound, tasks);
                return;
            }
            Err(error) => error_response(id, error),
        },
        "resources/read" => match parse_params::<ResourceReadParams>(request.params) {
            Ok(params) => {
                spawn_resource_read(id, params, state, outbound, tasks);
                return;
            }
            Err(error) => error_response(id, error),
        },
        other => error_response(
            id,
            JsonRpcError::new(METHOD_NOT_FOUND, format!("Unknown method: {}", other)),
        ),
    };
    send(outbound, response);
}

fn spawn_tool_call(
    id: Value,
    params: ToolCallParams,
    state: &Arc<McpServerState>,
    outbound: &UnboundedSender<Value>,
    tasks: &mut JoinSet<()>,
) {
    let state = Arc::clone(state);
    let outbound = outbound.clone();
    tasks.spawn(async move {
        let reporter = McpReporter::new(outbound.clone(), params.progress_token());
        let outcome = call_tool(state.client(), &params.name, params.arguments, &reporter).await;
        let response = match outcome {
            Ok(value) => result_response(id, &CallToolResult::success(value)),
            Err(CallError::Failed(problem)) => {
                tracing::warn!("Tool {} failed: {}", params.name, problem);
                result_response(id, &CallToolResult::failure(problem.to_problem_text()))
            }
            Err(CallError::UnknownTool(name)) => error_response(
                id,
                JsonRpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", name)),
            ),
            Err(CallError::InvalidArguments { tool, reason }) => error_response(
                id,
                JsonRpcError::new(
                    INVALID_PARAMS,
                    format!("Invalid arguments for {}: {}", tool, reason),
                ),
            ),
        };
        send(&outbound, response);
    });
}

fn spawn_resource_read(
    id: Value,
    params: ResourceReadParams,
    state: &Arc<McpServerState>,
    outbound: &UnboundedSender<Value>,
    tasks: &mut JoinSet<()>,
) {
    let state = Arc::clone(state);
    let outbound = outbound.clone();
    tasks.spawn(async move {
        let response = match read_resource(state.client(), &params.uri).await {
            Ok(contents) => success_response(id, json!({ "contents": [contents] })),
            Err(problem) => {
                tracing::warn!("Resource {} failed: {}", params.uri, problem);
                error_response(id, problem.to_json_rpc())
            }
        };
        send(&outbound, response);
    });
}
