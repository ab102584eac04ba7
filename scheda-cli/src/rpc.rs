//! JSON-RPC tool server
//!
//! Line-delimited JSON-RPC 2.0 over stdin/stdout exposing the sync operations
//! as tools. stdout carries protocol messages only; logs go to stderr.

use crate::watcher::FolderWatcher;
use crate::worker::{Job, JobQueue};
use anyhow::Result;
use scheda_core::SyncConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const TOOL_FAILED: i32 = -32000;
const METHOD_NOT_FOUND: i32 = -32601;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

/// Tool descriptors returned by `tools/list`
pub fn list_tools() -> Vec<Value> {
    vec![
        json!({
            "name": "update_descriptions",
            "description": "Sync a folder of 'Scheda descrittiva' DOCX write-ups into a catalog database",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "folder_path": { "type": "string", "description": "Folder holding the write-ups" },
                    "db_path": { "type": "string", "description": "SQLite catalog file" }
                },
                "required": ["folder_path", "db_path"]
            }
        }),
        json!({
            "name": "process_new_items",
            "description": "Sync the write-ups of every item folder under the items root",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
        json!({
            "name": "start_auto_watch",
            "description": "Start watching the items root and sync new item folders as they appear",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
    ]
}

pub struct ToolServer {
    queue: JobQueue,
    config: SyncConfig,
    watcher: Option<FolderWatcher>,
}

impl ToolServer {
    pub fn new(queue: JobQueue, config: SyncConfig) -> Self {
        Self {
            queue,
            config,
            watcher: None,
        }
    }

    /// Read requests line by line until EOF, answering each on `output`
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        info!("Tool server starting");

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: RpcRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    error!("Invalid JSON: {} - line: {}", e, line);
                    continue;
                }
            };
            debug!("Received request: method={}", request.method);

            if let Some(response) = self.handle_request(request) {
                serde_json::to_writer(&mut output, &response)?;
                writeln!(output)?;
                output.flush()?;
            }
        }

        info!("Tool server shutting down");
        Ok(())
    }

    /// `None` for notifications, which get no reply
    pub fn handle_request(&mut self, request: RpcRequest) -> Option<RpcResponse> {
        if request.method.starts_with("notifications/") {
            debug!("Notification: {}", request.method);
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "serverInfo": {
                        "name": "scheda",
                        "version": env!("CARGO_PKG_VERSION")
                    },
                    "capabilities": {
                        "tools": {}
                    }
                }),
            ),

            "tools/list" => RpcResponse::ok(id, json!({ "tools": list_tools() })),

            "tools/call" => {
                let params = request.params.unwrap_or(Value::Null);
                let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

                info!("Calling tool: {} with args: {}", tool_name, arguments);

                match self.call_tool(tool_name, &arguments) {
                    Ok(result) => RpcResponse::ok(
                        id,
                        json!({
                            "content": [{
                                "type": "text",
                                "text": serde_json::to_string_pretty(&result).unwrap_or_default()
                            }]
                        }),
                    ),
                    Err(message) => {
                        error!("Tool {} failed: {}", tool_name, message);
                        RpcResponse::err(id, TOOL_FAILED, message)
                    }
                }
            }

            _ => {
                warn!("Unknown method: {}", request.method);
                RpcResponse::err(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                )
            }
        };

        Some(response)
    }

    fn call_tool(&mut self, name: &str, arguments: &Value) -> std::result::Result<Value, String> {
        match name {
            "update_descriptions" => {
                let folder = path_argument(arguments, "folder_path")?;
                let database = path_argument(arguments, "db_path")?;
                self.run_job(Job::UpdateDescriptions { folder, database })
            }
            "process_new_items" => self.run_job(Job::ProcessItems),
            "start_auto_watch" => self.start_watch(),
            _ => Err(format!("Unknown tool: {name}")),
        }
    }

    fn run_job(&self, job: Job) -> std::result::Result<Value, String> {
        let summary = self
            .queue
            .run(job)
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?;
        serde_json::to_value(summary).map_err(|e| e.to_string())
    }

    fn start_watch(&mut self) -> std::result::Result<Value, String> {
        if let Some(watcher) = &self.watcher {
            return Ok(json!({
                "watching": watcher.root(),
                "already_running": true
            }));
        }

        let watcher = FolderWatcher::start(&self.config.items_root, self.queue.clone())
            .map_err(|e| format!("{e:#}"))?;
        let result = json!({
            "watching": watcher.root(),
            "already_running": false
        });
        self.watcher = Some(watcher);
        Ok(result)
    }
}

fn path_argument(arguments: &Value, key: &str) -> std::result::Result<PathBuf, String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| format!("Missing required argument: {key}"))
}
