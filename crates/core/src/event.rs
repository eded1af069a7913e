// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Business event model
//!
//! An [`AgentEvent`] is one unit of agent progress published by a worker and
//! delivered to SSE clients. Workers stream progressive refinements of the
//! same logical event under one UUID; the log upserts by UUID while
//! preserving first-appearance order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentState {
    Init,
    Processing,
    Interrupt,
    Complete,
    Error,
}

impl CurrentState {
    /// Terminal states end the stream once delivered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CurrentState::Complete | CurrentState::Error)
    }
}

/// Kind of agent activity an event describes.
///
/// The wire string doubles as the SSE `event:` name for business frames and
/// must stay disjoint from the reserved system frame names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteType {
    AssistantResponse,
    ToolJobPlan,
    ToolUseTemplate,
    ToolFileView,
    ToolFileRead,
    ToolFileEdit,
    ToolMultiEdit,
    ToolTodoRead,
    ToolTodoWrite,
    ToolBash,
    ToolFilesCreation,
    ToolFilesView,
    ToolFilesEdit,
    ToolSuggestNextSteps,
    ToolGlob,
    ToolLs,
    ToolGrep,
    FlowCompletion,
    StatusSandboxInfo,
}

impl ExecuteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecuteType::AssistantResponse => "assistant_response",
            ExecuteType::ToolJobPlan => "tool_job_plan",
            ExecuteType::ToolUseTemplate => "tool_use_template",
            ExecuteType::ToolFileView => "tool_file_view",
            ExecuteType::ToolFileRead => "tool_file_read",
            ExecuteType::ToolFileEdit => "tool_file_edit",
            ExecuteType::ToolMultiEdit => "tool_multi_edit",
            ExecuteType::ToolTodoRead => "tool_todo_read",
            ExecuteType::ToolTodoWrite => "tool_todo_write",
            ExecuteType::ToolBash => "tool_bash",
            ExecuteType::ToolFilesCreation => "tool_files_creation",
            ExecuteType::ToolFilesView => "tool_files_view",
            ExecuteType::ToolFilesEdit => "tool_files_edit",
            ExecuteType::ToolSuggestNextSteps => "tool_suggest_next_steps",
            ExecuteType::ToolGlob => "tool_glob",
            ExecuteType::ToolLs => "tool_ls",
            ExecuteType::ToolGrep => "tool_grep",
            ExecuteType::FlowCompletion => "flow_completion",
            ExecuteType::StatusSandboxInfo => "status_sandbox_info",
        }
    }

    /// All variants, for exhaustive wire-format checks.
    pub fn all() -> &'static [ExecuteType] {
        &[
            ExecuteType::AssistantResponse,
            ExecuteType::ToolJobPlan,
            ExecuteType::ToolUseTemplate,
            ExecuteType::ToolFileView,
            ExecuteType::ToolFileRead,
            ExecuteType::ToolFileEdit,
            ExecuteType::ToolMultiEdit,
            ExecuteType::ToolTodoRead,
            ExecuteType::ToolTodoWrite,
            ExecuteType::ToolBash,
            ExecuteType::ToolFilesCreation,
            ExecuteType::ToolFilesView,
            ExecuteType::ToolFilesEdit,
            ExecuteType::ToolSuggestNextSteps,
            ExecuteType::ToolGlob,
            ExecuteType::ToolLs,
            ExecuteType::ToolGrep,
            ExecuteType::FlowCompletion,
            ExecuteType::StatusSandboxInfo,
        ]
    }
}

/// Step of a plan produced by the planning tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub title: String,
    pub status: String,
}

/// Job plan produced by the planning tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPlan {
    pub steps: Vec<PlanStep>,
}

/// Bash tool execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BashResult {
    pub cmd: String,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Glob tool execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobResult {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Ls tool execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsResult {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Grep tool execution result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepResult {
    pub pattern: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// File read result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReadResult {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// File creation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWriteResult {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Single-edit result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEditResult {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
}

/// One edit operation within a multi-edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOp {
    pub old_string: String,
    pub new_string: String,
}

/// Multi-edit result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiEditResult {
    pub file_path: String,
    pub edits: Vec<EditOp>,
}

/// One todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: String,
}

/// Todo read/write result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoListResult {
    pub todos: Vec<TodoItem>,
}

/// Sandbox placement of the running agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxInfo {
    pub sandbox_id: String,
    pub sandbox_url: String,
    pub app_path: String,
}

/// Tool-output payload of an event.
///
/// Externally tagged: exactly one result key appears on the wire, e.g.
/// `{"tool_bash_result": {"cmd": "ls", "cwd": "/", "result": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecuteResult {
    #[serde(rename = "assistant_response_result")]
    AssistantResponse(String),
    #[serde(rename = "tool_job_plan_result")]
    JobPlan(JobPlan),
    #[serde(rename = "tool_bash_result")]
    Bash(BashResult),
    #[serde(rename = "tool_file_write_result")]
    FileWrite(FileWriteResult),
    #[serde(rename = "tool_use_template_result")]
    UseTemplate(FileWriteResult),
    #[serde(rename = "tool_file_edit_result")]
    FileEdit(FileEditResult),
    #[serde(rename = "tool_multi_edit_result")]
    MultiEdit(MultiEditResult),
    #[serde(rename = "tool_todo_read_result")]
    TodoRead(TodoListResult),
    #[serde(rename = "tool_todo_write_result")]
    TodoWrite(TodoListResult),
    #[serde(rename = "tool_suggest_next_steps_result")]
    SuggestNextSteps(Vec<String>),
    #[serde(rename = "tool_glob_result")]
    Glob(GlobResult),
    #[serde(rename = "tool_ls_result")]
    Ls(LsResult),
    #[serde(rename = "tool_grep_result")]
    Grep(GrepResult),
    #[serde(rename = "tool_file_read_result")]
    FileRead(FileReadResult),
    #[serde(rename = "status_sandbox_info")]
    SandboxInfo(SandboxInfo),
    #[serde(rename = "flow_completion_message")]
    FlowCompletion(String),
}

/// One unit of streamed agent progress.
///
/// Timestamps are stamped by the publisher: `create_at` on first publish,
/// `modify_at` on every publish, `execute_end_at` when the event reaches a
/// terminal state. Null fields are omitted on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Stable identity within a thread's log: `task_agent_execute-<32 hex>`
    pub uuid: String,
    pub execute_type: ExecuteType,
    pub current_state: CurrentState,
    #[serde(default)]
    pub error_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_start_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_end_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_result: Option<ExecuteResult>,
}

impl AgentEvent {
    pub fn new(uuid: impl Into<String>, execute_type: ExecuteType, state: CurrentState) -> Self {
        Self {
            uuid: uuid.into(),
            execute_type,
            current_state: state,
            error_flag: false,
            execute_start_at: None,
            execute_end_at: None,
            create_at: None,
            modify_at: None,
            execute_result: None,
        }
    }

    /// True once the event carries a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! Builders for events in other crates' tests.

    use super::*;

    /// Deterministic event UUID: `task_agent_execute-<n as 32 hex>`.
    pub fn event_uuid(n: u64) -> String {
        format!("task_agent_execute-{n:032x}")
    }

    /// Minimal event with the given UUID index and state.
    pub fn event(n: u64, state: CurrentState) -> AgentEvent {
        AgentEvent::new(event_uuid(n), ExecuteType::AssistantResponse, state)
    }

    /// Event with a specific type and a filled result payload.
    pub fn bash_event(n: u64, state: CurrentState, cmd: &str) -> AgentEvent {
        let mut ev = AgentEvent::new(event_uuid(n), ExecuteType::ToolBash, state);
        ev.execute_result = Some(ExecuteResult::Bash(BashResult {
            cmd: cmd.to_string(),
            cwd: "/workspace".to_string(),
            result: None,
        }));
        ev
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
