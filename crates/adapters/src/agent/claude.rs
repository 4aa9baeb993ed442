// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude agent adapter: headless CLI invocations with session resumption.

use super::stream::extract_result;
use super::{AgentAdapter, AgentError, AgentReply, CallLimits, InitSessionConfig, ReplyOutcome};
use crate::subprocess::{run_with_timeout, AGENT_CALL_TIMEOUT};
use async_trait::async_trait;
use engram_core::{AgentSessionId, Role};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Fixed probe appended to the system prompt on session initialization.
const READINESS_PROBE: &str =
    "Confirm you are ready to receive work. Reply with the single word READY.";

/// Configuration shared by all of this adapter's invocations.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// Agent binary to execute (e.g. "claude").
    pub command: String,
    /// Working directory passed to the agent runtime.
    pub cwd: Option<PathBuf>,
    /// Knowledge-tool endpoint, passed opaquely as an MCP server definition.
    pub mcp_server: Option<String>,
    /// Interpreter for the knowledge-tool endpoint.
    pub python_path: Option<String>,
    /// Wall-clock ceiling per invocation.
    pub call_timeout: Duration,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            cwd: None,
            mcp_server: None,
            python_path: None,
            call_timeout: AGENT_CALL_TIMEOUT,
        }
    }
}

/// Agent adapter for the Claude Code CLI.
///
/// Each call is one headless invocation (`-p --output-format stream-json`);
/// conversational continuity comes from `--session-id` on init and
/// `--resume` on every later call.
#[derive(Clone)]
pub struct ClaudeAgentAdapter {
    config: ClaudeConfig,
}

impl ClaudeAgentAdapter {
    pub fn new(config: ClaudeConfig) -> Self {
        Self { config }
    }

    fn base_command(&self, message: &str, limits: &CallLimits) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.arg("-p")
            .arg(message)
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--model")
            .arg(&limits.model)
            .arg("--max-turns")
            .arg(limits.max_turns.to_string());

        if !limits.tool_allowlist.is_empty() {
            cmd.arg("--allowedTools")
                .arg(limits.tool_allowlist.join(","));
        }
        if let Some(mcp_config) = self.mcp_config_json() {
            cmd.arg("--mcp-config").arg(mcp_config);
        }
        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(std::process::Stdio::null());
        cmd
    }

    /// Inline MCP server definition for the knowledge tools, if configured.
    fn mcp_config_json(&self) -> Option<String> {
        let server = self.config.mcp_server.as_ref()?;
        let interpreter = self
            .config
            .python_path
            .clone()
            .unwrap_or_else(|| "python3".to_string());
        let config = serde_json::json!({
            "mcpServers": {
                "memory": {
                    "command": interpreter,
                    "args": [server],
                }
            }
        });
        Some(config.to_string())
    }

    async fn invoke(
        &self,
        cmd: Command,
        role_label: &str,
    ) -> Result<super::stream::StreamResult, AgentError> {
        let description = format!("{role_label} agent call");
        let output = run_with_timeout(cmd, self.config.call_timeout, &description)
            .await
            .map_err(AgentError::CallFailed)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::CallFailed(format!(
                "{description} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        extract_result(&stdout)
    }
}

#[async_trait]
impl AgentAdapter for ClaudeAgentAdapter {
    async fn init_session(
        &self,
        role: Role,
        config: InitSessionConfig,
    ) -> Result<AgentSessionId, AgentError> {
        let session_id = uuid::Uuid::new_v4().to_string();

        let mut cmd = self.base_command(READINESS_PROBE, &config.limits);
        cmd.arg("--session-id").arg(&session_id);
        cmd.arg("--append-system-prompt").arg(&config.system_prompt);

        tracing::debug!(role = %role, session_id, "initializing agent session");
        let result = self.invoke(cmd, role.as_str()).await?;
        if result.is_error {
            return Err(AgentError::NoSession(result.text));
        }

        // Prefer the runtime's reported id; it is the resumable one.
        let handle = result.session_id.unwrap_or(session_id);
        tracing::info!(role = %role, handle, cost_usd = result.cost_usd, "agent session ready");
        Ok(AgentSessionId::new(handle))
    }

    async fn resume(
        &self,
        handle: &AgentSessionId,
        user_message: &str,
        limits: &CallLimits,
    ) -> Result<AgentReply, AgentError> {
        let mut cmd = self.base_command(user_message, limits);
        cmd.arg("--resume").arg(handle.as_str());

        let result = self.invoke(cmd, "resume").await?;

        if result.cost_usd > limits.budget_usd {
            tracing::warn!(
                handle = %handle,
                cost_usd = result.cost_usd,
                budget_usd = limits.budget_usd,
                "agent call exceeded its budget cap"
            );
        }

        Ok(AgentReply {
            outcome: if result.is_error {
                ReplyOutcome::Error
            } else {
                ReplyOutcome::Success
            },
            text: result.text,
            cost_usd: result.cost_usd,
        })
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
