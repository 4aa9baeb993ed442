// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent adapter for deterministic testing

use super::{AgentAdapter, AgentError, AgentReply, CallLimits, InitSessionConfig, ReplyOutcome};
use async_trait::async_trait;
use engram_core::{AgentSessionId, Role};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Recorded call to FakeAgentAdapter
#[derive(Debug, Clone)]
pub enum AgentCall {
    Init {
        role: Role,
        system_prompt: String,
    },
    Resume {
        role: Role,
        handle: AgentSessionId,
        message: String,
        max_turns: u32,
    },
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply {
        text: String,
        is_error: bool,
        cost_usd: f64,
    },
    TransportError(String),
}

#[derive(Debug, Default)]
struct FakeState {
    replies: HashMap<Role, VecDeque<Scripted>>,
    delays: HashMap<Role, Duration>,
    init_errors: HashMap<Role, String>,
    handles: HashMap<AgentSessionId, Role>,
    calls: Vec<AgentCall>,
    next_handle: u32,
}

/// Fake agent adapter for testing
///
/// Scripted per role: queued replies are returned in order, and an empty
/// queue answers `SKIP`. Records every call for assertions.
#[derive(Debug, Clone, Default)]
pub struct FakeAgentAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply for a role's next resume.
    pub fn queue_reply(&self, role: Role, text: impl Into<String>) {
        self.inner
            .lock()
            .replies
            .entry(role)
            .or_default()
            .push_back(Scripted::Reply {
                text: text.into(),
                is_error: false,
                cost_usd: 0.001,
            });
    }

    /// Queue a reply the agent itself reports as failed.
    pub fn queue_error_reply(&self, role: Role, text: impl Into<String>) {
        self.inner
            .lock()
            .replies
            .entry(role)
            .or_default()
            .push_back(Scripted::Reply {
                text: text.into(),
                is_error: true,
                cost_usd: 0.001,
            });
    }

    /// Queue a transport-level failure for a role's next resume.
    pub fn queue_transport_error(&self, role: Role, message: impl Into<String>) {
        self.inner
            .lock()
            .replies
            .entry(role)
            .or_default()
            .push_back(Scripted::TransportError(message.into()));
    }

    /// Delay every call for a role (to hold its slot busy in tests).
    pub fn set_delay(&self, role: Role, delay: Duration) {
        self.inner.lock().delays.insert(role, delay);
    }

    /// Fail the next `init_session` for a role.
    pub fn set_init_error(&self, role: Role, message: impl Into<String>) {
        self.inner.lock().init_errors.insert(role, message.into());
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of resume calls recorded for a role.
    pub fn resume_count(&self, role: Role) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, AgentCall::Resume { role: r, .. } if *r == role))
            .count()
    }

    /// The user messages of recorded resumes for a role.
    pub fn resume_messages(&self, role: Role) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                AgentCall::Resume {
                    role: r, message, ..
                } if *r == role => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn init_session(
        &self,
        role: Role,
        config: InitSessionConfig,
    ) -> Result<AgentSessionId, AgentError> {
        let mut inner = self.inner.lock();
        inner.calls.push(AgentCall::Init {
            role,
            system_prompt: config.system_prompt,
        });
        if let Some(message) = inner.init_errors.remove(&role) {
            return Err(AgentError::NoSession(message));
        }
        inner.next_handle += 1;
        let handle = AgentSessionId::new(format!("fake-{}-{}", role, inner.next_handle));
        inner.handles.insert(handle.clone(), role);
        Ok(handle)
    }

    async fn resume(
        &self,
        handle: &AgentSessionId,
        user_message: &str,
        limits: &CallLimits,
    ) -> Result<AgentReply, AgentError> {
        let (delay, scripted) = {
            let mut inner = self.inner.lock();
            let role = *inner
                .handles
                .get(handle)
                .ok_or_else(|| AgentError::NoSession(handle.to_string()))?;
            inner.calls.push(AgentCall::Resume {
                role,
                handle: handle.clone(),
                message: user_message.to_string(),
                max_turns: limits.max_turns,
            });
            let delay = inner.delays.get(&role).copied();
            let scripted = inner
                .replies
                .get_mut(&role)
                .and_then(|queue| queue.pop_front());
            (delay, scripted)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(Scripted::Reply {
                text,
                is_error,
                cost_usd,
            }) => Ok(AgentReply {
                outcome: if is_error {
                    ReplyOutcome::Error
                } else {
                    ReplyOutcome::Success
                },
                text,
                cost_usd,
            }),
            Some(Scripted::TransportError(message)) => Err(AgentError::CallFailed(message)),
            None => Ok(AgentReply {
                outcome: ReplyOutcome::Success,
                text: "SKIP".to_string(),
                cost_usd: 0.0,
            }),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
