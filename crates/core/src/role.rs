// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker roles

use serde::{Deserialize, Serialize};

/// One of the three single-slot worker roles, each backed by its own
/// persistent agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Retriever,
    Learner,
    Compactor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Retriever => "retriever",
            Role::Learner => "learner",
            Role::Compactor => "compactor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
