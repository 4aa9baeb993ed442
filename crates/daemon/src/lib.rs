// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! engram daemon library
//!
//! Exposes the IPC protocol and client for hook-side use, plus the
//! lifecycle entry points the `engramd` binary (and the behavioral specs)
//! wire together.

pub mod client;
pub mod config;
mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;
mod protocol_wire;
pub mod supervisor;
mod workers;

pub use client::{prompt_fingerprint, Client, ClientError};
pub use config::{Config, ConfigError};
pub use lifecycle::{startup, LifecycleError, StartupResult};
pub use protocol::{
    ProtocolError, Request, Response, StatusReport, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
    PROTOCOL_VERSION,
};
pub use supervisor::Supervisor;
