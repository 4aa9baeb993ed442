//! Behavioral specifications for the engram daemon.
//!
//! These tests are end-to-end in-process: they start the daemon (supervisor
//! plus socket listener) against a temp state directory with a scripted
//! fake agent, then drive it through the hook-side socket client.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/retriever.rs"]
mod retriever;

#[path = "specs/learner.rs"]
mod learner;

#[path = "specs/compactor.rs"]
mod compactor;

#[path = "specs/lifecycle.rs"]
mod lifecycle;
