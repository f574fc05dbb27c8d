//! Async Session Layer
//!
//! Non-deterministic shell around the engine: tokio task, real clock,
//! outbound collaborators.
//!
//! ## Module Structure
//!
//! - `driver`: Session task, handle and tokio-backed clock
//! - `collaborators`: Run submitter seam and bounded analytics log

pub mod collaborators;
pub mod driver;

pub use collaborators::{
    NoopSubmitter, RunLogStore, RunSubmitter, SubmitError, DEFAULT_LOG_CAPACITY,
};
pub use driver::{
    spawn_session, spawn_session_with_prompts, SessionConfig, SessionError, SessionHandle,
    TokioClock,
};
