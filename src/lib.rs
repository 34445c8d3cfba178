//! steprun: idempotent provisioning step runner.
//!
//! Ordered steps, each guarded by a precondition over live host state.
//! Fail-fast, no rollback, JSONL provenance log.

pub mod cli;
pub mod core;
pub mod resources;
pub mod transport;
pub mod tripwire;
