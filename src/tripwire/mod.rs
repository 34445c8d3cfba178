//! Tripwire: provenance tracing of every run.

pub mod eventlog;
