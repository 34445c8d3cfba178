//! Core step-runner logic: types, parsing, templates, includes, execution.

pub mod error;
pub mod executor;
pub mod host;
pub mod parser;
pub mod recipe;
pub mod resolver;
pub mod types;
