//! Step action handlers.
//!
//! Each handler performs one kind of action:
//! 1. package: delegate to a `PackageManager`
//! 2. directory: create a directory tree
//! 3. command: run a command line through a `CommandRunner`

pub mod command;
pub mod directory;
pub mod package;
