//! shellpick resolves declarative shell-command inputs: it runs a
//! configured command, parses its output into candidates, and resolves
//! them to a value automatically or through an interactive picker, with
//! `${...}` variable expansion and remembered selections along the way.

pub mod cli;
pub mod constants;
pub mod context;
pub mod core;
pub mod models;
pub mod system;
