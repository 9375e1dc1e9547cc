// src/system/mod.rs
//
// Concrete implementations of the collaborator traits declared in
// `crate::context`, for hosts that run shellpick from a terminal.

pub mod config_loader;
pub mod executor;
pub mod memory;
pub mod ui;
