//! Update tester: a stand-in update controller for exercising update modules.
//!
//! Update modules connect over TCP and report their state; an operator drives
//! them through prepare/start/apply/revert from an interactive shell.

pub mod cli;
pub mod config;
pub mod controller;
pub mod logging;
pub mod protocol;
pub mod shell;
