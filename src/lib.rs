//! ccscope: inspect layered Claude Code configuration from the command line.

pub mod commands;
pub mod config;
pub mod output;
