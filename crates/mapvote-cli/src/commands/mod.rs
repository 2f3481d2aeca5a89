//! CLI subcommands

pub mod catalog;
pub mod check_config;
pub mod common;
pub mod simulate;
