//! Command-line interface for shipbox

pub mod commands;
pub mod handlers;
pub mod output;
