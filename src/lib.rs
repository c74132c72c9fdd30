pub mod analyzer;
pub mod buffer;
pub mod classify;
pub mod cli;
pub mod config;
pub mod output;
pub mod session;
pub mod source;
pub mod watch;
