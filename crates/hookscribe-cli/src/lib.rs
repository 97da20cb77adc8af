//! Library side of the `hookscribe` binary
//!
//! Exposed so integration tests and the binary share one definition of the
//! command line and the command implementations.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod time;
