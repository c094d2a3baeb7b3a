//! Utility functions and helpers for the cachegate proxy.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and URL sanitization for log lines.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
