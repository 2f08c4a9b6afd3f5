//! Port traits at the I/O seams of the analytics core.

pub mod config_port;
pub mod returns_port;
