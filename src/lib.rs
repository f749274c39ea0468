//! HTTP gateway serving Google Translate v2 and v3 behind one contract.

pub mod backend;
pub mod compat;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod server;
