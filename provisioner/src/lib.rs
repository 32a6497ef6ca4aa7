//! Provisioner Library
//!
//! Brings a remote Linux host to the state needed to run a containerized web
//! application behind a reverse proxy with TLS.

pub mod app;
pub mod converge;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod remote;
pub mod render;
pub mod storage;
pub mod utils;
