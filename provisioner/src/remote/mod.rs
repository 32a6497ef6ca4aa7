//! Connection to the target host

pub mod mock;
pub mod runner;
pub mod ssh;
