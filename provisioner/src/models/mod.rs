//! Data model of a provisioning run

pub mod host;
pub mod layout;
pub mod outcome;
pub mod parameters;
pub mod vhost;
