//! Convergence engine
//!
//! `plan` builds the fixed, ordered list of steps; `orchestrator` runs them
//! one at a time against a `CommandRunner`, skipping steps whose idempotency
//! predicate already holds and applying each step's failure policy.

pub mod fsm;
pub mod orchestrator;
pub mod plan;
pub mod redact;
pub mod step;
