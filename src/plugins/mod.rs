//! CLI-facing subsystems built on the core engine.

pub mod anchor;
pub mod audit;
pub mod purge;
pub mod roster;
pub mod tamper;
