//! Cached reporting services: the daily dev report cache controller and the
//! per-goal progress assembler.

pub mod dev_report;
pub mod progress;
