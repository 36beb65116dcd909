//! Session tests:
//! - Property tests: randomized event sequences against the progress invariants
//! - Scenario tests: whole sessions driven from replayed frames

mod property;
mod scenarios;
