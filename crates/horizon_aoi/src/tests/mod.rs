//! Scenario tests for the AOI subsystem
//!
//! - Grid queries checked against a brute-force oracle
//! - Full interest cycles against a mock world and sink
//! - Registry id allocation under concurrent registration
//! - Scheduler start, shutdown and cycle limits

#[cfg(test)]
pub mod support;

#[cfg(test)]
pub mod grid_oracle_test;
