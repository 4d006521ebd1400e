//! Vigil Core
//!
//! Core types for the Vigil check runner.
//!
//! This crate contains:
//! - Domain types: test definitions, job reports, sink specifications
//!
//! Note: Scheduling and execution logic live in the runner; this crate is
//! pure data shared across services.

pub mod domain;
