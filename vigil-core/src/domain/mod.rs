//! Core domain types
//!
//! This module contains the core domain structures used across Vigil services.
//! These types represent the fundamental business entities: what a test is,
//! what one execution attempt produced, and where its output goes.

pub mod job;
pub mod sink;
pub mod test;
