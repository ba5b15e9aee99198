//! Shared infrastructure for the engine integration tests.
//!
//! - `fixtures`: sin-based synthetic series, datasets and small recipes
//! - `helpers`: tracing setup

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;
