//! Shared fixtures for the end-to-end collection tests.
//!
//! - `fixtures`: deterministic synthetic climates and the in-memory world
//! - `helpers`: tracing setup and assertions

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;
