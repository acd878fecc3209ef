//! # Kindred
//!
//! CLI and HTTP front ends for the `kindred-core` view engine.

pub mod api;
pub mod cli;
pub mod config;
