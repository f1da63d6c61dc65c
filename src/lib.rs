//! Command-line front end for the workflow execution core.
//!
//! The interesting code lives in the member crates; this crate only wires
//! flow files, context files and configuration into the engine.

pub mod cli;
pub mod config;
