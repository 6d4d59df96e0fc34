//! Blocksmith walks an introspected library object graph and turns its
//! modules, classes and routines into visual programming blocks.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
