//! `nav-sync` library crate.
//!
//! The binary (`navsync`) is a thin wrapper around this library so the whole
//! fetch -> derive -> publish flow is testable without spawning processes or
//! touching the network.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod runner;
pub mod series;
pub mod store;
