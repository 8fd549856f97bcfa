//! geoquery - ask questions about a city's map data in plain language.
//!
//! This library exposes the core modules for use by the binary and
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod safety;
pub mod server;
