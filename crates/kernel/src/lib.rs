//! Sentiero Kernel Library
//!
//! Path-to-page resolution and versioned, per-language page content.
//! The main entry point for running the server is the `sentiero` binary.

pub mod cache;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod path;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

pub use config::{Config, PageConfig};
pub use state::AppState;
