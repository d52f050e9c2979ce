//! Core modules shared by every subsystem.
//!
//! Storage, the write broker, configuration, errors and the small output and
//! time helpers the front end builds on.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
