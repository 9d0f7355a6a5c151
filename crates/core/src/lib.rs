//! Lasu Mart Core - Shared types library.
//!
//! This crate provides the domain types used across the Lasu Mart workspace:
//! - `api` - The marketplace HTTP and WebSocket server
//! - `cli` - Command-line tools for migrations and administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, contact details, prices, ratings and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
