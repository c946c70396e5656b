//! # Ember Core Configuration
//!
//! This crate provides configuration parsing for the Ember Core node.
//!
//! Ember Core uses a single-config philosophy where all node settings are
//! defined in one `embercore.toml` file, making deployment and
//! configuration management straightforward. Every section has defaults,
//! so the file only needs the values an operator wants to change.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use embercore_config::Config;
//! use std::path::Path;
//!
//! // Load configuration from TOML file
//! let config = Config::load(Path::new("embercore.toml"))?;
//!
//! // Feed the pool components
//! let limits = config.pool_limits();
//! println!("Persistence on: {}", config.persistence.enabled);
//! ```
//!
//! ## Configuration Sections
//!
//! - `[node]` - Node-wide settings (data directory)
//! - `[mempool]` - Transaction pool limits (byte budget, fee floor, ancestor depth)
//! - `[orphans]` - Orphan pool limits (entry cap, retention window)
//! - `[persistence]` - Pool snapshot persistence switch
//! - `[logging]` - Logging settings (level, format)

mod config;
mod error;

pub use config::*;
pub use error::*;
