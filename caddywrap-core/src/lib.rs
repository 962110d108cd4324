//! Caddywrap Core Library
//!
//! Host-side HTTP types shared by every Caddywrap crate: the [`server::Handler`]
//! trait, middleware chaining, a path multiplexer, virtual-host dispatch and the
//! listener that drives them.

pub mod error;
pub mod server;

pub use error::{Error, Result};

/// Caddywrap version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
