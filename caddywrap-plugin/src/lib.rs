//! Caddywrap Plugin System
//!
//! Directives are registered with a [`DirectiveRegistry`] as setup functions.
//! [`app_to_directive`] builds such a setup function from an application's
//! config type and mux factory.

mod adapter;
mod error;
mod registry;
mod site;
mod traits;

pub use adapter::{Controller, SetupFn, app_to_directive};
pub use error::SetupError;
pub use registry::{DirectiveRegistry, SiteSetup};
pub use site::SiteAddress;
pub use traits::{Plugin, PluginInfo};
