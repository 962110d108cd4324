//! Built-in directives

pub mod echo;

use caddywrap_plugin::DirectiveRegistry;

/// Registry with every built-in directive, in execution order
pub fn registry() -> DirectiveRegistry {
    let mut registry = DirectiveRegistry::new();
    registry.register_plugin(&echo::EchoPlugin);
    registry
}
