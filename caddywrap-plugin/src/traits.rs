//! Plugin traits

use crate::adapter::SetupFn;
use caddywrap_config::FieldBinding;

/// Plugin information
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Directive name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Plugin description
    pub description: String,
    /// Fields the directive's config accepts, when known
    pub fields: Vec<FieldBinding>,
}

impl PluginInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldBinding>) -> Self {
        self.fields = fields;
        self
    }
}

/// A directive that can be registered by value
pub trait Plugin: Send + Sync {
    fn info(&self) -> PluginInfo;

    /// Setup function run once per site the directive appears in
    fn setup(&self) -> SetupFn;
}
