//! Directive registry

use crate::adapter::{Controller, SetupFn};
use crate::error::SetupError;
use crate::site::SiteAddress;
use crate::traits::{Plugin, PluginInfo};
use caddywrap_config::ServerBlock;
use caddywrap_core::server::{Handler, NotFound, chain};
use std::fmt;
use std::sync::Arc;

/// Everything a server block turned into
pub struct SiteSetup {
    pub addresses: Vec<SiteAddress>,
    /// Site handler: every middleware in registration order over a 404
    pub handler: Arc<dyn Handler>,
    /// Adapted config per directive, for directives that recorded one
    pub adapted: Vec<(String, serde_json::Value)>,
}

impl fmt::Debug for SiteSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteSetup")
            .field("addresses", &self.addresses)
            .field("adapted", &self.adapted)
            .finish_non_exhaustive()
    }
}

struct Entry {
    info: PluginInfo,
    setup: SetupFn,
}

/// Directive registry
///
/// Registration order is execution order: a site's middlewares are chained
/// in the order their directives were registered, whatever order they
/// appear in within the Caddyfile.
#[derive(Default)]
pub struct DirectiveRegistry {
    entries: Vec<Entry>,
}

impl DirectiveRegistry {
    /// Create a new directive registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directive, replacing an earlier one of the same name in
    /// place
    pub fn register(&mut self, info: PluginInfo, setup: SetupFn) -> &mut Self {
        tracing::info!("Registering directive: {} v{}", info.name, info.version);
        match self.entries.iter_mut().find(|e| e.info.name == info.name) {
            Some(entry) => {
                tracing::warn!("Directive {} registered twice, keeping the last", info.name);
                *entry = Entry { info, setup };
            }
            None => self.entries.push(Entry { info, setup }),
        }
        self
    }

    pub fn register_plugin(&mut self, plugin: &dyn Plugin) -> &mut Self {
        self.register(plugin.info(), plugin.setup())
    }

    /// Get a directive's setup function by name
    pub fn get(&self, name: &str) -> Option<SetupFn> {
        self.entries
            .iter()
            .find(|e| e.info.name == name)
            .map(|e| e.setup.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.info.name == name)
    }

    /// List all registered directives, in execution order
    pub fn list(&self) -> Vec<PluginInfo> {
        self.entries.iter().map(|e| e.info.clone()).collect()
    }

    /// Run setup for every directive of `block` and chain the results
    pub fn build_site(&self, file: &str, block: &ServerBlock) -> Result<SiteSetup, SetupError> {
        if let Some(unknown) = block.directives.iter().find(|d| !self.contains(&d.name)) {
            let (line, span) = unknown
                .tokens
                .first()
                .map(|t| (t.line, t.span))
                .unwrap_or_default();
            return Err(SetupError::UnknownDirective {
                name: unknown.name.clone(),
                line,
                span,
            });
        }

        let addresses = block
            .addresses
            .iter()
            .map(|t| {
                t.text.parse::<SiteAddress>().map_err(|reason| SetupError::Address {
                    address: t.text.clone(),
                    reason,
                    line: t.line,
                    span: t.span,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let names: Vec<String> = block.address_names().into_iter().map(String::from).collect();

        let mut middlewares = Vec::new();
        let mut adapted = Vec::new();
        for entry in &self.entries {
            let Some(dispenser) = block.dispenser(file, &entry.info.name) else {
                continue;
            };
            let mut controller = Controller::new(&entry.info.name, names.clone(), dispenser);
            middlewares.push((entry.setup)(&mut controller)?);
            tracing::debug!("Set up {} for {}", entry.info.name, names.join(", "));

            if let Some(config) = controller.take_adapted() {
                adapted.push((entry.info.name.clone(), config));
            }
        }

        Ok(SiteSetup {
            addresses,
            handler: chain(&middlewares, Arc::new(NotFound)),
            adapted,
        })
    }
}
