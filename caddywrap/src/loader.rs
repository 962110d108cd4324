//! Caddyfile loading
//!
//! Reads a Caddyfile, sets up every server block with the directive registry
//! and groups the resulting sites by the address they listen on.

use caddywrap_config::{ParseError, render};
use caddywrap_core::server::VirtualHosts;
use caddywrap_plugin::{DirectiveRegistry, SetupError, SiteSetup};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Loading errors keep the source so they can be reported against it
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{file}: {error}")]
    Parse {
        file: String,
        text: String,
        error: ParseError,
    },

    #[error("{file}: {error}")]
    Setup {
        file: String,
        text: String,
        error: SetupError,
    },

    #[error("{file}: no sites defined")]
    Empty { file: String },
}

impl LoadError {
    /// Human-readable report, with the offending source excerpt when known
    pub fn report(&self) -> String {
        match self {
            LoadError::Parse { file, text, error } => {
                render(file, text, &error.to_string(), Some(error.location()))
            }
            LoadError::Setup { file, text, error } => {
                render(file, text, &error.to_string(), error.location())
            }
            LoadError::Io { .. } | LoadError::Empty { .. } => format!("Error: {}", self),
        }
    }
}

/// Load and set up every site of the Caddyfile at `path`
pub fn load(path: &Path, registry: &DirectiveRegistry) -> Result<Vec<SiteSetup>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_str(&path.display().to_string(), text, registry)
}

pub fn load_str(
    file: &str,
    text: String,
    registry: &DirectiveRegistry,
) -> Result<Vec<SiteSetup>, LoadError> {
    let blocks = match caddywrap_config::parse(&text) {
        Ok(blocks) => blocks,
        Err(error) => {
            return Err(LoadError::Parse {
                file: file.to_string(),
                text,
                error,
            });
        }
    };
    if blocks.is_empty() {
        return Err(LoadError::Empty {
            file: file.to_string(),
        });
    }

    let mut sites = Vec::with_capacity(blocks.len());
    for block in &blocks {
        match registry.build_site(file, block) {
            Ok(site) => {
                tracing::info!(
                    "Site {} ready ({} directive(s))",
                    block.address_names().join(", "),
                    block.directives.len()
                );
                sites.push(site);
            }
            Err(error) => {
                return Err(LoadError::Setup {
                    file: file.to_string(),
                    text,
                    error,
                });
            }
        }
    }
    Ok(sites)
}

/// Group sites by bind address; each listener dispatches on the Host header
pub fn listeners(sites: &[SiteSetup]) -> BTreeMap<SocketAddr, VirtualHosts> {
    let mut listeners: BTreeMap<SocketAddr, VirtualHosts> = BTreeMap::new();
    for site in sites {
        for address in &site.addresses {
            listeners
                .entry(address.bind_addr())
                .or_default()
                .add(&address.host, site.handler.clone());
        }
    }
    listeners
}
