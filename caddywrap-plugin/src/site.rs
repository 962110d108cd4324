//! Site addresses

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// A parsed `[scheme://][host][:port]` site address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    pub scheme: Option<String>,
    /// Host to match; empty matches every host
    pub host: String,
    pub port: u16,
}

impl SiteAddress {
    pub const DEFAULT_PORT: u16 = 2015;

    /// Address the listener for this site binds
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        };
        SocketAddr::new(ip, self.port)
    }
}

impl FromStr for SiteAddress {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = match input.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
            None => (None, input),
        };

        if rest.contains('/') {
            return Err("paths are not supported in site addresses".to_string());
        }

        let (host, port) = split_host_port(rest)?;
        let port = match (port, scheme.as_deref()) {
            (Some(port), _) => port
                .parse::<u16>()
                .map_err(|e| format!("bad port '{}': {}", port, e))?,
            (None, Some("http")) => 80,
            (None, Some("https")) => 443,
            (None, Some(other)) => return Err(format!("unsupported scheme '{}'", other)),
            (None, None) => Self::DEFAULT_PORT,
        };

        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
        })
    }
}

fn split_host_port(s: &str) -> Result<(&str, Option<&str>), String> {
    if let Some(rest) = s.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| "missing ']' in IPv6 address".to_string())?;
        return match after {
            "" => Ok((host, None)),
            _ => match after.strip_prefix(':') {
                Some(port) => Ok((host, Some(port))),
                None => Err(format!("unexpected '{}' after IPv6 address", after)),
            },
        };
    }

    match s.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Ok((host, Some(port))),
        Some(_) => Err("IPv6 addresses must be in brackets".to_string()),
        None => Ok((s, None)),
    }
}

impl fmt::Display for SiteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}://", scheme)?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
