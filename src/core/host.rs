use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A target machine commands are run against.
///
/// Parsed from the `user@host[:port]` form used by the `hosts` list in the
/// settings file and by `--host` flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub user: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl Host {
    /// A host that routes every command to local execution.
    pub fn local() -> Self {
        Self {
            user: std::env::var("USER").unwrap_or_else(|_| "root".to_string()),
            host: "localhost".to_string(),
            port: 22,
            identity_file: None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }

    /// Label used to tag multiplexed output lines, e.g. `deploy@example.com`.
    pub fn label(&self) -> String {
        if self.is_local() {
            "localhost".to_string()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty()
    }

    pub fn with_identity_file(mut self, identity_file: Option<String>) -> Self {
        self.identity_file = identity_file;
        self
    }
}

impl FromStr for Host {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let (user, rest) = spec
            .split_once('@')
            .ok_or_else(|| Error::host_invalid(spec, "missing '@' between user and host"))?;

        if user.is_empty() {
            return Err(Error::host_invalid(spec, "empty user"));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::host_invalid(spec, format!("invalid port '{}'", port))
                })?;
                (host, port)
            }
            None => (rest, 22),
        };

        if host.is_empty() {
            return Err(Error::host_invalid(spec, "empty host"));
        }

        Ok(Host {
            user: user.to_string(),
            host: host.to_string(),
            port,
            identity_file: None,
        })
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.port != 22 {
            write!(f, "{}@{}:{}", self.user, self.host, self.port)
        } else {
            write!(f, "{}@{}", self.user, self.host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_host() {
        let host: Host = "deploy@alpha.example.com".parse().unwrap();
        assert_eq!(host.user, "deploy");
        assert_eq!(host.host, "alpha.example.com");
        assert_eq!(host.port, 22);
    }

    #[test]
    fn parses_explicit_port() {
        let host: Host = "deploy@alpha.example.com:2222".parse().unwrap();
        assert_eq!(host.port, 2222);
        assert_eq!(host.to_string(), "deploy@alpha.example.com:2222");
    }

    #[test]
    fn rejects_missing_user() {
        assert!("alpha.example.com".parse::<Host>().is_err());
        assert!("@alpha.example.com".parse::<Host>().is_err());
    }

    #[test]
    fn rejects_bad_port() {
        assert!("deploy@alpha:notaport".parse::<Host>().is_err());
    }

    #[test]
    fn localhost_routes_local() {
        let host: Host = "me@localhost".parse().unwrap();
        assert!(host.is_local());
        assert_eq!(host.label(), "localhost");
    }
}
