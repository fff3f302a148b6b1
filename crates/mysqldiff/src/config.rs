//! Command-line configuration values.

use std::fmt;
use std::str::FromStr;

use crate::error::DiffError;

/// Port used when an address omits one.
pub const DEFAULT_PORT: u16 = 3306;

/// A server address in `user:password@host:port` form.
///
/// The password may contain `:` and `@`; the host part starts after the
/// last `@`.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// User name.
    pub user: String,
    /// Password, possibly empty.
    pub password: String,
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl FromStr for ServerAddress {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DiffError::InvalidAddress(s.to_string());

        let (credentials, endpoint) = s.rsplit_once('@').ok_or_else(invalid)?;
        let (user, password) = credentials.split_once(':').unwrap_or((credentials, ""));
        let (host, port) = match endpoint.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
            None => (endpoint, DEFAULT_PORT),
        };
        if user.is_empty() || host.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:***@{}:{}", self.user, self.host, self.port)
    }
}

impl fmt::Debug for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerAddress")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// A `source_db:target_db` pair. A single name is used for both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabasePair {
    /// Schema read from the source server.
    pub source: String,
    /// Schema read from the target server.
    pub target: String,
}

impl FromStr for DatabasePair {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s.split_once(':').unwrap_or((s, s));
        if source.is_empty() || target.is_empty() || target.contains(':') {
            return Err(DiffError::InvalidDatabasePair(s.to_string()));
        }
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
        })
    }
}
