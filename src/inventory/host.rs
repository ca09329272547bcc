// file: src/inventory/host.rs
// version: 1.0.0
// guid: 7f4a9c21-3d6e-4b08-b5a1-2e9d8c4f6a13

//! Login identity and connection details for a single host

use std::fmt;

/// Port used when an inventory entry does not name one
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Login identity for one host
///
/// The password is kept even when a private key is used for login, since
/// privilege escalation prompts on the remote side still ask for it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    user: String,
    password: String,
    key_ref: Option<String>,
}

impl Credential {
    /// Create a password-only credential
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            key_ref: None,
        }
    }

    /// Create a credential that logs in with a private key file
    pub fn with_key(
        user: impl Into<String>,
        password: impl Into<String>,
        key_ref: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            key_ref: Some(key_ref.into()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn key_ref(&self) -> Option<&str> {
        self.key_ref.as_deref()
    }

    /// Whether login uses a private key instead of the password
    pub fn uses_key(&self) -> bool {
        self.key_ref.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("key_ref", &self.key_ref)
            .finish()
    }
}

/// A managed host and how to reach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    address: String,
    credential: Credential,
    port: u16,
}

impl Host {
    /// Create a host on the default SSH port
    pub fn new(address: impl Into<String>, credential: Credential) -> Self {
        Self::with_port(address, credential, DEFAULT_SSH_PORT)
    }

    /// Create a host on an explicit port
    pub fn with_port(address: impl Into<String>, credential: Credential, port: u16) -> Self {
        Self {
            address: address.into(),
            credential,
            port,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `address:port` form used to open the TCP connection
    pub fn socket_addr(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}
