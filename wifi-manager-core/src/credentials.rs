//! Fixed-capacity station credential buffers.
//!
//! SSID and password live in null-padded byte arrays sized to what the radio
//! accepts, and the persistence layer round-trips them byte-identically,
//! padding included. The buffers are wiped on drop.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result};

/// Maximum SSID length accepted by the radio.
pub const SSID_LEN: usize = 32;
/// Maximum passphrase length accepted by the radio.
pub const PASSWORD_LEN: usize = 64;

/// One station credential pair.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StaCredentials {
    ssid: [u8; SSID_LEN],
    password: [u8; PASSWORD_LEN],
}

impl StaCredentials {
    /// Build a credential pair from UTF-8 pieces, null-padding both buffers.
    /// An empty password means an open network.
    pub fn new(ssid: &str, password: &str) -> Result<Self> {
        if ssid.len() > SSID_LEN {
            return Err(Error::CredentialTooLong {
                field: "ssid",
                len: ssid.len(),
                max: SSID_LEN,
            });
        }
        if password.len() > PASSWORD_LEN {
            return Err(Error::CredentialTooLong {
                field: "password",
                len: password.len(),
                max: PASSWORD_LEN,
            });
        }

        let mut out = Self {
            ssid: [0u8; SSID_LEN],
            password: [0u8; PASSWORD_LEN],
        };
        out.ssid[..ssid.len()].copy_from_slice(ssid.as_bytes());
        out.password[..password.len()].copy_from_slice(password.as_bytes());
        Ok(out)
    }

    /// Rehydrate a pair from raw persisted buffers, as-is.
    pub fn from_raw(ssid: [u8; SSID_LEN], password: [u8; PASSWORD_LEN]) -> Self {
        Self { ssid, password }
    }

    pub fn ssid_bytes(&self) -> &[u8; SSID_LEN] {
        &self.ssid
    }

    pub fn password_bytes(&self) -> &[u8; PASSWORD_LEN] {
        &self.password
    }

    /// SSID with the null padding trimmed off.
    pub fn ssid(&self) -> &str {
        str_until_nul(&self.ssid)
    }

    /// Passphrase with the null padding trimmed off.
    pub fn password(&self) -> &str {
        str_until_nul(&self.password)
    }
}

fn str_until_nul(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}

impl fmt::Debug for StaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 密码不打印
        f.debug_struct("StaCredentials")
            .field("ssid", &self.ssid())
            .field("password", &"********")
            .finish()
    }
}
