//! Filesystem credential store.
//!
//! One namespace directory holds two fixed-size blob files keyed `ssid`
//! (32 bytes) and `password` (64 bytes), null-padded, mirroring the radio's
//! credential buffers byte for byte. Each blob is written to a temp file and
//! renamed into place, so a crashed save never leaves a truncated blob
//! behind; `load` additionally rejects any blob whose size is off.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;
use crate::credentials::{PASSWORD_LEN, SSID_LEN, StaCredentials};
use crate::traits::CredentialStore;

const SSID_KEY: &str = "ssid";
const PASSWORD_KEY: &str = "password";

pub struct FsCredentialStore {
    namespace: PathBuf,
}

impl FsCredentialStore {
    /// A store rooted at the namespace directory `namespace`. The directory
    /// is created on first save.
    pub fn new(namespace: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &Path {
        &self.namespace
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.namespace.join(key)
    }

    fn read_blob<const N: usize>(&self, key: &str) -> Option<[u8; N]> {
        // 尺寸不对视为损坏 → 无凭据
        let data = fs::read(self.blob_path(key)).ok()?;
        data.try_into().ok()
    }

    fn write_blob(&self, key: &str, data: &[u8]) -> std::io::Result<()> {
        let tmp = self.blob_path(&format!("{key}.tmp"));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, self.blob_path(key))
    }
}

#[async_trait]
impl CredentialStore for FsCredentialStore {
    async fn load(&self) -> Option<StaCredentials> {
        let ssid = self.read_blob::<SSID_LEN>(SSID_KEY)?;
        let password = self.read_blob::<PASSWORD_LEN>(PASSWORD_KEY)?;
        Some(StaCredentials::from_raw(ssid, password))
    }

    async fn save(&self, credentials: &StaCredentials) -> Result<()> {
        fs::create_dir_all(&self.namespace)?;
        // password first: a pair is only loadable once the ssid blob lands
        self.write_blob(PASSWORD_KEY, credentials.password_bytes())?;
        self.write_blob(SSID_KEY, credentials.ssid_bytes())?;
        tracing::debug!(namespace = %self.namespace.display(), "Credentials saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        tracing::debug!(namespace = %self.namespace.display(), "Clearing credentials");
        match fs::remove_dir_all(&self.namespace) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
