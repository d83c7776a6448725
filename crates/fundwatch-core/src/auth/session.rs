use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Credential file name in cache directory
pub const CREDENTIAL_FILE: &str = "portal.json";

/// Token lifetime in seconds (one week).
pub const TOKEN_EXPIRY_SECS: f64 = 604_800.0;

/// Current wall-clock time as fractional unix seconds.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Unix time of the login that issued `token`.
    #[serde(rename = "referenceTime", default)]
    pub reference_time: f64,
    pub token: String,
}

impl Credential {
    pub fn new(token: String) -> Self {
        Self {
            token,
            reference_time: unix_now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        CredentialCache::is_expired(self.reference_time, unix_now())
    }
}

/// Single-token cache persisted as `<cache_dir>/portal.json`.
///
/// There is no cross-process locking; concurrent runs race and the last
/// writer wins. Writes go through a temp file and a rename so a reader
/// never sees a half-written document.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    cache_dir: PathBuf,
}

impl CredentialCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(CREDENTIAL_FILE)
    }

    /// True once `|now - acquired_at|` reaches one week. The difference is
    /// absolute, so a clock set back by a week also expires the token.
    pub fn is_expired(acquired_at: f64, now: f64) -> bool {
        (now - acquired_at).abs() >= TOKEN_EXPIRY_SECS
    }

    /// Load the stored credential. Missing or unreadable files count as absent.
    pub fn read(&self) -> Option<Credential> {
        let path = self.path();
        if !path.exists() {
            debug!(path = %path.display(), "No cached credential");
            return None;
        }

        match Self::read_file(&path) {
            Ok(credential) => Some(credential),
            Err(e) => {
                let message = format!("{:#}", e);
                warn!(path = %path.display(), error = %message, "Ignoring unreadable credential cache");
                None
            }
        }
    }

    fn read_file(path: &Path) -> Result<Credential> {
        let contents = std::fs::read_to_string(path)
            .context("Failed to read credential file")?;
        serde_json::from_str(&contents).context("Failed to parse credential file")
    }

    /// Persist the credential, replacing any earlier one
    pub fn write(&self, credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("Failed to create cache directory {}", self.cache_dir.display())
        })?;

        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string(credential)?;
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(path = %path.display(), "Credential cached");
        Ok(())
    }

    /// Remove the cached credential if present
    pub fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            debug!(path = %path.display(), "Credential cleared");
        }
        Ok(())
    }
}
