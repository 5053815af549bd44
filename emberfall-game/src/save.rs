//! Save integrity pipeline: checksum, encrypt, atomic store, rolling
//! backups, recovery, and plaintext export for cloud transfer.
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::constants::{DEFAULT_PLAYER_NAME, SNAPSHOT_VERSION};
use crate::crypto::{self, CryptoError, SaveKey};
use crate::snapshot::Snapshot;
use crate::storage::SaveStore;

/// Where a corrupted payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionStage {
    Decrypt,
    Parse,
    Checksum,
}

impl fmt::Display for CorruptionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decrypt => "decrypt",
            Self::Parse => "parse",
            Self::Checksum => "checksum",
        })
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save data is corrupted at the {stage} stage")]
    Corrupted { stage: CorruptionStage },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("save schema {found} is newer than supported schema {supported}")]
    SchemaMismatch { found: u32, supported: u32 },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl SaveError {
    fn storage<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::StorageUnavailable(Box::new(err))
    }

    const fn corrupted(stage: CorruptionStage) -> Self {
        Self::Corrupted { stage }
    }
}

/// Which copy a load was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    /// Position in the newest-first backup list.
    Backup(usize),
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub snapshot: Snapshot,
    pub source: LoadSource,
    /// The primary should be rewritten from `snapshot` at the next commit.
    pub rewrite_scheduled: bool,
}

/// Canonical serialisation: compact JSON in declaration order.
///
/// # Errors
///
/// Returns `Serialization` if the snapshot cannot be encoded.
pub fn canonical_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, SaveError> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// SHA-256 over the canonical form with the checksum field blanked.
///
/// # Errors
///
/// Returns `Serialization` if the snapshot cannot be encoded.
pub fn compute_checksum(snapshot: &Snapshot) -> Result<String, SaveError> {
    let mut unsigned = snapshot.clone();
    unsigned.checksum.clear();
    Ok(crypto::sha256_hex(&canonical_bytes(&unsigned)?))
}

fn seal(snapshot: &mut Snapshot) -> Result<Vec<u8>, SaveError> {
    snapshot.checksum = compute_checksum(snapshot)?;
    canonical_bytes(snapshot)
}

/// The one field every schema agrees on.
#[derive(Deserialize)]
struct SchemaHeader {
    #[serde(default)]
    version: u32,
}

/// Check the schema version, then parse plaintext and verify its embedded
/// checksum. A newer record is reported before any field it adds is lost to
/// parsing.
fn verify_plaintext(plaintext: &[u8]) -> Result<Snapshot, SaveError> {
    let header: SchemaHeader = serde_json::from_slice(plaintext)
        .map_err(|_| SaveError::corrupted(CorruptionStage::Parse))?;
    if header.version > SNAPSHOT_VERSION {
        return Err(SaveError::SchemaMismatch {
            found: header.version,
            supported: SNAPSHOT_VERSION,
        });
    }
    let snapshot: Snapshot = serde_json::from_slice(plaintext)
        .map_err(|_| SaveError::corrupted(CorruptionStage::Parse))?;
    if compute_checksum(&snapshot)? != snapshot.checksum {
        return Err(SaveError::corrupted(CorruptionStage::Checksum));
    }
    Ok(snapshot)
}

/// Decrypt and verify a stored record.
///
/// # Errors
///
/// Returns `Corrupted` at the stage that failed, or `SchemaMismatch`.
pub fn decode(key: &SaveKey, bytes: &[u8]) -> Result<Snapshot, SaveError> {
    let plaintext =
        crypto::decrypt(key, bytes).map_err(|_| SaveError::corrupted(CorruptionStage::Decrypt))?;
    verify_plaintext(&plaintext)
}

/// Stamp, seal, encrypt and store `snapshot`, then rotate the previous
/// primary into the backups and mirror settings. A corrupt previous primary
/// is dropped; one from a newer schema is kept as a backup.
///
/// Returns the snapshot exactly as written. `snapshot` itself is untouched,
/// so a failed write leaves the caller's copy authoritative.
///
/// # Errors
///
/// Returns `StorageUnavailable` when the primary cannot be stored, and
/// `Serialization`/`Crypto` when sealing fails.
pub fn persist<S: SaveStore>(
    store: &S,
    key: &SaveKey,
    snapshot: &Snapshot,
    now: i64,
) -> Result<Snapshot, SaveError> {
    let previous = match store.load_snapshot() {
        Ok(bytes) => bytes.filter(|bytes| {
            !matches!(decode(key, bytes), Err(SaveError::Corrupted { .. }))
        }),
        Err(err) => {
            log::warn!("previous save unreadable, skipping backup: {err}");
            None
        }
    };

    let mut written = snapshot.clone();
    written.last_saved = now;
    written.save_count = written.save_count.saturating_add(1);
    written.version = written.version.max(SNAPSHOT_VERSION);
    let plaintext = seal(&mut written)?;
    let sealed = crypto::encrypt(key, &plaintext)?;

    store.store_snapshot(&sealed).map_err(|err| {
        log::error!("save write failed: {err}");
        SaveError::storage(err)
    })?;
    log::debug!(
        "saved snapshot #{} ({} bytes)",
        written.save_count,
        sealed.len()
    );

    if let Some(previous) = previous
        && let Err(err) = store.push_backup(&previous)
    {
        log::warn!("backup rotation failed: {err}");
    }
    match serde_json::to_string_pretty(&written.settings) {
        Ok(json) => {
            if let Err(err) = store.store_settings(&json) {
                log::warn!("settings mirror failed: {err}");
            }
        }
        Err(err) => log::warn!("settings mirror failed: {err}"),
    }
    Ok(written)
}

/// Owns a [`SaveStore`] and the key used to seal it.
#[derive(Debug)]
pub struct SavePipeline<S: SaveStore> {
    store: S,
    key: Option<SaveKey>,
    device: String,
    /// Newer schema seen on load; writes are refused while set.
    blocked_version: Option<u32>,
    allow_overwrite: bool,
}

impl<S: SaveStore> SavePipeline<S> {
    #[must_use]
    pub fn new(store: S, device: &str) -> Self {
        Self {
            store,
            key: None,
            device: device.to_string(),
            blocked_version: None,
            allow_overwrite: false,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Permit replacing a save written by a newer schema.
    pub const fn allow_overwrite(&mut self) {
        self.allow_overwrite = true;
        self.blocked_version = None;
    }

    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.blocked_version.is_some()
    }

    /// # Errors
    ///
    /// Returns `SchemaMismatch` while a newer save is protected.
    pub fn check_writable(&self) -> Result<(), SaveError> {
        match self.blocked_version {
            Some(found) => {
                log::error!("refusing to overwrite schema {found} save");
                Err(SaveError::SchemaMismatch {
                    found,
                    supported: SNAPSHOT_VERSION,
                })
            }
            None => Ok(()),
        }
    }

    /// Load the persisted key, creating and storing one on first use.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the key cannot be read or written.
    pub fn key(&mut self) -> Result<SaveKey, SaveError> {
        if let Some(key) = self.key {
            return Ok(key);
        }
        let stored = self.store.load_key().map_err(SaveError::storage)?;
        let key = match stored.as_deref().map(crypto::key_from_bytes) {
            Some(Ok(key)) => key,
            Some(Err(err)) => {
                log::warn!("stored key rejected ({err}); generating a new key");
                self.create_key()?
            }
            None => self.create_key()?,
        };
        self.key = Some(key);
        Ok(key)
    }

    fn create_key(&self) -> Result<SaveKey, SaveError> {
        let key = crypto::generate_key();
        self.store.store_key(&key).map_err(|err| {
            log::error!("key write failed: {err}");
            SaveError::storage(err)
        })?;
        Ok(key)
    }

    /// Persist `snapshot`, returning the record as written.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` while a newer save is protected, otherwise
    /// the errors of [`persist`].
    pub fn write(&mut self, snapshot: &Snapshot, now: i64) -> Result<Snapshot, SaveError> {
        self.check_writable()?;
        let key = self.key()?;
        persist(&self.store, &key, snapshot, now)
    }

    fn try_decode(
        &mut self,
        key: &SaveKey,
        bytes: &[u8],
        label: &str,
    ) -> Result<Snapshot, SaveError> {
        match decode(key, bytes) {
            Err(SaveError::SchemaMismatch { found, supported }) if !self.allow_overwrite => {
                log::error!("{label} written by schema {found}; this build supports {supported}");
                self.blocked_version = Some(found);
                Err(SaveError::SchemaMismatch { found, supported })
            }
            other => other,
        }
    }

    /// Load the primary, falling back to the newest valid backup and then
    /// to a fresh record.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` when the newest readable save comes from a
    /// newer schema and overwriting has not been allowed, and
    /// `StorageUnavailable` if no key can be obtained.
    pub fn read(&mut self, catalog: &Catalog, now: i64) -> Result<LoadReport, SaveError> {
        let key = self.key()?;
        let mut damaged = false;

        match self.store.load_snapshot() {
            Ok(Some(bytes)) => match self.try_decode(&key, &bytes, "primary save") {
                Ok(snapshot) => {
                    return Ok(Self::finish(
                        snapshot,
                        LoadSource::Primary,
                        false,
                        catalog,
                        now,
                    ));
                }
                Err(err @ SaveError::SchemaMismatch { .. }) if self.is_blocked() => return Err(err),
                Err(err) => {
                    log::warn!("primary save rejected: {err}");
                    damaged = true;
                }
            },
            Ok(None) => {}
            Err(err) => {
                log::warn!("primary save unreadable: {err}");
                damaged = true;
            }
        }

        let backups = self.store.load_backups().unwrap_or_else(|err| {
            log::warn!("backups unreadable: {err}");
            Vec::new()
        });
        for (index, bytes) in backups.iter().enumerate() {
            match self.try_decode(&key, bytes, "backup") {
                Ok(snapshot) => {
                    log::warn!("recovered save from backup {index}");
                    return Ok(Self::finish(
                        snapshot,
                        LoadSource::Backup(index),
                        true,
                        catalog,
                        now,
                    ));
                }
                Err(err @ SaveError::SchemaMismatch { .. }) if self.is_blocked() => return Err(err),
                Err(err) => log::warn!("backup {index} rejected: {err}"),
            }
        }

        if damaged || !backups.is_empty() {
            log::warn!("no valid save found; starting fresh");
        }
        let snapshot = Snapshot::new(catalog, DEFAULT_PLAYER_NAME, now, &self.device);
        let rewrite = damaged || !backups.is_empty();
        Ok(Self::finish(snapshot, LoadSource::Fresh, rewrite, catalog, now))
    }

    fn finish(
        mut snapshot: Snapshot,
        source: LoadSource,
        rewrite_scheduled: bool,
        catalog: &Catalog,
        now: i64,
    ) -> LoadReport {
        snapshot.normalize(catalog, now);
        LoadReport {
            snapshot,
            source,
            rewrite_scheduled,
        }
    }

    /// Plaintext JSON with an embedded checksum.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the snapshot cannot be encoded.
    pub fn export(&self, snapshot: &Snapshot) -> Result<Vec<u8>, SaveError> {
        export_plaintext(snapshot)
    }

    /// Accept an exported payload only if its checksum matches its body.
    ///
    /// # Errors
    ///
    /// Returns `Corrupted` for unparsable or tampered payloads and
    /// `SchemaMismatch` for newer schemas.
    pub fn import(&self, bytes: &[u8], catalog: &Catalog, now: i64) -> Result<Snapshot, SaveError> {
        import_plaintext(bytes, catalog, now)
    }

    /// Drop the primary and backups so the next write starts clean.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store cannot be cleared.
    pub fn reset(&mut self) -> Result<(), SaveError> {
        self.store.clear().map_err(SaveError::storage)?;
        self.blocked_version = None;
        Ok(())
    }
}

/// See [`SavePipeline::export`].
///
/// # Errors
///
/// Returns `Serialization` if the snapshot cannot be encoded.
pub fn export_plaintext(snapshot: &Snapshot) -> Result<Vec<u8>, SaveError> {
    let mut sealed = snapshot.clone();
    seal(&mut sealed)
}

/// See [`SavePipeline::import`].
///
/// # Errors
///
/// Returns `Corrupted` for unparsable or tampered payloads and
/// `SchemaMismatch` for newer schemas.
pub fn import_plaintext(bytes: &[u8], catalog: &Catalog, now: i64) -> Result<Snapshot, SaveError> {
    let mut snapshot = verify_plaintext(bytes)?;
    snapshot.normalize(catalog, now);
    Ok(snapshot)
}
