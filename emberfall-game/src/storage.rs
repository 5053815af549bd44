//! Byte-level persistence behind the save pipeline.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{
    BACKUP_DIR_NAME, BACKUP_EXTENSION, BACKUP_PREFIX, BACKUP_RETENTION, KEY_FILE_NAME,
    SAVE_FILE_NAME, SAVE_TEMP_SUFFIX, SETTINGS_FILE_NAME,
};

/// Key/value persistence used by [`crate::save::SavePipeline`].
///
/// Implementations only move bytes; integrity and encryption live in the
/// pipeline.
pub trait SaveStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the primary save, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary exists but cannot be read.
    fn load_snapshot(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Replace the primary save. Readers never observe a partial write.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be durably stored.
    fn store_snapshot(&self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Every retained backup, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup area cannot be listed.
    fn load_backups(&self) -> Result<Vec<Vec<u8>>, Self::Error>;

    /// Newest backup, if any.
    ///
    /// # Errors
    ///
    /// Same as [`SaveStore::load_backups`].
    fn load_backup(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.load_backups()?.into_iter().next())
    }

    /// Append a backup, dropping the oldest beyond the retention limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup cannot be written.
    fn push_backup(&self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the key exists but cannot be read.
    fn load_key(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Persist the encryption key where other users cannot read it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be written.
    fn store_key(&self, key: &[u8]) -> Result<(), Self::Error>;

    /// Mirror the plaintext settings JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written.
    fn store_settings(&self, json: &str) -> Result<(), Self::Error>;

    /// Remove the primary save and all backups. The key is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if existing files cannot be removed.
    fn clear(&self) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store rejected the write")]
    Unavailable,
}

impl StoreError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory-backed store.
///
/// Layout: `save.bin`, `save.bin.tmp` (transient), `settings.json`, `.key`
/// and `backups/save-<seq>.bin`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn save_path(&self) -> PathBuf {
        self.root.join(SAVE_FILE_NAME)
    }

    fn temp_path(&self) -> PathBuf {
        self.root
            .join(format!("{SAVE_FILE_NAME}.{SAVE_TEMP_SUFFIX}"))
    }

    #[must_use]
    pub fn key_path(&self) -> PathBuf {
        self.root.join(KEY_FILE_NAME)
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR_NAME)
    }

    fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(StoreError::io(dir))
    }

    fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(path)(err)),
        }
    }

    /// Write to a sibling temp file, fsync, then rename over `target`.
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        Self::ensure_dir(&self.root)?;
        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(StoreError::io(&temp))?;
        file.write_all(bytes).map_err(StoreError::io(&temp))?;
        file.sync_all().map_err(StoreError::io(&temp))?;
        drop(file);
        fs::rename(&temp, target).map_err(StoreError::io(target))
    }

    fn backup_name(seq: u64) -> String {
        format!("{BACKUP_PREFIX}{seq:06}.{BACKUP_EXTENSION}")
    }

    fn backup_seq(path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        name.strip_prefix(BACKUP_PREFIX)?
            .strip_suffix(BACKUP_EXTENSION)?
            .strip_suffix('.')?
            .parse()
            .ok()
    }

    /// Backup files sorted newest first.
    fn backup_files(&self) -> Result<Vec<(u64, PathBuf)>, StoreError> {
        let dir = self.backup_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&dir)(err)),
        };
        let mut files: Vec<(u64, PathBuf)> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter_map(|path| Self::backup_seq(&path).map(|seq| (seq, path)))
            .collect();
        files.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(files)
    }
}

impl SaveStore for FileStore {
    type Error = StoreError;

    fn load_snapshot(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_optional(&self.save_path())
    }

    fn store_snapshot(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.write_atomic(&self.save_path(), bytes)
    }

    fn load_backups(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut backups = Vec::new();
        for (_, path) in self.backup_files()? {
            match fs::read(&path) {
                Ok(bytes) => backups.push(bytes),
                Err(err) => log::warn!("skipping unreadable backup {}: {err}", path.display()),
            }
        }
        Ok(backups)
    }

    fn push_backup(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = self.backup_dir();
        Self::ensure_dir(&dir)?;
        let existing = self.backup_files()?;
        let next = existing.first().map_or(1, |(seq, _)| seq + 1);
        let path = dir.join(Self::backup_name(next));
        fs::write(&path, bytes).map_err(StoreError::io(&path))?;
        for (_, stale) in existing.iter().skip(BACKUP_RETENTION.saturating_sub(1)) {
            fs::remove_file(stale).map_err(StoreError::io(stale))?;
        }
        Ok(())
    }

    fn load_key(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_optional(&self.key_path())
    }

    fn store_key(&self, key: &[u8]) -> Result<(), StoreError> {
        Self::ensure_dir(&self.root)?;
        let path = self.key_path();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(crate::constants::KEY_FILE_MODE);
        }
        let mut file = options.open(&path).map_err(StoreError::io(&path))?;
        file.write_all(key).map_err(StoreError::io(&path))?;
        file.sync_all().map_err(StoreError::io(&path))
    }

    fn store_settings(&self, json: &str) -> Result<(), StoreError> {
        Self::ensure_dir(&self.root)?;
        let path = self.settings_path();
        fs::write(&path, json).map_err(StoreError::io(&path))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let primary = self.save_path();
        match fs::remove_file(&primary) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io(&primary)(err)),
        }
        for (_, path) in self.backup_files()? {
            fs::remove_file(&path).map_err(StoreError::io(&path))?;
        }
        Ok(())
    }
}

/// In-process store for tests and hosts without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    primary: RefCell<Option<Vec<u8>>>,
    backups: RefCell<VecDeque<Vec<u8>>>,
    key: RefCell<Option<Vec<u8>>>,
    settings: RefCell<Option<String>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Overwrite the primary bytes directly, bypassing the pipeline.
    pub fn replace_primary(&self, bytes: Option<Vec<u8>>) {
        *self.primary.borrow_mut() = bytes;
    }

    #[must_use]
    pub fn primary(&self) -> Option<Vec<u8>> {
        self.primary.borrow().clone()
    }

    #[must_use]
    pub fn settings(&self) -> Option<String> {
        self.settings.borrow().clone()
    }

    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.backups.borrow().len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl SaveStore for MemoryStore {
    type Error = StoreError;

    fn load_snapshot(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.primary())
    }

    fn store_snapshot(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.primary.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }

    fn load_backups(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.backups.borrow().iter().cloned().collect())
    }

    fn push_backup(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut backups = self.backups.borrow_mut();
        backups.push_front(bytes.to_vec());
        backups.truncate(BACKUP_RETENTION);
        Ok(())
    }

    fn load_key(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.key.borrow().clone())
    }

    fn store_key(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.key.borrow_mut() = Some(key.to_vec());
        Ok(())
    }

    fn store_settings(&self, json: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.settings.borrow_mut() = Some(json.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.primary.borrow_mut() = None;
        self.backups.borrow_mut().clear();
        Ok(())
    }
}

impl<T: SaveStore + ?Sized> SaveStore for &T {
    type Error = T::Error;

    fn load_snapshot(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        (**self).load_snapshot()
    }

    fn store_snapshot(&self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).store_snapshot(bytes)
    }

    fn load_backups(&self) -> Result<Vec<Vec<u8>>, Self::Error> {
        (**self).load_backups()
    }

    fn push_backup(&self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).push_backup(bytes)
    }

    fn load_key(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        (**self).load_key()
    }

    fn store_key(&self, key: &[u8]) -> Result<(), Self::Error> {
        (**self).store_key(key)
    }

    fn store_settings(&self, json: &str) -> Result<(), Self::Error> {
        (**self).store_settings(json)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        (**self).clear()
    }
}
