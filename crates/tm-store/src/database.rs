use std::path::{Path, PathBuf};
use std::{env, fs};

use tm_core::{Collection, export_json, import_json};

use crate::error::{Result, StoreError};

/// Snapshot file name inside the data directory.
pub const DATABASE_FILE: &str = "db.json";

/// Default data directory: `~/.timemarks`.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".timemarks")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// True when `path` does not exist or is an empty directory.
pub fn is_absent_or_empty_dir(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if !path.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path).map_err(io_err(path))?;
    Ok(entries.next().is_none())
}

/// A collection bound to its data directory.
///
/// Layout:
/// ```text
/// <base_dir>/
/// └── db.json
/// ```
pub struct Database {
    dir: PathBuf,
    collection: Collection,
}

impl Database {
    /// Create the data directory (if needed) and write an empty snapshot.
    /// Refuses anything but an absent location or an empty directory.
    pub fn init(base_dir: &Path) -> Result<Self> {
        if !is_absent_or_empty_dir(base_dir)? {
            return Err(StoreError::NotEmpty(base_dir.to_path_buf()));
        }
        fs::create_dir_all(base_dir).map_err(io_err(base_dir))?;

        let db = Self {
            dir: base_dir.to_path_buf(),
            collection: Collection::new(),
        };
        db.write()?;
        tracing::info!("initialized database at {}", base_dir.display());
        Ok(db)
    }

    /// Open an existing data directory. With `auto_init`, an absent or empty
    /// location is initialized first.
    pub fn open(base_dir: &Path, auto_init: bool) -> Result<Self> {
        if auto_init && is_absent_or_empty_dir(base_dir)? {
            return Self::init(base_dir);
        }
        let collection = read_db(base_dir)?;
        tracing::debug!(
            "opened {} with {} markers",
            base_dir.display(),
            collection.len()
        );
        Ok(Self {
            dir: base_dir.to_path_buf(),
            collection,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(DATABASE_FILE)
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }

    /// Serialize the collection back to the snapshot file.
    pub fn write(&self) -> Result<()> {
        let path = self.snapshot_path();
        let json = export_json(&self.collection)?;
        fs::write(&path, json).map_err(io_err(&path))?;
        tracing::debug!(
            "wrote {} markers to {}",
            self.collection.len(),
            path.display()
        );
        Ok(())
    }
}

fn read_db(base_dir: &Path) -> Result<Collection> {
    let path = base_dir.join(DATABASE_FILE);
    if !path.is_file() {
        return Err(StoreError::MissingSnapshot(path));
    }
    let json = fs::read_to_string(&path).map_err(io_err(&path))?;
    Ok(import_json(&json)?)
}
