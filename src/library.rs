//! File library: a catalog store plus the payload files it describes.
//!
//! Each record's bytes are copied to `<home>/<id>`; the store never sees them.

use crate::config::{db_path, ensure_home};
use crate::store::Store;
use crate::tags::{StoreFilterExt, validate_tag};
use crate::types::File;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::io::ErrorKind;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// A catalog rooted at a home directory.
pub struct Library {
    home: PathBuf,
    store: Store,
}

impl Library {
    /// Open the library in `home`, creating the directory and database if needed.
    pub fn open(home: &Path) -> Result<Self> {
        ensure_home(home)?;
        let store = Store::open_at(db_path(home)).context("Failed to open catalog database")?;

        Ok(Self {
            home: home.to_path_buf(),
            store,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    fn payload_path(&self, id: i64) -> PathBuf {
        self.home.join(id.to_string())
    }

    /// Where the bytes of record `id` live.
    pub fn file_path(&self, id: i64) -> Result<PathBuf> {
        self.store.get_file(id)?;
        Ok(self.payload_path(id))
    }

    /// Copy `path` into the library under a new record titled with its
    /// file name, then attach `tags`.
    pub fn add_file<S: AsRef<str>>(&mut self, path: &Path, tags: &[S]) -> Result<File> {
        for tag in tags {
            validate_tag(tag.as_ref()).map_err(crate::Error::from)?;
        }

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| eyre::eyre!("No file name in {}", path.display()))?;

        let id = self.store.new_file(&title).context("Failed to create file record")?;
        let dest = self.payload_path(id);

        if let Err(e) = fs::copy(path, &dest) {
            // Copy failed, the record must not outlive it
            if let Err(cleanup) = self.store.delete_file(id) {
                warn!("Failed to drop record {} after copy error: {}", id, cleanup);
            }
            match fs::remove_file(&dest) {
                Ok(()) => {}
                Err(gone) if gone.kind() == ErrorKind::NotFound => {}
                Err(gone) => warn!("Failed to remove partial payload {}: {}", dest.display(), gone),
            }
            return Err(e).with_context(|| format!("Failed to copy {} to {}", path.display(), dest.display()));
        }

        for tag in tags {
            self.store
                .add_tag(id, tag.as_ref())
                .with_context(|| format!("Failed to tag {} with '{}'", id, tag.as_ref()))?;
        }

        info!("Added {} as {}", path.display(), id);
        Ok(File { id, title })
    }

    /// Delete record `id` and its payload. A payload that is already gone is
    /// not an error.
    pub fn remove_file(&mut self, id: i64) -> Result<File> {
        let file = self.store.get_file(id)?;
        let path = self.payload_path(id);

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Payload {} already missing, removing record anyway", path.display());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }

        self.store.delete_file(id)?;
        info!("Removed {}", id);
        Ok(file)
    }

    /// Stream every file matching the filter list.
    pub fn list<S: AsRef<str>>(&self, filters: &[S], sink: impl FnMut(&File) -> ControlFlow<()>) -> Result<()> {
        self.store.list_files_matching(filters, sink)?;
        Ok(())
    }

    /// Close the underlying store.
    pub fn close(mut self) -> Result<()> {
        self.store.close().context("Failed to close catalog database")
    }
}
