//! High-level store API for tagmage.

use crate::error::{Error, Result};
use crate::storage::{Stats, Storage};
use crate::tags::validate_tag;
use crate::types::{File, Location, validate_title};
use log::{debug, info};
use std::cell::RefCell;
use std::ops::ControlFlow;

/// The main tagmage store.
///
/// Owns at most one open connection. Every failing call records its message,
/// readable through [`Store::last_error`].
pub struct Store {
    storage: Option<Storage>,
    last_error: RefCell<Option<String>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// A store with no connection. Call [`Store::open`] before use.
    pub fn new() -> Self {
        Self {
            storage: None,
            last_error: RefCell::new(None),
        }
    }

    /// Open a store at `location`.
    pub fn open_at(location: impl Into<Location>) -> Result<Self> {
        let mut store = Self::new();
        store.open(location)?;
        Ok(store)
    }

    /// Open an ephemeral in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::open_at(Location::Memory)
    }

    /// Connect to `location`, closing any connection already held.
    pub fn open(&mut self, location: impl Into<Location>) -> Result<()> {
        let location = location.into();
        self.close()?;

        let storage = self.track(Storage::open(&location))?;
        info!("Opened store at {}", location);
        self.storage = Some(storage);
        Ok(())
    }

    /// Release the connection. Closing a closed store is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(storage) = self.storage.take() else {
            return Ok(());
        };

        match storage.close() {
            Ok(()) => Ok(()),
            Err((storage, err)) => {
                self.storage = Some(storage);
                self.track(Err(err))
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.storage.is_some()
    }

    pub fn location(&self) -> Option<&Location> {
        self.storage.as_ref().map(|s| s.location())
    }

    /// Message of the most recent failed call, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Record the error of a failed result, then pass it through.
    pub(crate) fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            debug!("Store call failed: {}", e);
            *self.last_error.borrow_mut() = Some(e.to_string());
        }
        result
    }

    fn storage(&self) -> Result<&Storage> {
        self.storage
            .as_ref()
            .ok_or_else(|| Error::Store("store is not open".to_string()))
    }

    fn storage_mut(&mut self) -> Result<&mut Storage> {
        self.storage
            .as_mut()
            .ok_or_else(|| Error::Store("store is not open".to_string()))
    }

    /// Create a file record and return its id.
    pub fn new_file(&mut self, title: &str) -> Result<i64> {
        let result = validate_title(title)
            .map_err(Error::from)
            .and_then(|_| self.storage()?.insert_file(title));
        self.track(result)
    }

    /// Change the title of an existing file.
    pub fn edit_title(&mut self, id: i64, title: &str) -> Result<()> {
        let result = validate_title(title).map_err(Error::from).and_then(|_| {
            let storage = self.storage()?;
            if !storage.file_exists(id)? {
                return Err(Error::NotFound(id));
            }
            storage.update_title(id, title)?;
            Ok(())
        });
        self.track(result)
    }

    /// Get a file by id.
    pub fn get_file(&self, id: i64) -> Result<File> {
        let result = self
            .storage()
            .and_then(|s| s.get_file(id))
            .and_then(|file| file.ok_or(Error::NotFound(id)));
        self.track(result)
    }

    /// Delete a file record along with its tag links.
    pub fn delete_file(&mut self, id: i64) -> Result<()> {
        let result = self.storage_mut().and_then(|s| s.delete_file(id)).and_then(|deleted| {
            if deleted { Ok(()) } else { Err(Error::NotFound(id)) }
        });
        self.track(result)
    }

    /// Attach a tag. Returns false when the file already had it.
    pub fn add_tag(&mut self, id: i64, tag: &str) -> Result<bool> {
        let result = validate_tag(tag)
            .map_err(Error::from)
            .and_then(|_| self.storage_mut()?.add_tag(id, tag));
        self.track(result)
    }

    /// Detach a tag. Returns false when there was nothing to detach.
    pub fn remove_tag(&mut self, id: i64, tag: &str) -> Result<bool> {
        let result = validate_tag(tag)
            .map_err(Error::from)
            .and_then(|_| self.storage_mut()?.remove_tag(id, tag));
        self.track(result)
    }

    pub fn has_tag(&self, id: i64, tag: &str) -> Result<bool> {
        let result = validate_tag(tag)
            .map_err(Error::from)
            .and_then(|_| self.storage()?.has_tag(id, tag))
            .and_then(|has| has.ok_or(Error::NotFound(id)));
        self.track(result)
    }

    pub fn has_any_tags(&self, id: i64) -> Result<bool> {
        let result = self
            .storage()
            .and_then(|s| s.has_any_tags(id))
            .and_then(|has| has.ok_or(Error::NotFound(id)));
        self.track(result)
    }

    /// Stream every file to `sink` until it breaks.
    pub fn list_files(&self, sink: impl FnMut(&File) -> ControlFlow<()>) -> Result<()> {
        let result = self.storage().and_then(|s| s.for_each_file(sink));
        self.track(result)
    }

    /// Stream every tag name to `sink` until it breaks.
    pub fn list_tags(&self, sink: impl FnMut(&str) -> ControlFlow<()>) -> Result<()> {
        let result = self.storage().and_then(|s| s.for_each_tag(sink));
        self.track(result)
    }

    /// Stream the tags of one file to `sink` until it breaks.
    pub fn list_tags_for_file(&self, id: i64, sink: impl FnMut(&str) -> ControlFlow<()>) -> Result<()> {
        let result = self.storage().and_then(|s| {
            if !s.file_exists(id)? {
                return Err(Error::NotFound(id));
            }
            s.for_each_tag_of_file(id, sink)
        });
        self.track(result)
    }

    /// Stream every file carrying `tag` to `sink` until it breaks.
    pub fn list_files_by_tag(&self, tag: &str, sink: impl FnMut(&File) -> ControlFlow<()>) -> Result<()> {
        let result = validate_tag(tag)
            .map_err(Error::from)
            .and_then(|_| self.storage()?.for_each_file_with_tag(tag, sink));
        self.track(result)
    }

    /// All files, in id order.
    pub fn files(&self) -> Result<Vec<File>> {
        let mut files = Vec::new();
        self.list_files(|file| {
            files.push(file.clone());
            ControlFlow::Continue(())
        })?;
        Ok(files)
    }

    /// All tag names, sorted.
    pub fn tags(&self) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        self.list_tags(|tag| {
            tags.push(tag.to_string());
            ControlFlow::Continue(())
        })?;
        Ok(tags)
    }

    /// Tag names of one file, sorted.
    pub fn tags_for_file(&self, id: i64) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        self.list_tags_for_file(id, |tag| {
            tags.push(tag.to_string());
            ControlFlow::Continue(())
        })?;
        Ok(tags)
    }

    /// Files carrying `tag`, in id order.
    pub fn files_by_tag(&self, tag: &str) -> Result<Vec<File>> {
        let mut files = Vec::new();
        self.list_files_by_tag(tag, |file| {
            files.push(file.clone());
            ControlFlow::Continue(())
        })?;
        Ok(files)
    }

    /// Row counts for the open catalog.
    pub fn stats(&self) -> Result<Stats> {
        let result = self.storage().and_then(|s| s.stats());
        self.track(result)
    }
}
