//! Shared test infrastructure for tagmage integration tests.
//!
//! Provides TestEnv (in-memory store) and LibraryEnv (library in a temporary
//! home) helpers for consistent test setup/teardown.

#![allow(dead_code)]

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tagmage::{File, Library, Store};
use tempfile::TempDir;

/// Test environment wrapping an in-memory store.
pub struct TestEnv {
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an empty in-memory store.
    pub fn new() -> Self {
        let store = Store::in_memory().expect("Failed to open store");
        Self { store }
    }

    /// Create a file record.
    pub fn create_file(&mut self, title: &str) -> File {
        let id = self.store.new_file(title).expect("Failed to create file");
        self.store.get_file(id).expect("Failed to get file")
    }

    /// Create a file record with tags.
    pub fn create_file_with_tags(&mut self, title: &str, tags: &[&str]) -> File {
        let file = self.create_file(title);
        for tag in tags {
            self.store.add_tag(file.id, tag).expect("Failed to add tag");
        }
        file
    }

    /// Titles of the files carrying `tag`, in id order.
    pub fn titles_by_tag(&self, tag: &str) -> Vec<String> {
        self.store
            .files_by_tag(tag)
            .expect("Failed to list files by tag")
            .into_iter()
            .map(|f| f.title)
            .collect()
    }

    /// Count files delivered before the sink asks to stop after `limit`.
    pub fn count_files_until(&self, limit: usize) -> usize {
        let mut seen = 0;
        self.store
            .list_files(|_| {
                seen += 1;
                if seen >= limit {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .expect("Failed to list files");
        seen
    }

    /// Assert the catalog holds no tag without a file.
    pub fn assert_no_orphans(&self) {
        let stats = self.store.stats().expect("Failed to get stats");
        assert_eq!(stats.orphan_tags, 0, "orphan tags left behind: {:?}", stats);
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Test environment with a library rooted in a temporary directory.
///
/// Source files are written next to the home, never inside it.
pub struct LibraryEnv {
    pub temp_dir: TempDir,
    pub library: Library,
}

impl LibraryEnv {
    /// Create a library in a fresh temporary home.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let library = Library::open(&temp_dir.path().join("home")).expect("Failed to open library");
        Self { temp_dir, library }
    }

    /// Home directory of the library.
    pub fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    /// Write a source file outside the home.
    pub fn write_source(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, bytes).expect("Failed to write source file");
        path
    }

    /// Write a source file and add it to the library with tags.
    pub fn add(&mut self, name: &str, bytes: &[u8], tags: &[&str]) -> File {
        let src = self.write_source(name, bytes);
        self.library.add_file(&src, tags).expect("Failed to add file")
    }

    /// Ids listed for a filter list, in id order.
    pub fn listed_ids(&self, filters: &[&str]) -> Vec<i64> {
        let mut ids = Vec::new();
        self.library
            .list(filters, |file| {
                ids.push(file.id);
                ControlFlow::Continue(())
            })
            .expect("Failed to list files");
        ids
    }

    /// Close the library and open it again from the same home.
    pub fn reopen(self) -> Self {
        let home = self.home();
        self.library.close().expect("Failed to close library");
        let library = Library::open(&home).expect("Failed to reopen library");
        Self {
            temp_dir: self.temp_dir,
            library,
        }
    }

    /// Whether `path` exists relative to the home.
    pub fn home_has(&self, path: &Path) -> bool {
        self.home().join(path).exists()
    }
}

impl Default for LibraryEnv {
    fn default() -> Self {
        Self::new()
    }
}
