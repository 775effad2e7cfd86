//! Storage layer for tagmage: the SQLite connection, schema and statements.

use crate::error::{Error, Result};
use crate::types::{File, Location, TAG_MAX, TITLE_MAX};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Params, Row, params};
use std::ops::ControlFlow;

/// Tables that make up a complete catalog.
const TABLES: [&str; 3] = ["files", "tags", "file_tags"];

/// Deletes every tag no file points at.
const RECLAIM_ORPHANS: &str = "DELETE FROM tags WHERE id NOT IN (SELECT tag_id FROM file_tags)";

fn schema_sql() -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title VARCHAR({title_max}) NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY,
            name VARCHAR({tag_max}) UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS file_tags (
            file_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (file_id, tag_id),
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_file_tags_tag ON file_tags(tag_id);
        "#,
        title_max = TITLE_MAX,
        tag_max = TAG_MAX,
    )
}

/// Row counts, mostly useful for checking invariants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub files: usize,
    pub tags: usize,
    pub links: usize,
    /// Tags with no file attached. Zero whenever no mutation is in flight.
    pub orphan_tags: usize,
}

/// Storage handle owning a single SQLite connection.
pub struct Storage {
    db: Connection,
    location: Location,
}

impl Storage {
    /// Open (or create) a catalog at `location`.
    pub fn open(location: &Location) -> Result<Self> {
        let db = match location {
            Location::Memory => Connection::open_in_memory()?,
            Location::Path(path) => Connection::open(path)?,
        };

        let storage = Self {
            db,
            location: location.clone(),
        };

        if !storage.has_schema()? {
            info!("Creating schema in {}", location);
            storage.init_schema()?;
        }
        storage.apply_pragmas()?;

        debug!("Opened store at {}", location);
        Ok(storage)
    }

    /// Close the connection. On failure the storage is handed back so the
    /// caller can keep using it.
    pub fn close(self) -> std::result::Result<(), (Storage, Error)> {
        let location = self.location;
        match self.db.close() {
            Ok(()) => {
                debug!("Closed store at {}", location);
                Ok(())
            }
            Err((db, err)) => Err((Storage { db, location }, err.into())),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// True when all three catalog tables exist.
    fn has_schema(&self) -> Result<bool> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (?1, ?2, ?3)",
            params![TABLES[0], TABLES[1], TABLES[2]],
            |row| row.get(0),
        )?;
        Ok(count == TABLES.len() as i64)
    }

    fn init_schema(&self) -> Result<()> {
        self.db.execute_batch(&schema_sql())?;
        Ok(())
    }

    fn apply_pragmas(&self) -> Result<()> {
        self.db.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA encoding = 'UTF-8';
            "#,
        )?;
        Ok(())
    }

    /// Insert a file row and return its id.
    pub fn insert_file(&self, title: &str) -> Result<i64> {
        let mut stmt = self.db.prepare_cached("INSERT INTO files (title) VALUES (?1)")?;
        stmt.execute(params![title])?;
        Ok(self.db.last_insert_rowid())
    }

    /// Returns false when no row has this id.
    pub fn update_title(&self, id: i64, title: &str) -> Result<bool> {
        let mut stmt = self.db.prepare_cached("UPDATE files SET title = ?1 WHERE id = ?2")?;
        Ok(stmt.execute(params![title, id])? > 0)
    }

    pub fn get_file(&self, id: i64) -> Result<Option<File>> {
        let mut stmt = self.db.prepare_cached("SELECT id, title FROM files WHERE id = ?1")?;
        Ok(stmt.query_row(params![id], row_to_file).optional()?)
    }

    pub fn file_exists(&self, id: i64) -> Result<bool> {
        let mut stmt = self
            .db
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM files WHERE id = ?1)")?;
        Ok(stmt.query_row(params![id], |row| row.get(0))?)
    }

    /// Delete a file row; its links cascade and orphaned tags go with them.
    /// Returns false when no row had this id.
    pub fn delete_file(&mut self, id: i64) -> Result<bool> {
        let tx = self.db.transaction()?;
        let deleted = tx.execute("DELETE FROM files WHERE id = ?1", params![id])? > 0;
        let reclaimed = reclaim_orphan_tags(&tx)?;
        tx.commit()?;

        debug!("Deleted file {} (reclaimed {} tags)", id, reclaimed);
        Ok(deleted)
    }

    /// Attach `tag` to a file, creating the tag on first use.
    /// Returns false when the file already had the tag.
    pub fn add_tag(&mut self, file_id: i64, tag: &str) -> Result<bool> {
        let tx = self.db.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM files WHERE id = ?1)",
            params![file_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::NotFound(file_id));
        }

        tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![tag])?;
        let added = tx.execute(
            r#"
            INSERT OR IGNORE INTO file_tags (file_id, tag_id)
            VALUES (?1, (SELECT id FROM tags WHERE name = ?2))
            "#,
            params![file_id, tag],
        )? > 0;
        tx.commit()?;

        debug!("Tagged file {} with '{}' (new: {})", file_id, tag, added);
        Ok(added)
    }

    /// Detach `tag` from a file, reclaiming the tag if nothing else uses it.
    /// Returns false when there was nothing to detach.
    pub fn remove_tag(&mut self, file_id: i64, tag: &str) -> Result<bool> {
        let tx = self.db.transaction()?;
        let removed = tx.execute(
            r#"
            DELETE FROM file_tags
            WHERE file_id = ?1 AND tag_id = (SELECT id FROM tags WHERE name = ?2)
            "#,
            params![file_id, tag],
        )? > 0;
        let reclaimed = reclaim_orphan_tags(&tx)?;
        tx.commit()?;

        debug!(
            "Untagged file {} from '{}' (removed: {}, reclaimed {} tags)",
            file_id, tag, removed, reclaimed
        );
        Ok(removed)
    }

    /// Membership check. `None` means the file itself does not exist.
    pub fn has_tag(&self, file_id: i64, tag: &str) -> Result<Option<bool>> {
        let mut stmt = self.db.prepare_cached(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM files WHERE id = ?1),
                EXISTS (
                    SELECT 1 FROM file_tags ft
                    JOIN tags t ON t.id = ft.tag_id
                    WHERE ft.file_id = ?1 AND t.name = ?2
                )
            "#,
        )?;
        let (exists, has): (bool, bool) = stmt.query_row(params![file_id, tag], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(exists.then_some(has))
    }

    /// True when at least one tag is attached. `None` means the file does not exist.
    pub fn has_any_tags(&self, file_id: i64) -> Result<Option<bool>> {
        let mut stmt = self.db.prepare_cached(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM files WHERE id = ?1),
                EXISTS (SELECT 1 FROM file_tags WHERE file_id = ?1)
            "#,
        )?;
        let (exists, has): (bool, bool) = stmt.query_row(params![file_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(exists.then_some(has))
    }

    /// Stream every file, in id order.
    pub fn for_each_file(&self, sink: impl FnMut(&File) -> ControlFlow<()>) -> Result<()> {
        self.stream_files("SELECT id, title FROM files ORDER BY id", [], sink)
    }

    /// Stream every file carrying `tag`, in id order.
    pub fn for_each_file_with_tag(&self, tag: &str, sink: impl FnMut(&File) -> ControlFlow<()>) -> Result<()> {
        self.stream_files(
            r#"
            SELECT f.id, f.title FROM files f
            JOIN file_tags ft ON ft.file_id = f.id
            JOIN tags t ON t.id = ft.tag_id
            WHERE t.name = ?1
            ORDER BY f.id
            "#,
            params![tag],
            sink,
        )
    }

    /// Stream every tag name, in name order.
    pub fn for_each_tag(&self, sink: impl FnMut(&str) -> ControlFlow<()>) -> Result<()> {
        self.stream_tags("SELECT name FROM tags ORDER BY name", [], sink)
    }

    /// Stream the tag names attached to a file, in name order.
    pub fn for_each_tag_of_file(&self, file_id: i64, sink: impl FnMut(&str) -> ControlFlow<()>) -> Result<()> {
        self.stream_tags(
            r#"
            SELECT t.name FROM tags t
            JOIN file_tags ft ON ft.tag_id = t.id
            WHERE ft.file_id = ?1
            ORDER BY t.name
            "#,
            params![file_id],
            sink,
        )
    }

    pub fn stats(&self) -> Result<Stats> {
        let (files, tags, links, orphan_tags): (i64, i64, i64, i64) = self.db.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM files),
                (SELECT COUNT(*) FROM tags),
                (SELECT COUNT(*) FROM file_tags),
                (SELECT COUNT(*) FROM tags WHERE id NOT IN (SELECT tag_id FROM file_tags))
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(Stats {
            files: files as usize,
            tags: tags as usize,
            links: links as usize,
            orphan_tags: orphan_tags as usize,
        })
    }

    fn stream_files<P: Params>(
        &self,
        sql: &str,
        params: P,
        mut sink: impl FnMut(&File) -> ControlFlow<()>,
    ) -> Result<()> {
        let mut stmt = self.db.prepare_cached(sql)?;
        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            let file = row_to_file(row)?;
            if sink(&file).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn stream_tags<P: Params>(
        &self,
        sql: &str,
        params: P,
        mut sink: impl FnMut(&str) -> ControlFlow<()>,
    ) -> Result<()> {
        let mut stmt = self.db.prepare_cached(sql)?;
        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            if sink(&name).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Delete every tag with zero links. Returns how many went.
fn reclaim_orphan_tags(db: &Connection) -> Result<usize> {
    let reclaimed = db.execute(RECLAIM_ORPHANS, [])?;
    if reclaimed > 0 {
        debug!("Reclaimed {} orphan tag(s)", reclaimed);
    }
    Ok(reclaimed)
}

fn row_to_file(row: &Row) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        title: row.get(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_storage() -> Storage {
        Storage::open(&Location::Memory).unwrap()
    }

    fn collect_files(storage: &Storage) -> Vec<File> {
        let mut files = Vec::new();
        storage
            .for_each_file(|f| {
                files.push(f.clone());
                ControlFlow::Continue(())
            })
            .unwrap();
        files
    }

    #[test]
    fn test_open_creates_schema() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.sqlite");
        let storage = Storage::open(&Location::Path(path.clone())).unwrap();

        assert!(path.exists());
        assert!(storage.has_schema().unwrap());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let storage = setup_test_storage();
        let on: bool = storage
            .db
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(on);
    }

    #[test]
    fn test_link_to_missing_file_rejected_by_engine() {
        let storage = setup_test_storage();
        storage
            .db
            .execute("INSERT INTO tags (name) VALUES ('red')", [])
            .unwrap();
        let result = storage
            .db
            .execute("INSERT INTO file_tags (file_id, tag_id) VALUES (99, 1)", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_and_get_file() {
        let storage = setup_test_storage();

        let id = storage.insert_file("x.png").unwrap();
        let file = storage.get_file(id).unwrap().unwrap();
        assert_eq!(file.id, id);
        assert_eq!(file.title, "x.png");

        assert!(storage.get_file(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut storage = setup_test_storage();

        let first = storage.insert_file("a").unwrap();
        let second = storage.insert_file("b").unwrap();
        storage.delete_file(second).unwrap();
        let third = storage.insert_file("c").unwrap();

        assert!(first < second);
        assert!(third > second);
    }

    #[test]
    fn test_add_tag_idempotent() {
        let mut storage = setup_test_storage();
        let id = storage.insert_file("a").unwrap();

        assert!(storage.add_tag(id, "red").unwrap());
        assert!(!storage.add_tag(id, "red").unwrap());

        let stats = storage.stats().unwrap();
        assert_eq!(stats.tags, 1);
        assert_eq!(stats.links, 1);
    }

    #[test]
    fn test_add_tag_missing_file_leaves_no_tag() {
        let mut storage = setup_test_storage();

        let result = storage.add_tag(42, "red");
        assert_eq!(result, Err(Error::NotFound(42)));
        assert_eq!(storage.stats().unwrap(), Stats::default());
    }

    #[test]
    fn test_remove_tag_reclaims_orphan() {
        let mut storage = setup_test_storage();
        let a = storage.insert_file("a").unwrap();
        let b = storage.insert_file("b").unwrap();
        storage.add_tag(a, "red").unwrap();
        storage.add_tag(b, "red").unwrap();

        assert!(storage.remove_tag(a, "red").unwrap());
        assert_eq!(storage.stats().unwrap().tags, 1);

        assert!(storage.remove_tag(b, "red").unwrap());
        assert_eq!(storage.stats().unwrap().tags, 0);

        assert!(!storage.remove_tag(b, "red").unwrap());
    }

    #[test]
    fn test_delete_file_cascades() {
        let mut storage = setup_test_storage();
        let a = storage.insert_file("a").unwrap();
        let b = storage.insert_file("b").unwrap();
        storage.add_tag(a, "red").unwrap();
        storage.add_tag(a, "blue").unwrap();
        storage.add_tag(b, "blue").unwrap();

        assert!(storage.delete_file(a).unwrap());

        let stats = storage.stats().unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.tags, 1);
        assert_eq!(stats.links, 1);
        assert_eq!(stats.orphan_tags, 0);

        assert!(!storage.delete_file(a).unwrap());
    }

    #[test]
    fn test_has_tag_reports_missing_file() {
        let mut storage = setup_test_storage();
        let id = storage.insert_file("a").unwrap();
        storage.add_tag(id, "red").unwrap();

        assert_eq!(storage.has_tag(id, "red").unwrap(), Some(true));
        assert_eq!(storage.has_tag(id, "blue").unwrap(), Some(false));
        assert_eq!(storage.has_tag(id + 1, "red").unwrap(), None);

        assert_eq!(storage.has_any_tags(id).unwrap(), Some(true));
        assert_eq!(storage.has_any_tags(id + 1).unwrap(), None);
    }

    #[test]
    fn test_for_each_file_stops_early() {
        let storage = setup_test_storage();
        for i in 0..5 {
            storage.insert_file(&format!("f{}", i)).unwrap();
        }

        let mut seen = 0;
        storage
            .for_each_file(|_| {
                seen += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(seen, 1);

        assert_eq!(collect_files(&storage).len(), 5);
    }

    #[test]
    fn test_tags_sorted_by_name() {
        let mut storage = setup_test_storage();
        let id = storage.insert_file("a").unwrap();
        for tag in ["zebra", "apple", "Mango"] {
            storage.add_tag(id, tag).unwrap();
        }

        let mut tags = Vec::new();
        storage
            .for_each_tag_of_file(id, |t| {
                tags.push(t.to_string());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(tags, vec!["Mango", "apple", "zebra"]);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let location = Location::Path(temp_dir.path().join("db.sqlite"));

        let id = {
            let mut storage = Storage::open(&location).unwrap();
            let id = storage.insert_file("kept").unwrap();
            storage.add_tag(id, "red").unwrap();
            storage.close().map_err(|(_, e)| e).unwrap();
            id
        };

        let storage = Storage::open(&location).unwrap();
        assert_eq!(storage.get_file(id).unwrap().unwrap().title, "kept");
        assert_eq!(storage.has_tag(id, "red").unwrap(), Some(true));
    }
}
