//! Tagmage: a personal file-tagging catalog.
//!
//! Tagmage keeps metadata about user files in SQLite, attaches free-form tags
//! to them and answers conjunctive tag queries, including the `:tagged` /
//! `:untagged` flags and `!tag` negation.
//!
//! # Example
//!
//! ```
//! use tagmage::{Store, StoreFilterExt};
//!
//! let mut store = Store::in_memory().unwrap();
//!
//! let photo = store.new_file("beach.png").unwrap();
//! store.add_tag(photo, "holiday").unwrap();
//! store.add_tag(photo, "sea").unwrap();
//! let memo = store.new_file("memo.txt").unwrap();
//!
//! let holiday = store.files_matching(&["holiday", "!work"]).unwrap();
//! assert_eq!(holiday.len(), 1);
//! assert_eq!(holiday[0].id, photo);
//!
//! let untagged = store.files_matching(&[":untagged"]).unwrap();
//! assert_eq!(untagged[0].id, memo);
//!
//! // Tags vanish once nothing references them
//! store.delete_file(photo).unwrap();
//! assert!(store.tags().unwrap().is_empty());
//! ```

mod error;
mod storage;
mod store;
mod types;

pub mod config;
pub mod library;
pub mod tags;

// Re-export public API
pub use error::{Error, Result};
pub use library::Library;
pub use storage::Stats;
pub use store::Store;
pub use tags::{Filter, Flag, StoreFilterExt, is_valid_tag};
pub use types::{File, Location, MEMORY, TAG_MAX, TITLE_MAX, ValidationError};
