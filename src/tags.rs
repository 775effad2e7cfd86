//! Tag grammar and the conjunctive filter engine.
//!
//! A filter list is a flat AND of tokens. Plain tokens are real tags; tokens
//! starting with a pseudotag prefix are synthetic predicates:
//!
//! | token        | holds when                      |
//! |--------------|---------------------------------|
//! | `red`        | the file has tag `red`          |
//! | `!red`       | the file does not have `red`    |
//! | `:tagged`    | the file has at least one tag   |
//! | `:untagged`  | the file has no tags            |

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{File, TAG_MAX, ValidationError};
use std::ops::ControlFlow;

/// Prefix for boolean flags such as `:tagged`.
pub const FLAG_PREFIX: char = ':';

/// Prefix for negated tags such as `!red`.
pub const NOT_PREFIX: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudotag {
    Flag,
    Not,
}

const PSEUDOTAGS: [(char, Pseudotag); 2] = [(FLAG_PREFIX, Pseudotag::Flag), (NOT_PREFIX, Pseudotag::Not)];

fn find_pseudotag(prefix: char) -> Option<Pseudotag> {
    PSEUDOTAGS
        .iter()
        .find(|(c, _)| *c == prefix)
        .map(|(_, kind)| *kind)
}

/// Check a token against the tag grammar.
///
/// A real tag is non-empty, starts with an alphanumeric character and has no
/// whitespace. Unless `must_be_real` is set, a pseudotag is also accepted: a
/// registered prefix followed by at least one non-whitespace character.
pub fn is_valid_tag(tag: &str, must_be_real: bool) -> bool {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !first.is_alphanumeric() {
        if must_be_real || find_pseudotag(first).is_none() {
            return false;
        }
        // Prefix alone is not a pseudotag
        if chars.as_str().is_empty() {
            return false;
        }
    }

    !chars.any(char::is_whitespace)
}

/// Validate a name that is going to be stored or looked up as a real tag.
pub fn validate_tag(tag: &str) -> std::result::Result<(), ValidationError> {
    if tag.is_empty() {
        return Err(ValidationError::EmptyTag);
    }
    if tag.len() > TAG_MAX {
        return Err(ValidationError::TagTooLong(tag.len()));
    }
    if !is_valid_tag(tag, true) {
        return Err(ValidationError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Arguments accepted after the `:` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Tagged,
    Untagged,
}

impl std::str::FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tagged" => Ok(Flag::Tagged),
            "untagged" => Ok(Flag::Untagged),
            other => Err(Error::InvalidFilter(other.to_string())),
        }
    }
}

/// One parsed filter token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<'a> {
    /// File must have this tag.
    Tag(&'a str),
    /// File must not have this tag.
    Not(&'a str),
    /// Boolean flag over the file's tag set.
    Flag(Flag),
}

impl<'a> Filter<'a> {
    /// Dispatch a token on its first character.
    pub fn parse(token: &'a str) -> Result<Self> {
        let Some(first) = token.chars().next() else {
            return Err(Error::InvalidInput(ValidationError::EmptyTag));
        };
        let rest = &token[first.len_utf8()..];

        match find_pseudotag(first) {
            Some(Pseudotag::Flag) => Ok(Filter::Flag(rest.parse()?)),
            Some(Pseudotag::Not) => Ok(Filter::Not(rest)),
            None => Ok(Filter::Tag(token)),
        }
    }

    /// Evaluate against one file.
    pub fn holds(&self, store: &Store, file: &File) -> Result<bool> {
        match *self {
            Filter::Tag(tag) => store.has_tag(file.id, tag),
            // No file can carry a name outside the real-tag grammar
            Filter::Not(tag) if !is_valid_tag(tag, true) => store.has_any_tags(file.id).map(|_| true),
            Filter::Not(tag) => store.has_tag(file.id, tag).map(|has| !has),
            Filter::Flag(Flag::Tagged) => store.has_any_tags(file.id),
            Filter::Flag(Flag::Untagged) => store.has_any_tags(file.id).map(|has| !has),
        }
    }
}

/// Check a whole filter list for grammar errors before running it.
pub fn validate_filters<S: AsRef<str>>(filters: &[S]) -> Result<()> {
    for token in filters {
        let token = token.as_ref();
        if !is_valid_tag(token, false) {
            return Err(Error::InvalidInput(ValidationError::InvalidTag(token.to_string())));
        }
    }
    Ok(())
}

/// Check the grammar of a whole filter list and parse every token, so that
/// an unknown flag is reported before any file is looked at.
pub fn parse_filters<S: AsRef<str>>(filters: &[S]) -> Result<Vec<Filter<'_>>> {
    validate_filters(filters)?;
    filters.iter().map(|token| Filter::parse(token.as_ref())).collect()
}

fn all_hold(store: &Store, file: &File, filters: &[Filter<'_>]) -> Result<bool> {
    for filter in filters {
        if !filter.holds(store, file)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Extension trait adding filter evaluation to Store.
pub trait StoreFilterExt {
    /// True when every filter holds for `file`.
    ///
    /// Filters are evaluated left to right and evaluation stops at the first
    /// one that fails to hold or errors. An empty list matches everything.
    fn file_matches_filters<S: AsRef<str>>(&self, file: &File, filters: &[S]) -> Result<bool>;

    /// Stream every file matching the filter list, in id order.
    ///
    /// Every token is parsed before the first file is read, so a bad token
    /// fails the call even when no file would reach it.
    fn list_files_matching<S: AsRef<str>>(
        &self,
        filters: &[S],
        sink: impl FnMut(&File) -> ControlFlow<()>,
    ) -> Result<()>;

    /// Collect every file matching the filter list.
    fn files_matching<S: AsRef<str>>(&self, filters: &[S]) -> Result<Vec<File>> {
        let mut files = Vec::new();
        self.list_files_matching(filters, |file| {
            files.push(file.clone());
            ControlFlow::Continue(())
        })?;
        Ok(files)
    }
}

impl StoreFilterExt for Store {
    fn file_matches_filters<S: AsRef<str>>(&self, file: &File, filters: &[S]) -> Result<bool> {
        for token in filters {
            let holds = Filter::parse(token.as_ref()).and_then(|filter| filter.holds(self, file));
            if !self.track(holds)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn list_files_matching<S: AsRef<str>>(
        &self,
        filters: &[S],
        mut sink: impl FnMut(&File) -> ControlFlow<()>,
    ) -> Result<()> {
        let parsed = self.track(parse_filters(filters))?;

        let mut failure = None;
        self.list_files(|file| match all_hold(self, file, &parsed) {
            Ok(true) => sink(file),
            Ok(false) => ControlFlow::Continue(()),
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        })?;

        match failure {
            Some(e) => self.track(Err(e)),
            None => Ok(()),
        }
    }
}
