// src/entity/note.rs
use serde::{Deserialize, Serialize};

use super::UserId;

pub type NoteId = i64;

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_SLUG_LENGTH: usize = 100;

/// A stored note. `slug` is unique across all notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub owner_id: UserId,
}

/// Field values for a note that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub text: String,
    /// Empty means "derive from title" when stored.
    pub slug: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, text: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            slug: slug.into(),
        }
    }
}
