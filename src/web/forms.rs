//! Submitted form payloads and their validation.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::entity::{Note, NoteDraft, NoteId, MAX_SLUG_LENGTH, MAX_TITLE_LENGTH};
use crate::error::Result;
use crate::slug::{derive_slug, is_valid_slug};
use crate::storage::SqliteStore;

/// Appended to a slug that is already taken.
pub const WARNING: &str = " - такой slug уже существует, придумайте уникальное значение!";

pub const REQUIRED: &str = "Обязательное поле.";
pub const INVALID_SLUG: &str =
    "Значение должно состоять только из латинских букв, цифр, знаков подчеркивания или дефиса.";
pub const UNDERIVABLE_SLUG: &str =
    "Не удалось получить slug из заголовка, укажите его вручную.";
pub const PASSWORD_MISMATCH: &str = "Введенные пароли не совпадают.";
pub const USERNAME_TAKEN: &str = "Пользователь с таким именем уже существует.";
pub const BAD_CREDENTIALS: &str = "Пожалуйста, введите правильные имя пользователя и пароль.";

/// Field-level and form-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn has_field(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }
}

/// Add/edit form for a note. Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NoteForm {
    pub title: String,
    pub text: String,
    pub slug: String,
}

impl NoteForm {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            text: note.text.clone(),
            slug: note.slug.clone(),
        }
    }

    /// Validate against the store.
    ///
    /// `editing` is the note being edited, which does not collide with its
    /// own slug. An empty slug is derived from the title. The outer `Result`
    /// carries storage failures, the inner one the validation outcome.
    pub fn clean(
        &self,
        store: &SqliteStore,
        editing: Option<NoteId>,
    ) -> Result<std::result::Result<NoteDraft, FormErrors>> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", REQUIRED);
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            errors.add("title", too_long(MAX_TITLE_LENGTH, title.chars().count()));
        }

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let mut slug = self.slug.trim().to_string();
        if slug.is_empty() {
            if !title.is_empty() {
                slug = derive_slug(title);
                if slug.is_empty() {
                    errors.add("slug", UNDERIVABLE_SLUG);
                }
            }
        } else if !is_valid_slug(&slug) {
            errors.add("slug", INVALID_SLUG);
        } else if slug.len() > MAX_SLUG_LENGTH {
            errors.add("slug", too_long(MAX_SLUG_LENGTH, slug.len()));
        }

        if !slug.is_empty() && !errors.has_field("slug") && store.slug_exists(&slug, editing)? {
            errors.add("slug", format!("{}{}", slug, WARNING));
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        Ok(Ok(NoteDraft::new(title, text, slug)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

impl SignupForm {
    /// Checks that do not need the store. Username uniqueness is reported by
    /// the insert itself.
    pub fn clean(&self) -> std::result::Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn too_long(max: usize, actual: usize) -> String {
    format!(
        "Убедитесь, что это значение содержит не более {} символов (сейчас {}).",
        max, actual
    )
}
